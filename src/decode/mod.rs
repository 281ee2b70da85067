//! Typed page decoding
//!
//! Supports: token responses, category listing pages, per-category entry pages
//!
//! # Overview
//!
//! Every decoder walks a `serde_json::Value` and fails with
//! `Error::SchemaViolation` carrying the JSON path of the offending field
//! (e.g. `categories[3].Link`), so a bad page can be pinpointed from the log.

mod decoders;
mod types;

pub use decoders::{decode_token, expect_array, expect_object, expect_string, field_path};
pub use types::{CategoryPage, DecodePage, Entry, EntryPage, TokenResponse};
