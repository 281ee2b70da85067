//! Catalog walking
//!
//! Flattens the two-level catalog (category pages, then entry pages per
//! category) into a stream of `CategoryApiRecord`s.

mod walker;

pub use walker::{CatalogWalker, CATEGORIES_PATH, ENTRIES_PATH};
