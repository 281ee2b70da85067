//! Pagination module
//!
//! Page-number pagination over `?page=N`, starting at 1.
//!
//! # Overview
//!
//! `PageCursor` fetches one page at a time and hands the `Session` back to the
//! caller, so nested cursors can share the latest token. `pages` wraps a cursor
//! in a lazy `Stream` for callers that do not need to interleave levels.
//!
//! Neither recognizes empty pages: deciding that a decoded page terminates the
//! sequence is the caller's job.

mod paginator;

pub use paginator::{pages, PageCursor, PageStep};
