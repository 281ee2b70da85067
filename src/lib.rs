// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Catalog Harvest
//!
//! Harvests a paginated, rate-limited, token-authenticated catalog of public
//! APIs and loads it into a two-tier store: a staging table reloaded on every
//! run, and a warehouse of categories and APIs that is only ever appended to.
//!
//! ## Features
//!
//! - **Token Sessions**: Bearer tokens renewed on demand and threaded by value
//! - **Backoff**: Exponential delay with jitter on 429 and transport errors
//! - **Pagination**: `?page=N` cursors that stop at the first empty page
//! - **Nested Walk**: Categories, then entries per category, as one lazy stream
//! - **Transactional Staging**: Truncate-and-reload that rolls back as a whole
//! - **Idempotent Warehouse**: Re-running a harvest never duplicates rows
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use catalog_harvest::{HarvestConfig, Harvester, Store};
//!
//! #[tokio::main]
//! async fn main() -> catalog_harvest::Result<()> {
//!     let config = HarvestConfig::from_file("harvest.toml")?;
//!     let mut store = Store::open(&config.database)?;
//!
//!     let report = Harvester::from_config(&config)?.run(&mut store).await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Harvester::run                          │
//! └──────────────────────────────────────────────────────────────┘
//!          │                        │                     │
//! ┌────────┴────────┐    ┌──────────┴─────────┐  ┌────────┴────────┐
//! │  CatalogWalker  │───▶│   StagingLoader    │─▶│WarehouseUpserter│
//! ├─────────────────┤    ├────────────────────┤  ├─────────────────┤
//! │ PageCursor      │    │ one transaction    │  │ categories      │
//! │ RateLimitedFetch│    │ bulk insert/chunk  │  │ apis            │
//! │ TokenRenewer    │    │ stg_category_apis  │  │ insert-if-absent│
//! └─────────────────┘    └────────────────────┘  └─────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the harvester
pub mod error;

/// Common types shared across modules
pub mod types;

/// Bearer token sessions and renewal
pub mod auth;

/// Rate-limit aware fetcher with backoff
pub mod http;

/// Page-number pagination
pub mod pagination;

/// Typed decoding of catalog pages
pub mod decode;

/// Nested category and entry walk
pub mod catalog;

/// Staging and warehouse storage
pub mod database;

/// TOML configuration
pub mod config;

/// End-to-end harvest pipeline
pub mod pipeline;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use auth::Session;
pub use catalog::CatalogWalker;
pub use config::HarvestConfig;
pub use database::{StagingLoader, Store, WarehouseUpserter};
pub use http::RateLimitedFetcher;
pub use pipeline::{HarvestReport, Harvester};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
