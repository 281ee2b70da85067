//! Staging and warehouse storage via DuckDB
//!
//! The store holds three tables in one schema:
//! - `stg_category_apis`: the latest harvest, reloaded wholesale every run
//! - `categories` and `apis`: the warehouse, only ever appended to
//!
//! PostgreSQL and MySQL targets are reached by attaching them to DuckDB.

mod staging;
mod store;
mod warehouse;

pub use staging::{StagingLoader, StagingReport};
pub use store::{Store, APIS_TABLE, CATEGORIES_TABLE, MAX_VALUE_LEN, STAGING_TABLE};
pub use warehouse::{WarehouseReport, WarehouseUpserter};
