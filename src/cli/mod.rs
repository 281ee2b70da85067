//! CLI module
//!
//! Command-line interface for harvesting the catalog.
//!
//! # Commands
//!
//! - `run` - Walk, stage and sync in one go
//! - `walk` - Print harvested records as JSON lines, touching no database
//! - `stage` - Walk and reload the staging table only
//! - `sync` - Upsert the current staging contents into the warehouse
//! - `init` - Create the schema and tables

mod commands;
mod logging;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use logging::{init_logging, subscriber};
pub use runner::Runner;
