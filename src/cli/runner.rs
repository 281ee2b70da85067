//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::HarvestConfig;
use crate::database::{Store, WarehouseUpserter};
use crate::error::Result;
use crate::pipeline::Harvester;
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;

        match &self.cli.command {
            Commands::Run => self.harvest(&config).await,
            Commands::Walk { limit } => self.walk(&config, *limit).await,
            Commands::Stage => self.stage(&config).await,
            Commands::Sync => self.sync(&config),
            Commands::Init => self.init(&config),
        }
    }

    /// Config file (or defaults) with command-line overrides applied
    pub fn load_config(&self) -> Result<HarvestConfig> {
        let mut config = match &self.cli.config {
            Some(path) => HarvestConfig::from_file(path)?,
            None => HarvestConfig::default(),
        };

        if let Some(base_url) = &self.cli.base_url {
            config.api.base_url.clone_from(base_url);
        }
        if let Some(max_attempts) = self.cli.max_attempts {
            config.api.max_attempts = max_attempts;
        }
        if let Some(chunk_size) = self.cli.chunk_size {
            config.load.chunk_size = chunk_size;
        }
        if let Some(database) = &self.cli.database {
            config.database.path.clone_from(database);
        }

        config.validate()?;
        Ok(config)
    }

    async fn harvest(&self, config: &HarvestConfig) -> Result<()> {
        let harvester = Harvester::from_config(config)?;
        let mut store = Store::open(&config.database)?;

        let report = harvester.run(&mut store).await?;
        self.emit(&json!({
            "type": "REPORT",
            "report": report,
        }));
        Ok(())
    }

    async fn walk(&self, config: &HarvestConfig, limit: Option<usize>) -> Result<()> {
        let harvester = Harvester::from_config(config)?;
        let records = harvester.walker().walk();
        let mut records = std::pin::pin!(records);

        let mut count = 0;
        while limit.map_or(true, |limit| count < limit) {
            let Some(record) = records.next().await else {
                break;
            };
            let record = record?;
            self.emit(&json!({
                "type": "RECORD",
                "record": record,
            }));
            count += 1;
        }

        info!("Walked {} records", count);
        Ok(())
    }

    async fn stage(&self, config: &HarvestConfig) -> Result<()> {
        let harvester = Harvester::from_config(config)?;
        let mut store = Store::open(&config.database)?;

        let report = harvester.stage(&mut store).await?;
        self.emit(&json!({
            "type": "STAGED",
            "rows": report.rows,
            "chunks": report.chunks,
        }));
        Ok(())
    }

    fn sync(&self, config: &HarvestConfig) -> Result<()> {
        let mut store = Store::open(&config.database)?;
        store.ensure_schema()?;

        let mut upserter = WarehouseUpserter::new(&mut store);
        let report = upserter.sync_all()?;
        self.emit(&json!({
            "type": "SYNCED",
            "categories_inserted": report.categories_inserted,
            "apis_inserted": report.apis_inserted,
            "categories": upserter.category_count()?,
            "apis": upserter.api_count()?,
        }));
        Ok(())
    }

    fn init(&self, config: &HarvestConfig) -> Result<()> {
        let store = Store::open(&config.database)?;
        store.ensure_schema()?;
        self.emit(&json!({
            "type": "INIT",
            "store": store.connection_info(),
            "schema": store.schema(),
        }));
        Ok(())
    }

    fn emit(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
