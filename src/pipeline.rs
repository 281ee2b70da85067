//! End-to-end harvest: walk, stage, sync
//!
//! ```text
//! CatalogWalker ─▶ try_chunks(chunk_size) ─▶ StagingLoader ─▶ WarehouseUpserter
//! ```

use crate::catalog::CatalogWalker;
use crate::config::HarvestConfig;
use crate::database::{StagingLoader, StagingReport, Store, WarehouseUpserter};
use crate::error::{Error, Result};
use crate::http::RateLimitedFetcher;
use crate::types::CategoryApiRecord;
use chrono::{DateTime, Utc};
use futures::stream::{Stream, TryChunksError, TryStreamExt};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::info;

/// Totals from one harvest run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarvestReport {
    /// Records staged
    pub records: usize,
    /// Bulk inserts performed
    pub chunks: usize,
    /// New warehouse categories
    pub categories_inserted: usize,
    /// New warehouse APIs
    pub apis_inserted: usize,
    /// When the run began
    pub started_at: DateTime<Utc>,
    /// Wall time of the run
    pub elapsed: Duration,
}

impl fmt::Display for HarvestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Staged {} records in {} chunks; {} new categories, {} new APIs ({:.1}s)",
            self.records,
            self.chunks,
            self.categories_inserted,
            self.apis_inserted,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Runs a full harvest against a store
#[derive(Debug, Clone)]
pub struct Harvester {
    walker: CatalogWalker,
    chunk_size: usize,
}

impl Harvester {
    /// Create a harvester; a zero `chunk_size` is treated as 1
    pub fn new(walker: CatalogWalker, chunk_size: usize) -> Self {
        Self {
            walker,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Build the fetcher and walker described by `config`
    pub fn from_config(config: &HarvestConfig) -> Result<Self> {
        let base_url = config.api.base_url()?;
        let fetcher = RateLimitedFetcher::new(&base_url, config.api.fetcher_config())?;
        let walker = CatalogWalker::new(fetcher, base_url, config.api.max_attempts)
            .with_policy(config.api.on_exhausted);
        Ok(Self::new(walker, config.load.chunk_size))
    }

    /// The catalog walker
    pub fn walker(&self) -> &CatalogWalker {
        &self.walker
    }

    /// Records per bulk insert
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Walked records grouped into chunks of at most `chunk_size`
    pub fn chunks(&self) -> impl Stream<Item = Result<Vec<CategoryApiRecord>>> + '_ {
        self.walker
            .walk()
            .try_chunks(self.chunk_size)
            .map_err(|TryChunksError(_, e): TryChunksError<CategoryApiRecord, Error>| e)
    }

    /// Walk the catalog and reload staging with the result
    pub async fn stage(&self, store: &mut Store) -> Result<StagingReport> {
        let on_progress = |message: &str| info!("{}", message);
        StagingLoader::new(store)
            .refresh(self.chunks(), Some(&on_progress))
            .await
    }

    /// Stage, then sync categories and APIs into the warehouse
    pub async fn run(&self, store: &mut Store) -> Result<HarvestReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        store.ensure_schema()?;
        let staged = self.stage(store).await?;
        info!("Staged {} records in {} chunks", staged.rows, staged.chunks);

        let synced = WarehouseUpserter::new(store).sync_all()?;

        let report = HarvestReport {
            records: staged.rows,
            chunks: staged.chunks,
            categories_inserted: synced.categories_inserted,
            apis_inserted: synced.apis_inserted,
            started_at,
            elapsed: start.elapsed(),
        };
        info!("{}", report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{BackoffPolicy, FetcherConfig};
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn harvester_for(server: &MockServer, chunk_size: usize) -> Harvester {
        let base = Url::parse(&format!("{}/api/v1", server.uri())).unwrap();
        let config = FetcherConfig::builder()
            .backoff(BackoffPolicy::new(Duration::from_millis(1), Duration::ZERO))
            .build();
        let fetcher = RateLimitedFetcher::new(&base, config).unwrap();
        Harvester::new(CatalogWalker::new(fetcher, base, 3), chunk_size)
    }

    async fn mount(server: &MockServer, route: &str, page: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .and(query_param("page", page))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_chunks_respect_chunk_size() {
        let server = MockServer::start().await;
        mount(&server, "/api/v1/apis/categories", "1", json!({"categories": ["a"]})).await;
        mount(&server, "/api/v1/apis/categories", "2", json!({"categories": []})).await;
        mount(
            &server,
            "/api/v1/apis/entry",
            "1",
            json!({"categories": [{"Link": "1"}, {"Link": "2"}, {"Link": "3"}]}),
        )
        .await;
        mount(&server, "/api/v1/apis/entry", "2", json!({"categories": []})).await;

        let harvester = harvester_for(&server, 2);
        let sizes: Vec<usize> = harvester
            .chunks()
            .map_ok(|chunk| chunk.len())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(sizes, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_run_reports_totals() {
        let server = MockServer::start().await;
        mount(&server, "/api/v1/apis/categories", "1", json!({"categories": ["a"]})).await;
        mount(&server, "/api/v1/apis/categories", "2", json!({"categories": []})).await;
        mount(
            &server,
            "/api/v1/apis/entry",
            "1",
            json!({"categories": [{"Link": "http://x"}, {"Link": "http://y"}]}),
        )
        .await;
        mount(&server, "/api/v1/apis/entry", "2", json!({"categories": []})).await;

        let mut store = Store::open_in_memory("public_apis").unwrap();
        let report = harvester_for(&server, 1).run(&mut store).await.unwrap();

        assert_eq!(report.records, 2);
        assert_eq!(report.chunks, 2);
        assert_eq!(report.categories_inserted, 1);
        assert_eq!(report.apis_inserted, 2);
        assert!(report.to_string().starts_with("Staged 2 records in 2 chunks"));
    }

    #[test]
    fn test_from_config_defaults() {
        let config = HarvestConfig::default();
        let harvester = Harvester::from_config(&config).unwrap();
        assert_eq!(harvester.chunk_size(), 100);
        assert_eq!(
            harvester.walker().categories_url().unwrap().as_str(),
            "https://public-apis-api.herokuapp.com/api/v1/apis/categories"
        );
    }
}
