//! Truncate-and-reload of the staging table

use super::store::{Store, STAGING_TABLE};
use crate::error::Result;
use crate::types::CategoryApiRecord;
use duckdb::{params_from_iter, Connection};
use futures::{Stream, StreamExt};
use tracing::debug;

/// Totals from one staging refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StagingReport {
    /// Rows inserted
    pub rows: usize,
    /// Non-empty chunks inserted
    pub chunks: usize,
}

/// Replaces the staging table contents inside a single transaction
pub struct StagingLoader<'a> {
    store: &'a mut Store,
}

impl<'a> StagingLoader<'a> {
    /// Create a loader writing to `store`
    pub fn new(store: &'a mut Store) -> Self {
        Self { store }
    }

    /// Truncate staging, then bulk insert each chunk.
    ///
    /// Everything happens in one transaction. An `Err` item in `chunks` or a
    /// failing insert rolls back the truncate too, leaving staging exactly as
    /// it was. `on_progress` is called after every inserted chunk.
    pub async fn refresh<S>(
        &mut self,
        chunks: S,
        on_progress: Option<&dyn Fn(&str)>,
    ) -> Result<StagingReport>
    where
        S: Stream<Item = Result<Vec<CategoryApiRecord>>>,
    {
        self.store.ensure_staging()?;
        let table = self.store.table(STAGING_TABLE);

        let tx = self.store.transaction()?;
        tx.execute(&format!("DELETE FROM {table}"), [])?;
        debug!("Truncated {}", table);

        let mut chunks = std::pin::pin!(chunks);
        let mut report = StagingReport::default();

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }

            insert_chunk(&tx, &table, &chunk)?;
            report.rows += chunk.len();
            report.chunks += 1;

            if let Some(on_progress) = on_progress {
                on_progress(&format!(
                    "Bulk inserted {} rows in {STAGING_TABLE}",
                    chunk.len()
                ));
            }
        }

        tx.commit()?;
        Ok(report)
    }
}

/// One multi-row INSERT for the whole chunk
fn insert_chunk(conn: &Connection, table: &str, chunk: &[CategoryApiRecord]) -> Result<()> {
    let placeholders = vec!["(?, ?)"; chunk.len()].join(", ");
    let sql = format!("INSERT INTO {table} (category, api) VALUES {placeholders}");
    let values = chunk
        .iter()
        .flat_map(|record| [record.category.as_str(), record.api.as_str()]);

    conn.execute(&sql, params_from_iter(values))?;
    Ok(())
}
