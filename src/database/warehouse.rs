//! Idempotent upsert from staging into the warehouse tables

use super::store::{Store, APIS_TABLE, CATEGORIES_TABLE, STAGING_TABLE};
use crate::error::Result;
use crate::types::CategoryApiRecord;
use tracing::info;

/// Rows added by one warehouse sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarehouseReport {
    /// New categories
    pub categories_inserted: usize,
    /// New (category, api) pairs
    pub apis_inserted: usize,
}

/// Inserts staged categories and APIs that the warehouse does not have yet.
///
/// Existing rows are never touched, so ids and `created_at` survive re-runs.
/// The unique constraints on both tables back the anti-join.
pub struct WarehouseUpserter<'a> {
    store: &'a mut Store,
}

impl<'a> WarehouseUpserter<'a> {
    /// Create an upserter over `store`
    pub fn new(store: &'a mut Store) -> Self {
        Self { store }
    }

    /// Insert every staged category not yet in `categories`
    pub fn sync_categories(&mut self) -> Result<usize> {
        let staging = self.store.table(STAGING_TABLE);
        let categories = self.store.table(CATEGORIES_TABLE);
        let sql = format!(
            "INSERT INTO {categories} (category)
             SELECT DISTINCT s.category
             FROM {staging} AS s
             WHERE NOT EXISTS (
                 SELECT 1 FROM {categories} AS c WHERE c.category = s.category
             )"
        );

        let tx = self.store.transaction()?;
        let inserted = tx.execute(&sql, [])?;
        tx.commit()?;

        info!("Inserted {} new rows into {}", inserted, categories);
        Ok(inserted)
    }

    /// Insert every staged (category, api) pair not yet in `apis`.
    ///
    /// Staged rows whose category is missing from `categories` are skipped,
    /// so `sync_categories` has to run first.
    pub fn sync_apis(&mut self) -> Result<usize> {
        let staging = self.store.table(STAGING_TABLE);
        let categories = self.store.table(CATEGORIES_TABLE);
        let apis = self.store.table(APIS_TABLE);
        let sql = format!(
            "INSERT INTO {apis} (category_id, api)
             SELECT DISTINCT c.id, s.api
             FROM {staging} AS s
             JOIN {categories} AS c ON c.category = s.category
             WHERE NOT EXISTS (
                 SELECT 1 FROM {apis} AS a WHERE a.category_id = c.id AND a.api = s.api
             )"
        );

        let tx = self.store.transaction()?;
        let inserted = tx.execute(&sql, [])?;
        tx.commit()?;

        info!("Inserted {} new rows into {}", inserted, apis);
        Ok(inserted)
    }

    /// `sync_categories` followed by `sync_apis`
    pub fn sync_all(&mut self) -> Result<WarehouseReport> {
        let categories_inserted = self.sync_categories()?;
        let apis_inserted = self.sync_apis()?;
        Ok(WarehouseReport {
            categories_inserted,
            apis_inserted,
        })
    }

    /// Rows in `categories`
    pub fn category_count(&self) -> Result<usize> {
        self.store.count(CATEGORIES_TABLE)
    }

    /// Rows in `apis`
    pub fn api_count(&self) -> Result<usize> {
        self.store.count(APIS_TABLE)
    }

    /// Warehouse contents resolved back to names, ordered by category then api
    pub fn records(&self) -> Result<Vec<CategoryApiRecord>> {
        let sql = format!(
            "SELECT c.category, a.api
             FROM {} AS a
             JOIN {} AS c ON c.id = a.category_id
             ORDER BY c.category, a.api",
            self.store.table(APIS_TABLE),
            self.store.table(CATEGORIES_TABLE)
        );

        let mut stmt = self.store.connection().prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(CategoryApiRecord::new(
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}
