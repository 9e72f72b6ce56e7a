// Catalog Service - record store lookups

use crate::domain::{Page, RecordQuery};
use crate::error::Result;
use crate::port::RecordStore;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Runs record queries against an injected store
pub struct CatalogService {
    store: Arc<dyn RecordStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Validate and run a query
    ///
    /// # Errors
    /// - `Domain(InvalidQuery)` for malformed queries (nothing reaches the store)
    /// - `RecordStore` for backend failures
    pub async fn search(&self, query: &RecordQuery) -> Result<Page<Value>> {
        query.validate()?;
        debug!(
            table = %query.table,
            filters = query.filters.len(),
            offset = query.page.offset,
            limit = query.page.limit,
            "Querying records"
        );

        let page = self.store.query(query).await?;

        info!(
            table = %query.table,
            returned = page.rows.len(),
            total_count = page.total_count,
            "Records fetched"
        );
        Ok(page)
    }

    /// Fetch the page following `page`, if any
    pub async fn next_page(
        &self,
        query: &RecordQuery,
        page: &Page<Value>,
    ) -> Result<Option<Page<Value>>> {
        if !page.has_more() {
            return Ok(None);
        }
        let next = query
            .clone()
            .page(page.offset + page.rows.len() as u64, query.page.limit);
        self.search(&next).await.map(Some)
    }
}
