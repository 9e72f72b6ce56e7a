//! Record store query model.
//!
//! Describes parameterized queries against wide tables of biological
//! entities (proteins, genes, structures). The model is deliberately
//! backend-neutral: adapters translate it to their own wire format.

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default page size when none is given
pub const DEFAULT_PAGE_SIZE: u64 = 25;

/// Hard cap on page size
pub const MAX_PAGE_SIZE: u64 = 1000;

/// Filter predicate on one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Predicate {
    /// Column equals value
    Eq(Value),
    /// Numeric column within [min, max]; either bound may be open
    Range { min: Option<f64>, max: Option<f64> },
    /// Case-insensitive substring match; `%` matches any run of characters
    Like(String),
    /// Array column shares at least one element with the given set
    Overlaps(Vec<Value>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Query against one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordQuery {
    pub table: String,
    pub filters: Vec<(String, Predicate)>,
    pub sort: Option<SortKey>,
    pub page: Pagination,
}

impl RecordQuery {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            sort: None,
            page: Pagination::default(),
        }
    }

    pub fn filter(mut self, column: impl Into<String>, predicate: Predicate) -> Self {
        self.filters.push((column.into(), predicate));
        self
    }

    pub fn sort_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(SortKey {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn page(mut self, offset: u64, limit: u64) -> Self {
        self.page = Pagination { offset, limit };
        self
    }

    /// Reject queries no backend could answer sensibly
    pub fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(DomainError::InvalidQuery("table name is empty".to_string()));
        }
        if self.page.limit == 0 || self.page.limit > MAX_PAGE_SIZE {
            return Err(DomainError::InvalidQuery(format!(
                "page limit must be within 1..={}, got {}",
                MAX_PAGE_SIZE, self.page.limit
            )));
        }
        for (column, predicate) in &self.filters {
            if column.trim().is_empty() {
                return Err(DomainError::InvalidQuery("filter column is empty".to_string()));
            }
            if let Predicate::Range {
                min: Some(lo),
                max: Some(hi),
            } = predicate
            {
                if lo > hi {
                    return Err(DomainError::InvalidQuery(format!(
                        "range on '{}' is empty: {} > {}",
                        column, lo, hi
                    )));
                }
            }
        }
        Ok(())
    }
}

/// One page of rows plus the exact count of matching rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total_count: u64,
    pub offset: u64,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.offset + (self.rows.len() as u64) < self.total_count
    }
}
