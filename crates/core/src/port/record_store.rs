// Record Store Port (Interface)
// Hosted table store holding protein/gene records

use crate::domain::{Page, Predicate, RecordQuery, SortDirection};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

/// Query interface for the record store
///
/// Injected as a capability so the hosted backend can be swapped for
/// [`InMemoryRecordStore`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Run a filtered, sorted, paginated query; `total_count` is exact
    async fn query(&self, query: &RecordQuery) -> Result<Page<Value>>;
}

/// In-memory record store over JSON rows
#[derive(Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<HashMap<String, Vec<Value>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a table's rows
    pub fn load(&self, table: impl Into<String>, rows: Vec<Value>) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| AppError::RecordStore(format!("lock poisoned: {}", e)))?;
        tables.insert(table.into(), rows);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn query(&self, query: &RecordQuery) -> Result<Page<Value>> {
        query.validate()?;

        let tables = self
            .tables
            .read()
            .map_err(|e| AppError::RecordStore(format!("lock poisoned: {}", e)))?;
        let rows = tables
            .get(&query.table)
            .ok_or_else(|| AppError::RecordStore(format!("unknown table '{}'", query.table)))?;

        let mut matched: Vec<&Value> = rows
            .iter()
            .filter(|row| {
                query
                    .filters
                    .iter()
                    .all(|(column, predicate)| matches(row.get(column), predicate))
            })
            .collect();

        if let Some(sort) = &query.sort {
            matched.sort_by(|a, b| {
                match (present(a.get(&sort.column)), present(b.get(&sort.column))) {
                    (None, None) => Ordering::Equal,
                    (None, Some(_)) => Ordering::Greater,
                    (Some(_), None) => Ordering::Less,
                    (Some(x), Some(y)) => match sort.direction {
                        SortDirection::Asc => compare(x, y),
                        SortDirection::Desc => compare(x, y).reverse(),
                    },
                }
            });
        }

        let total_count = matched.len() as u64;
        let rows = matched
            .into_iter()
            .skip(query.page.offset as usize)
            .take(query.page.limit as usize)
            .cloned()
            .collect();

        Ok(Page {
            rows,
            total_count,
            offset: query.page.offset,
        })
    }
}

fn matches(field: Option<&Value>, predicate: &Predicate) -> bool {
    let Some(field) = field else {
        return false;
    };
    match predicate {
        Predicate::Eq(expected) => field == expected,
        Predicate::Range { min, max } => match field.as_f64() {
            Some(v) => min.map_or(true, |lo| v >= lo) && max.map_or(true, |hi| v <= hi),
            None => false,
        },
        Predicate::Like(pattern) => field
            .as_str()
            .is_some_and(|s| like(&s.to_lowercase(), &pattern.to_lowercase())),
        Predicate::Overlaps(wanted) => field
            .as_array()
            .is_some_and(|items| items.iter().any(|item| wanted.contains(item))),
    }
}

/// Substring match where `%` is a wildcard; a pattern without `%` matches anywhere
fn like(haystack: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('%').filter(|p| !p.is_empty()).collect();
    let anchored_start = !pattern.is_empty() && pattern.contains('%') && !pattern.starts_with('%');
    let anchored_end = !pattern.is_empty() && pattern.contains('%') && !pattern.ends_with('%');

    let mut rest = haystack;
    for (i, part) in parts.iter().enumerate() {
        if i == 0 && anchored_start {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
            continue;
        }
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    if anchored_end {
        if let Some(last) = parts.last() {
            return haystack.ends_with(last);
        }
    }
    true
}

fn present(v: Option<&Value>) -> Option<&Value> {
    v.filter(|v| !v.is_null())
}

/// Numbers compare numerically; everything else as text
fn compare(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => text(a).cmp(&text(b)),
    }
}

fn text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
