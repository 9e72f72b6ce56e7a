// Parsing of `catalog` filter/sort flags into a RecordQuery

use anyhow::{anyhow, bail, Context, Result};
use blastwatch_core::domain::{Predicate, RecordQuery, SortDirection};
use serde_json::Value;

/// Raw flag values as given on the command line
#[derive(Debug, Default)]
pub struct CatalogArgs {
    pub table: String,
    pub filters: Vec<String>,
    pub ranges: Vec<String>,
    pub likes: Vec<String>,
    pub overlaps: Vec<String>,
    pub sort: Option<String>,
    pub offset: u64,
    pub limit: u64,
}

impl CatalogArgs {
    pub fn to_query(&self) -> Result<RecordQuery> {
        let mut query = RecordQuery::table(&self.table).page(self.offset, self.limit);

        for raw in &self.filters {
            let (column, value) = split_pair(raw, "--filter")?;
            query = query.filter(column, Predicate::Eq(scalar(value)));
        }
        for raw in &self.ranges {
            let (column, bounds) = split_pair(raw, "--range")?;
            let (min, max) = parse_range(bounds)
                .with_context(|| format!("Invalid --range '{}'", raw))?;
            query = query.filter(column, Predicate::Range { min, max });
        }
        for raw in &self.likes {
            let (column, pattern) = split_pair(raw, "--like")?;
            query = query.filter(column, Predicate::Like(pattern.to_string()));
        }
        for raw in &self.overlaps {
            let (column, items) = split_pair(raw, "--overlaps")?;
            let values = items.split(',').map(|s| scalar(s.trim())).collect();
            query = query.filter(column, Predicate::Overlaps(values));
        }
        if let Some(raw) = &self.sort {
            let (column, direction) = match raw.rsplit_once(':') {
                Some((column, "desc")) => (column, SortDirection::Desc),
                Some((column, "asc")) => (column, SortDirection::Asc),
                Some((_, other)) => bail!("Unknown sort direction '{}'", other),
                None => (raw.as_str(), SortDirection::Asc),
            };
            query = query.sort_by(column, direction);
        }

        Ok(query)
    }
}

fn split_pair<'a>(raw: &'a str, flag: &str) -> Result<(&'a str, &'a str)> {
    raw.split_once('=')
        .filter(|(column, _)| !column.trim().is_empty())
        .map(|(column, value)| (column.trim(), value))
        .ok_or_else(|| anyhow!("{} expects column=value, got '{}'", flag, raw))
}

/// `min..max` with either side optional
fn parse_range(bounds: &str) -> Result<(Option<f64>, Option<f64>)> {
    let (lo, hi) = bounds
        .split_once("..")
        .ok_or_else(|| anyhow!("expected min..max"))?;
    let parse = |s: &str| -> Result<Option<f64>> {
        let s = s.trim();
        if s.is_empty() {
            Ok(None)
        } else {
            s.parse::<f64>().map(Some).context("bound is not a number")
        }
    };
    Ok((parse(lo)?, parse(hi)?))
}

/// Numbers and booleans as JSON scalars, everything else as a string
fn scalar(raw: &str) -> Value {
    serde_json::from_str::<Value>(raw)
        .ok()
        .filter(|v| v.is_number() || v.is_boolean() || v.is_null())
        .unwrap_or_else(|| Value::String(raw.to_string()))
}
