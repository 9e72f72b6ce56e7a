// Terminal rendering for statuses, results and records

use blastwatch_core::domain::{Hit, JobState, JobStatus, Page, ResultSet};
use colored::Colorize;
use serde_json::Value;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct HitRow {
    #[tabled(rename = "#")]
    rank: usize,
    accession: String,
    gene: String,
    protein: String,
    #[tabled(rename = "e-value")]
    evalue: String,
    score: String,
    #[tabled(rename = "identity %")]
    identity: String,
    coverage: String,
}

impl HitRow {
    fn new(rank: usize, hit: &Hit, query_length: u32) -> Self {
        Self {
            rank,
            accession: hit.id.clone(),
            gene: hit.gene_names.join(", "),
            protein: hit.protein_name.clone().unwrap_or_default(),
            evalue: format!("{:.2e}", hit.evalue),
            score: format!("{:.1}", hit.score),
            identity: format!("{:.1}", hit.identity),
            coverage: format!("{:.0}%", hit.query_coverage(query_length) * 100.0),
        }
    }
}

pub fn state_label(state: JobState) -> colored::ColoredString {
    match state {
        JobState::Pending => "PENDING".yellow(),
        JobState::Running => "RUNNING".cyan(),
        JobState::Completed => "COMPLETED".green(),
        JobState::Failed => "FAILED".red(),
    }
}

pub fn print_status(status: &JobStatus) {
    println!("  {} {}", "Job:".bold(), status.job_id);
    println!("  {} {}", "Status:".bold(), state_label(status.status));
    println!("  {} {}%", "Progress:".bold(), status.progress);
    if let Some(eta) = status.estimated_time_remaining {
        println!("  {} {}s", "ETA:".bold(), eta);
    }
    if let Some(error) = &status.error {
        println!("  {} {}", "Error:".bold(), error.red());
    }
}

pub fn print_result_set(result: &ResultSet, limit: usize) {
    println!(
        "{}",
        format!("✓ {} hits for job {}", result.total_hits, result.job_id)
            .green()
            .bold()
    );
    println!(
        "  {} {} ({}) {} sequences, searched in {:.2}s",
        "Database:".bold(),
        result.statistics.database_name,
        result.statistics.database_version,
        result.statistics.total_sequences,
        result.execution_time
    );
    println!();

    if result.hits.is_empty() {
        println!("{}", "No hits".yellow());
        return;
    }

    let rows: Vec<HitRow> = result
        .hits
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, hit)| HitRow::new(i + 1, hit, result.query_length))
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));

    if result.hits.len() > limit {
        println!("  … {} more (use --limit or --json)", result.hits.len() - limit);
    }
}

/// Render JSON rows as a table; columns are the union of keys in first-seen order
pub fn print_records(page: &Page<Value>) {
    let mut columns: Vec<String> = Vec::new();
    for row in &page.rows {
        if let Some(obj) = row.as_object() {
            for key in obj.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }

    let mut builder = tabled::builder::Builder::default();
    builder.push_record(columns.iter().cloned());
    for row in &page.rows {
        builder.push_record(columns.iter().map(|c| cell(row.get(c))));
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{}", table);

    let shown_to = page.offset + page.rows.len() as u64;
    println!(
        "  {} {}-{} of {}",
        "Rows:".bold(),
        if page.rows.is_empty() { 0 } else { page.offset + 1 },
        shown_to,
        page.total_count
    );
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| cell(Some(v)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blastwatch_core::port::blast_service::mocks::sample_result_set;
    use serde_json::json;

    #[test]
    fn test_hit_row_formatting() {
        let result = sample_result_set("job-1");
        let row = HitRow::new(1, &result.hits[0], result.query_length);
        assert_eq!(row.accession, "P01116");
        assert_eq!(row.gene, "KRAS");
        assert_eq!(row.coverage, "100%");
        assert_eq!(row.score, "380.0");
    }

    #[test]
    fn test_cell_rendering() {
        assert_eq!(cell(Some(&json!(["a", "b"]))), "a, b");
        assert_eq!(cell(Some(&json!(189))), "189");
        assert_eq!(cell(None), "");
    }
}
