// Search result model (immutable once fetched)

use crate::domain::job::JobId;
use serde::{Deserialize, Serialize};

/// One aligned match between the query and a database entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hit {
    /// Subject accession / identifier
    pub id: String,
    #[serde(default)]
    pub gene_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein_name: Option<String>,
    pub score: f64,
    pub evalue: f64,
    /// Percent identity (0-100)
    pub identity: f64,
    /// Percent positives (0-100)
    #[serde(default)]
    pub positives: f64,
    #[serde(default)]
    pub gaps: u32,
    pub query_start: u32,
    pub query_end: u32,
    pub subject_start: u32,
    pub subject_end: u32,
    #[serde(default)]
    pub query_seq: String,
    #[serde(default)]
    pub subject_seq: String,
    /// Midline / rendered alignment text
    #[serde(default)]
    pub alignment: String,
    pub alignment_length: u32,
}

impl Hit {
    /// Fraction of the query covered by this alignment (0.0 - 1.0)
    pub fn query_coverage(&self, query_length: u32) -> f64 {
        if query_length == 0 {
            return 0.0;
        }
        let (lo, hi) = if self.query_start <= self.query_end {
            (self.query_start, self.query_end)
        } else {
            (self.query_end, self.query_start)
        };
        let span = hi.saturating_sub(lo) + 1;
        (span as f64 / query_length as f64).min(1.0)
    }
}

/// Karlin-Altschul parameters and database info for a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStatistics {
    pub kappa: f64,
    pub lambda: f64,
    pub entropy: f64,
    pub database_name: String,
    #[serde(default)]
    pub database_version: String,
    pub total_sequences: u64,
}

/// Result set for a completed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSet {
    pub job_id: JobId,
    pub query_length: u32,
    /// Total residues in the searched database
    pub database_size: u64,
    pub total_hits: u32,
    #[serde(default)]
    pub hits: Vec<Hit>,
    pub statistics: SearchStatistics,
    /// Seconds
    #[serde(default)]
    pub execution_time: f64,
}

impl ResultSet {
    /// Best (lowest E-value) hit, if any
    pub fn best_hit(&self) -> Option<&Hit> {
        self.hits
            .iter()
            .min_by(|a, b| a.evalue.total_cmp(&b.evalue))
    }

    /// Hits at or below the given E-value, in server order
    pub fn significant_hits(&self, max_evalue: f64) -> impl Iterator<Item = &Hit> {
        self.hits.iter().filter(move |h| h.evalue <= max_evalue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ResultSet {
        serde_json::from_value(json!({
            "jobId": "job-7",
            "queryLength": 189,
            "databaseSize": 205_000_000u64,
            "totalHits": 2,
            "hits": [
                {
                    "id": "P01116",
                    "geneNames": ["KRAS", "KRAS2"],
                    "proteinName": "GTPase KRas",
                    "score": 380.0,
                    "evalue": 1e-130,
                    "identity": 100.0,
                    "positives": 100.0,
                    "gaps": 0,
                    "queryStart": 1,
                    "queryEnd": 189,
                    "subjectStart": 1,
                    "subjectEnd": 189,
                    "querySeq": "MTEYKLVVVG",
                    "subjectSeq": "MTEYKLVVVG",
                    "alignment": "MTEYKLVVVG",
                    "alignmentLength": 189
                },
                {
                    "id": "P01112",
                    "score": 330.5,
                    "evalue": 2e-110,
                    "identity": 85.2,
                    "queryStart": 95,
                    "queryEnd": 1,
                    "subjectStart": 1,
                    "subjectEnd": 95,
                    "alignmentLength": 95
                }
            ],
            "statistics": {
                "kappa": 0.041,
                "lambda": 0.267,
                "entropy": 0.14,
                "databaseName": "uniprot_sprot",
                "databaseVersion": "2024_01",
                "totalSequences": 570_000
            },
            "executionTime": 1.25
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_with_optional_fields_missing() {
        let result = sample();
        assert_eq!(result.hits.len(), 2);
        let second = &result.hits[1];
        assert!(second.gene_names.is_empty());
        assert!(second.protein_name.is_none());
        assert_eq!(second.gaps, 0);
        assert_eq!(result.statistics.database_name, "uniprot_sprot");
    }

    #[test]
    fn test_best_hit_and_filter() {
        let result = sample();
        assert_eq!(result.best_hit().unwrap().id, "P01116");
        assert_eq!(result.significant_hits(1e-120).count(), 1);
        assert_eq!(result.significant_hits(1.0).count(), 2);
    }

    #[test]
    fn test_coverage_handles_reverse_coordinates() {
        let result = sample();
        assert!((result.hits[0].query_coverage(189) - 1.0).abs() < f64::EPSILON);
        let cov = result.hits[1].query_coverage(189);
        assert!((cov - 95.0 / 189.0).abs() < 1e-9);
        assert_eq!(result.hits[1].query_coverage(0), 0.0);
    }
}
