// Search request model

use crate::domain::error::{DomainError, Result};
use crate::domain::sequence::SequenceKind;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default E-value cutoff
pub const DEFAULT_EVALUE: f64 = 10.0;

/// Default scoring matrix
pub const DEFAULT_MATRIX: &str = "BLOSUM62";

/// BLAST program variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Blastp,
    Blastn,
    Blastx,
    Tblastn,
    Tblastx,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Blastp => "blastp",
            Algorithm::Blastn => "blastn",
            Algorithm::Blastx => "blastx",
            Algorithm::Tblastn => "tblastn",
            Algorithm::Tblastx => "tblastx",
        }
    }

    /// Alphabet the query must be written in
    pub fn query_kind(&self) -> SequenceKind {
        match self {
            Algorithm::Blastp | Algorithm::Tblastn => SequenceKind::Protein,
            Algorithm::Blastn | Algorithm::Blastx | Algorithm::Tblastx => {
                SequenceKind::Nucleotide
            }
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "blastp" => Ok(Algorithm::Blastp),
            "blastn" => Ok(Algorithm::Blastn),
            "blastx" => Ok(Algorithm::Blastx),
            "tblastn" => Ok(Algorithm::Tblastn),
            "tblastx" => Ok(Algorithm::Tblastx),
            other => Err(DomainError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Parameters for one search job (immutable once submitted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParameters {
    pub sequence: String,
    pub algorithm: Algorithm,
    #[serde(rename = "evalue")]
    pub significance_threshold: f64,
    #[serde(rename = "matrix")]
    pub substitution_matrix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap_open: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap_extend: Option<u32>,
    #[serde(
        rename = "maxTargetSeqs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub max_hits: Option<u32>,
}

impl SearchParameters {
    pub fn new(sequence: impl Into<String>, algorithm: Algorithm) -> Self {
        Self {
            sequence: sequence.into(),
            algorithm,
            significance_threshold: DEFAULT_EVALUE,
            substitution_matrix: DEFAULT_MATRIX.to_string(),
            word_size: None,
            gap_open: None,
            gap_extend: None,
            max_hits: None,
        }
    }

    pub fn with_evalue(mut self, evalue: f64) -> Self {
        self.significance_threshold = evalue;
        self
    }

    pub fn with_matrix(mut self, matrix: impl Into<String>) -> Self {
        self.substitution_matrix = matrix.into();
        self
    }

    pub fn with_word_size(mut self, word_size: u32) -> Self {
        self.word_size = Some(word_size);
        self
    }

    pub fn with_gap_costs(mut self, open: u32, extend: u32) -> Self {
        self.gap_open = Some(open);
        self.gap_extend = Some(extend);
        self
    }

    pub fn with_max_hits(mut self, max_hits: u32) -> Self {
        self.max_hits = Some(max_hits);
        self
    }

    /// Sanity-check the numeric knobs (the sequence is checked separately)
    pub fn check_numeric(&self) -> Result<()> {
        if !(self.significance_threshold.is_finite() && self.significance_threshold > 0.0) {
            return Err(DomainError::InvalidParameter(format!(
                "evalue must be a positive number, got {}",
                self.significance_threshold
            )));
        }
        if self.substitution_matrix.trim().is_empty() {
            return Err(DomainError::InvalidParameter(
                "substitution matrix must not be empty".to_string(),
            ));
        }
        if self.max_hits == Some(0) {
            return Err(DomainError::InvalidParameter(
                "maxTargetSeqs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_field_names() {
        let params = SearchParameters::new("MTEYKLVVVGAGGVGKSALT", Algorithm::Blastp)
            .with_evalue(1e-5)
            .with_max_hits(50);

        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(
            value,
            json!({
                "sequence": "MTEYKLVVVGAGGVGKSALT",
                "algorithm": "blastp",
                "evalue": 1e-5,
                "matrix": "BLOSUM62",
                "maxTargetSeqs": 50
            })
        );
    }

    #[test]
    fn test_gap_costs_serialized_camel_case() {
        let params = SearchParameters::new("ACGTACGTACGT", Algorithm::Blastn)
            .with_word_size(11)
            .with_gap_costs(5, 2);
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["wordSize"], 11);
        assert_eq!(value["gapOpen"], 5);
        assert_eq!(value["gapExtend"], 2);
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("BLASTP".parse::<Algorithm>().unwrap(), Algorithm::Blastp);
        assert_eq!("tblastx".parse::<Algorithm>().unwrap(), Algorithm::Tblastx);
        assert!("psiblast".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_numeric_checks() {
        let ok = SearchParameters::new("x", Algorithm::Blastp);
        assert!(ok.check_numeric().is_ok());

        assert!(ok.clone().with_evalue(0.0).check_numeric().is_err());
        assert!(ok.clone().with_evalue(f64::NAN).check_numeric().is_err());
        assert!(ok.clone().with_max_hits(0).check_numeric().is_err());
        assert!(ok.with_matrix("  ").check_numeric().is_err());
    }
}
