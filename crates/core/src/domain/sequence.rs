//! Query sequence validation.
//!
//! Runs locally before anything is sent to the compute service. Validation
//! strips whitespace and a leading FASTA `>` marker, then checks length and
//! alphabet. The returned sequence is cleaned but not case-normalized.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest accepted query (residues, after cleaning)
pub const MIN_SEQUENCE_LENGTH: usize = 10;

/// Longest accepted query (residues, after cleaning)
pub const MAX_SEQUENCE_LENGTH: usize = 10_000;

const AMINO_ACID_ALPHABET: &[u8] = b"ACDEFGHIKLMNPQRSTVWYX*-";
const NUCLEOTIDE_ALPHABET: &[u8] = b"ACGTUNRYMKSWBDHV-";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Sequence is empty")]
    EmptyInput,

    #[error("Sequence too short: {length} residues (minimum {min})")]
    TooShort { length: usize, min: usize },

    #[error("Sequence too long: {length} residues (maximum {max})")]
    TooLong { length: usize, max: usize },

    #[error("Sequence contains invalid characters: {invalid}")]
    InvalidCharacters { invalid: String },
}

/// Alphabet a validated sequence belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceKind {
    Protein,
    Nucleotide,
}

impl std::fmt::Display for SequenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceKind::Protein => write!(f, "protein"),
            SequenceKind::Nucleotide => write!(f, "nucleotide"),
        }
    }
}

/// A sequence that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSequence {
    residues: String,
    kind: SequenceKind,
}

impl ValidatedSequence {
    pub fn as_str(&self) -> &str {
        &self.residues
    }

    pub fn kind(&self) -> SequenceKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.residues.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    pub fn into_string(self) -> String {
        self.residues
    }
}

/// Validate a raw query sequence.
///
/// Whitespace anywhere and one leading `>` are removed first. A sequence made
/// only of characters shared by both alphabets is reported as nucleotide.
pub fn validate_sequence(raw: &str) -> Result<ValidatedSequence, ValidationError> {
    let cleaned = clean(raw);

    if cleaned.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    // Residues, not bytes
    let length = cleaned.chars().count();
    if length < MIN_SEQUENCE_LENGTH {
        return Err(ValidationError::TooShort {
            length,
            min: MIN_SEQUENCE_LENGTH,
        });
    }
    if length > MAX_SEQUENCE_LENGTH {
        return Err(ValidationError::TooLong {
            length,
            max: MAX_SEQUENCE_LENGTH,
        });
    }

    let kind = if within(&cleaned, NUCLEOTIDE_ALPHABET) {
        SequenceKind::Nucleotide
    } else if within(&cleaned, AMINO_ACID_ALPHABET) {
        SequenceKind::Protein
    } else {
        return Err(ValidationError::InvalidCharacters {
            invalid: offending_chars(&cleaned),
        });
    };

    Ok(ValidatedSequence {
        residues: cleaned,
        kind,
    })
}

fn clean(raw: &str) -> String {
    let without_ws: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    match without_ws.strip_prefix('>') {
        Some(rest) => rest.to_string(),
        None => without_ws,
    }
}

fn within(seq: &str, alphabet: &[u8]) -> bool {
    seq.chars().all(|c| {
        c.is_ascii() && alphabet.contains(&(c.to_ascii_uppercase() as u8))
    })
}

/// Distinct characters outside both alphabets, in order of first appearance
fn offending_chars(seq: &str) -> String {
    let mut seen = Vec::new();
    for c in seq.chars() {
        let legal = c.is_ascii() && {
            let b = c.to_ascii_uppercase() as u8;
            AMINO_ACID_ALPHABET.contains(&b) || NUCLEOTIDE_ALPHABET.contains(&b)
        };
        if !legal && !seen.contains(&c) {
            seen.push(c);
        }
    }
    if seen.is_empty() {
        // Mixed alphabets: every char is legal somewhere but no single alphabet covers them
        return "mixed protein/nucleotide alphabet".to_string();
    }
    seen.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KRAS: &str = "MTEYKLVVVGAGGVGKSALTIQLIQNHFVDEYDPTIEDSYRKQVVIDGETCLLDILDTAGQEEYSAMRDQYMRTGEGFLCVFAINNTKSFEDIHQYREQIKRVKDSDDVPMVLVGNKCDLAARTVESRQAQDLARSYGIPYIETSAKTRQGVEDAFYTLVREIRQHKLRKLNPPDESGPGCMSCKCVLS";

    #[test]
    fn test_empty_after_cleaning() {
        assert_eq!(validate_sequence(""), Err(ValidationError::EmptyInput));
        assert_eq!(validate_sequence("  \n\t "), Err(ValidationError::EmptyInput));
        assert_eq!(validate_sequence(">"), Err(ValidationError::EmptyInput));
    }

    #[test]
    fn test_too_short_counts_cleaned_length() {
        // 9 residues once whitespace and marker are gone
        let result = validate_sequence("> MTEY KLVVV \n");
        assert_eq!(
            result,
            Err(ValidationError::TooShort { length: 9, min: 10 })
        );
    }

    #[test]
    fn test_length_boundaries() {
        assert!(validate_sequence(&"A".repeat(10)).is_ok());
        assert!(validate_sequence(&"A".repeat(10_000)).is_ok());
        assert_eq!(
            validate_sequence(&"A".repeat(10_001)),
            Err(ValidationError::TooLong {
                length: 10_001,
                max: 10_000
            })
        );
    }

    #[test]
    fn test_amino_acid_alphabet_accepted() {
        let all = "ACDEFGHIKLMNPQRSTVWYX*-";
        let validated = validate_sequence(all).unwrap();
        assert_eq!(validated.kind(), SequenceKind::Protein);

        let validated = validate_sequence(&all.to_lowercase()).unwrap();
        assert_eq!(validated.as_str(), all.to_lowercase());
    }

    #[test]
    fn test_nucleotide_detected() {
        let validated = validate_sequence("ACGTACGTNNACGU").unwrap();
        assert_eq!(validated.kind(), SequenceKind::Nucleotide);
    }

    #[test]
    fn test_kras_is_protein_and_unchanged() {
        let validated = validate_sequence(KRAS).unwrap();
        assert_eq!(validated.kind(), SequenceKind::Protein);
        assert_eq!(validated.as_str(), KRAS);
    }

    #[test]
    fn test_fasta_header_marker_stripped() {
        let validated = validate_sequence(">MTEYKLVVVG\nAGGVGKSALT").unwrap();
        assert_eq!(validated.as_str(), "MTEYKLVVVGAGGVGKSALT");
    }

    #[test]
    fn test_invalid_characters_reported() {
        let err = validate_sequence("MTEYKLVVVG1234").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidCharacters {
                invalid: "1234".to_string()
            }
        );

        // 'J', 'O', 'Z' are in neither alphabet
        assert!(matches!(
            validate_sequence("MTEYKLVVVGJOZ"),
            Err(ValidationError::InvalidCharacters { .. })
        ));
    }

    #[test]
    fn test_non_ascii_rejected() {
        assert!(matches!(
            validate_sequence("MTEYKLVVVGÄÄ"),
            Err(ValidationError::InvalidCharacters { .. })
        ));
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        assert_eq!(
            validate_sequence("ÄÄÄÄÄ"),
            Err(ValidationError::TooShort { length: 5, min: 10 })
        );
        // 10,002 bytes but only 5,001 residues
        assert_eq!(
            validate_sequence(&"é".repeat(5_001)),
            Err(ValidationError::InvalidCharacters {
                invalid: "é".to_string()
            })
        );
        assert!(matches!(
            validate_sequence(&"é".repeat(10_001)),
            Err(ValidationError::TooLong { length: 10_001, .. })
        ));
    }

    #[test]
    fn test_validated_len_matches_cleaned_residues() {
        let validated = validate_sequence(">MTEY KLVVVG\nAGG").unwrap();
        assert_eq!(validated.len(), 13);
        assert!(!validated.is_empty());
    }

    #[test]
    fn test_every_char_outside_both_alphabets_rejected() {
        let base = "MTEYKLVVVG";
        for c in ('!'..='~').filter(|c| {
            let b = c.to_ascii_uppercase() as u8;
            !c.is_whitespace()
                && !AMINO_ACID_ALPHABET.contains(&b)
                && !NUCLEOTIDE_ALPHABET.contains(&b)
                && *c != '>'
        }) {
            let seq = format!("{}{}", base, c);
            assert!(
                matches!(
                    validate_sequence(&seq),
                    Err(ValidationError::InvalidCharacters { .. })
                ),
                "expected {:?} to be rejected",
                c
            );
        }
    }
}
