// Command-line input helpers

use anyhow::{Context, Result};
use std::io::Read;

/// Resolve a sequence argument: literal text, `@path` for a file, `-` for stdin
///
/// FASTA header lines (`>...`) in files or stdin are dropped; the remaining
/// lines are joined before validation.
pub fn read_sequence(arg: &str) -> Result<String> {
    let raw = if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read sequence from stdin")?;
        buf
    } else if let Some(path) = arg.strip_prefix('@') {
        let path = shellexpand::tilde(path).into_owned();
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read sequence file {}", path))?
    } else {
        return Ok(arg.to_string());
    };
    Ok(strip_fasta_headers(&raw))
}

fn strip_fasta_headers(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with('>'))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_literal_passthrough() {
        assert_eq!(read_sequence(">MTEYK").unwrap(), ">MTEYK");
    }

    #[test]
    fn test_fasta_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, ">sp|P01116|RASK_HUMAN GTPase KRas\nMTEYKLVVVG\nAGGVGKSALT").unwrap();

        let arg = format!("@{}", file.path().display());
        assert_eq!(read_sequence(&arg).unwrap(), "MTEYKLVVVG\nAGGVGKSALT");
    }

    #[test]
    fn test_missing_file() {
        assert!(read_sequence("@/nonexistent/query.fasta").is_err());
    }
}
