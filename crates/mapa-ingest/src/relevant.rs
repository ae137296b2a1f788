//! Relevant candidate list
//!
//! A comma-delimited file with a header row; only the `nome_urna` column is
//! read. Names are trimmed, blanks dropped and repeats removed, keeping the
//! first occurrence.

use crate::error::{IngestError, Result};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Column holding the ballot name
pub const NOME_URNA_COLUMN: &str = "nome_urna";

/// Read the ballot names listed in the file at `path`
pub fn read_relevant_names(path: &Path) -> Result<Vec<String>> {
    let file = std::fs::File::open(path).map_err(|e| IngestError::CandidateList {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let names = names_from_reader(file).map_err(|message| IngestError::CandidateList {
        path: path.to_path_buf(),
        message,
    })?;

    debug!(path = %path.display(), names = names.len(), "Read relevant candidate list");
    Ok(names)
}

fn names_from_reader<R: Read>(reader: R) -> std::result::Result<Vec<String>, String> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .flexible(true)
        .from_reader(reader);

    let column = csv
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .position(|header| header.trim().trim_start_matches('\u{feff}') == NOME_URNA_COLUMN)
        .ok_or_else(|| format!("missing '{}' column", NOME_URNA_COLUMN))?;

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for record in csv.records() {
        let record = record.map_err(|e| e.to_string())?;
        let Some(name) = record.get(column).map(str::trim) else {
            continue;
        };
        if !name.is_empty() && seen.insert(name.to_string()) {
            names.push(name.to_string());
        }
    }

    Ok(names)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_names_trimmed_deduplicated_in_order() {
        let file = csv_file("cargo,nome_urna\nvereador, MARIA \nprefeito,JOANA\nvereador,MARIA\nvereador,\n");
        let names = read_relevant_names(file.path()).unwrap();
        assert_eq!(names, vec!["MARIA", "JOANA"]);
    }

    #[test]
    fn test_quoted_names_with_commas() {
        let file = csv_file("nome_urna\n\"SILVA, ANA\"\n");
        assert_eq!(read_relevant_names(file.path()).unwrap(), vec!["SILVA, ANA"]);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let file = csv_file("nome\nMARIA\n");
        let err = read_relevant_names(file.path()).unwrap_err();
        assert!(matches!(err, IngestError::CandidateList { ref message, .. } if message.contains("nome_urna")));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = read_relevant_names(Path::new("/nonexistent/candidatas.csv")).unwrap_err();
        assert!(matches!(err, IngestError::CandidateList { .. }));
    }

    #[test]
    fn test_header_only_gives_empty_list() {
        let file = csv_file("nome_urna\n");
        assert!(read_relevant_names(file.path()).unwrap().is_empty());
    }
}
