//! Vocabulary (JSON) and corpus (Matrix Market) artifacts.

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::{debug, instrument};

use crate::fs_policy::{DirectoryPolicy, write_artifact};

use super::encoded::{Corpus, EncodedDocument};
use super::error::{CorpusError, ValidationError, json_type_name};
use super::vocabulary::{TermId, Vocabulary};

const MM_HEADER: &str = "%%MatrixMarket matrix coordinate real general";

/// Reads a token file: a JSON list of documents, each a list of string tokens.
///
/// # Errors
///
/// Returns [`CorpusError::Io`]/[`CorpusError::Json`] when the file cannot be read
/// or parsed, and [`CorpusError::Validation`] when its shape is wrong.
#[instrument]
pub fn load_documents(path: &Path) -> Result<Vec<Vec<String>>, CorpusError> {
    let raw = fs::read_to_string(path).map_err(|e| CorpusError::io(path, e))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| CorpusError::json(path, e))?;
    let documents = documents_from_json(&value)?;
    debug!(documents = documents.len(), "token file loaded");
    Ok(documents)
}

/// Validates a decoded token file and converts it into documents.
///
/// Empty documents are accepted. Nothing is coerced: every token must already
/// be a JSON string.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found, in document order.
pub fn documents_from_json(value: &serde_json::Value) -> Result<Vec<Vec<String>>, ValidationError> {
    let serde_json::Value::Array(raw_documents) = value else {
        return Err(ValidationError::NotAList {
            found: json_type_name(value),
        });
    };

    raw_documents
        .iter()
        .enumerate()
        .map(|(index, raw_document)| {
            let serde_json::Value::Array(raw_tokens) = raw_document else {
                return Err(ValidationError::DocumentNotAList {
                    index,
                    found: json_type_name(raw_document),
                });
            };
            raw_tokens
                .iter()
                .enumerate()
                .map(|(position, token)| match token {
                    serde_json::Value::String(token) => Ok(token.clone()),
                    other => Err(ValidationError::TokenNotAString {
                        document: index,
                        position,
                        found: json_type_name(other),
                    }),
                })
                .collect()
        })
        .collect()
}

/// Writes a token file (pretty JSON, order-preserving).
///
/// # Errors
///
/// Returns [`CorpusError::Io`] or [`CorpusError::Json`] on write failure.
#[instrument(skip(documents), fields(documents = documents.len()))]
pub fn save_documents(
    documents: &[Vec<String>],
    path: &Path,
    policy: DirectoryPolicy,
) -> Result<(), CorpusError> {
    write_artifact(path, policy, |writer| {
        serde_json::to_writer_pretty(&mut *writer, documents).map_err(std::io::Error::other)
    })
    .map_err(|e| CorpusError::io(path, e))
}

/// Saves a vocabulary as JSON.
///
/// # Errors
///
/// Returns [`CorpusError::Io`] on write failure.
#[instrument(skip(vocabulary), fields(terms = vocabulary.len()))]
pub fn save_vocabulary(
    vocabulary: &Vocabulary,
    path: &Path,
    policy: DirectoryPolicy,
) -> Result<(), CorpusError> {
    write_artifact(path, policy, |writer| {
        serde_json::to_writer_pretty(&mut *writer, vocabulary).map_err(std::io::Error::other)
    })
    .map_err(|e| CorpusError::io(path, e))
}

/// Loads a vocabulary saved by [`save_vocabulary`].
///
/// # Errors
///
/// Returns [`CorpusError::Io`] when unreadable and [`CorpusError::Corrupt`] when
/// the content does not describe a valid vocabulary.
#[instrument]
pub fn load_vocabulary(path: &Path) -> Result<Vocabulary, CorpusError> {
    let raw = fs::read_to_string(path).map_err(|e| CorpusError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| CorpusError::corrupt(path, e.to_string()))
}

/// Saves a corpus in Matrix Market coordinate format.
///
/// Rows are documents and columns are term ids, both 1-based. `num_terms` is the
/// vocabulary size, so trailing unused terms still count toward the column total.
///
/// # Errors
///
/// Returns [`CorpusError::Io`] on write failure.
#[instrument(skip(corpus), fields(documents = corpus.len(), nnz = corpus.num_nnz()))]
pub fn save_corpus(
    corpus: &Corpus,
    num_terms: usize,
    path: &Path,
    policy: DirectoryPolicy,
) -> Result<(), CorpusError> {
    write_artifact(path, policy, |writer| {
        writeln!(writer, "{MM_HEADER}")?;
        writeln!(writer, "{} {} {}", corpus.len(), num_terms, corpus.num_nnz())?;
        for (row, document) in corpus.iter().enumerate() {
            for (id, count) in document.iter() {
                writeln!(writer, "{} {} {}", row + 1, id + 1, count)?;
            }
        }
        Ok(())
    })
    .map_err(|e| CorpusError::io(path, e))
}

/// Loads a corpus written by [`save_corpus`] and returns it with its column count.
///
/// Comment lines (`%`) are skipped. Counts written as integral reals (`2.0`)
/// are accepted.
///
/// # Errors
///
/// Returns [`CorpusError::MatrixMarket`] for a malformed header, size line or entry.
#[instrument]
pub fn load_corpus(path: &Path) -> Result<(Corpus, usize), CorpusError> {
    let raw = fs::read_to_string(path).map_err(|e| CorpusError::io(path, e))?;
    let mut lines = raw.lines().enumerate();

    match lines.next() {
        Some((_, header)) if header.trim().eq_ignore_ascii_case(MM_HEADER) => {}
        _ => {
            return Err(CorpusError::matrix_market(
                path,
                1,
                "missing coordinate matrix header",
            ));
        }
    }

    let mut size: Option<(usize, usize, usize)> = None;
    let mut rows: Vec<Vec<(TermId, u32)>> = Vec::new();
    let mut seen_entries = 0_usize;

    for (index, line) in lines {
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(CorpusError::matrix_market(path, line_no, "expected three fields"));
        }

        let Some((num_docs, num_terms, _)) = size else {
            let parsed = parse_size_line(&fields)
                .ok_or_else(|| CorpusError::matrix_market(path, line_no, "invalid size line"))?;
            rows.try_reserve_exact(parsed.0).map_err(|_| {
                CorpusError::matrix_market(
                    path,
                    line_no,
                    format!("cannot hold {} documents", parsed.0),
                )
            })?;
            size = Some(parsed);
            continue;
        };

        let (row, column, count) = parse_entry(&fields)
            .ok_or_else(|| CorpusError::matrix_market(path, line_no, "invalid entry"))?;
        if row == 0 || row > num_docs || column == 0 || column > num_terms {
            return Err(CorpusError::matrix_market(
                path,
                line_no,
                format!("entry ({row}, {column}) outside {num_docs}x{num_terms}"),
            ));
        }
        let id = TermId::try_from(column - 1)
            .map_err(|_| CorpusError::matrix_market(path, line_no, "term id overflow"))?;
        if rows.len() < row {
            rows.resize_with(row, Vec::new);
        }
        rows[row - 1].push((id, count));
        seen_entries += 1;
    }

    let Some((num_docs, num_terms, num_nnz)) = size else {
        return Err(CorpusError::matrix_market(path, 2, "missing size line"));
    };
    if seen_entries != num_nnz {
        debug!(declared = num_nnz, seen = seen_entries, "entry count differs from header");
    }
    // Trailing empty documents have no entries; only the size line counts them.
    rows.resize_with(num_docs, Vec::new);

    let documents = rows.into_iter().map(EncodedDocument::from_pairs).collect();
    Ok((Corpus::new(documents), num_terms))
}

fn parse_size_line(fields: &[&str]) -> Option<(usize, usize, usize)> {
    Some((
        fields[0].parse().ok()?,
        fields[1].parse().ok()?,
        fields[2].parse().ok()?,
    ))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_entry(fields: &[&str]) -> Option<(usize, usize, u32)> {
    let row = fields[0].parse().ok()?;
    let column = fields[1].parse().ok()?;
    let count = match fields[2].parse::<u32>() {
        Ok(count) => count,
        Err(_) => {
            let real: f64 = fields[2].parse().ok()?;
            if real.fract() != 0.0 || real < 0.0 || real > f64::from(u32::MAX) {
                return None;
            }
            real as u32
        }
    };
    Some((row, column, count))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_documents_from_json_accepts_empty_documents() {
        let docs = documents_from_json(&json!([["a", "b"], [], ["c"]])).unwrap();
        assert_eq!(docs.len(), 3);
        assert!(docs[1].is_empty());
    }

    #[test]
    fn test_documents_from_json_rejects_non_string_token() {
        let err = documents_from_json(&json!([["a"], ["b", 3]])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TokenNotAString {
                document: 1,
                position: 1,
                found: "number"
            }
        );
    }

    #[test]
    fn test_documents_from_json_rejects_non_list_document() {
        let err = documents_from_json(&json!([["a"], "b c"])).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DocumentNotAList {
                index: 1,
                found: "string"
            }
        );
        let err = documents_from_json(&json!({"docs": []})).unwrap_err();
        assert_eq!(err, ValidationError::NotAList { found: "object" });
    }

    #[test]
    fn test_corpus_round_trip_keeps_empty_trailing_documents() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("corpus.mm");
        let corpus = Corpus::new(vec![
            EncodedDocument::from_pairs([(0, 2), (2, 1)]),
            EncodedDocument::new(),
            EncodedDocument::new(),
        ]);
        save_corpus(&corpus, 5, &path, DirectoryPolicy::Create).unwrap();
        let (loaded, num_terms) = load_corpus(&path).unwrap();
        assert_eq!(loaded, corpus);
        assert_eq!(num_terms, 5);
    }

    #[test]
    fn test_load_corpus_accepts_real_counts_and_comments() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("corpus.mm");
        fs::write(
            &path,
            "%%MatrixMarket matrix coordinate real general\n% written elsewhere\n2 3 2\n1 3 2.0\n2 1 1\n",
        )
        .unwrap();
        let (corpus, _) = load_corpus(&path).unwrap();
        assert_eq!(corpus.documents()[0].entries(), &[(2, 2)]);
        assert_eq!(corpus.documents()[1].entries(), &[(0, 1)]);
    }

    #[test]
    fn test_load_corpus_rejects_out_of_range_entry() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("corpus.mm");
        fs::write(
            &path,
            "%%MatrixMarket matrix coordinate real general\n1 2 1\n1 3 1\n",
        )
        .unwrap();
        let err = load_corpus(&path).unwrap_err();
        assert!(matches!(err, CorpusError::MatrixMarket { line: 3, .. }));
    }

    #[test]
    fn test_load_corpus_rejects_unallocatable_document_count() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("corpus.mm");
        fs::write(
            &path,
            "%%MatrixMarket matrix coordinate real general\n18446744073709551615 1 0\n",
        )
        .unwrap();
        let err = load_corpus(&path).unwrap_err();
        assert!(matches!(err, CorpusError::MatrixMarket { line: 2, .. }));
    }

    #[test]
    fn test_load_corpus_keeps_declared_empty_documents() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("corpus.mm");
        fs::write(
            &path,
            "%%MatrixMarket matrix coordinate real general\n4 0 0\n",
        )
        .unwrap();
        let (corpus, num_terms) = load_corpus(&path).unwrap();
        assert_eq!(corpus.len(), 4);
        assert!(corpus.iter().all(EncodedDocument::is_empty));
        assert_eq!(num_terms, 0);
    }

    #[test]
    fn test_vocabulary_round_trip_through_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("model").join("dictionary.json");
        let vocabulary = Vocabulary::from_documents(&[vec!["gene"], vec!["gene", "cell"]]);
        save_vocabulary(&vocabulary, &path, DirectoryPolicy::Create).unwrap();
        assert_eq!(load_vocabulary(&path).unwrap(), vocabulary);
    }

    #[test]
    fn test_load_vocabulary_reports_corrupt_content() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("dictionary.json");
        fs::write(&path, r#"{"terms": ["a"]}"#).unwrap();
        assert!(matches!(
            load_vocabulary(&path).unwrap_err(),
            CorpusError::Corrupt { .. }
        ));
    }
}
