//! Tabular article dataset: ten MEDLINE fields per row, persisted as CSV.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::DatasetError;
use super::medline::MedlineRecord;
use crate::fs_policy::{DirectoryPolicy, write_artifact};

/// The projected MEDLINE tags, in column order.
pub const FIELDS: [&str; 10] = ["AB", "AD", "AU", "DP", "TA", "JT", "PL", "PT", "PMID", "TI"];

/// Separator used when a tag carries several values (authors, affiliations).
pub const MULTI_VALUE_SEPARATOR: &str = "; ";

/// Column holding the abstract text.
pub const ABSTRACT_COLUMN: &str = "AB";

/// One article row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Abstract.
    #[serde(rename = "AB")]
    pub abstract_text: String,
    /// Author affiliations.
    #[serde(rename = "AD")]
    pub affiliations: String,
    /// Authors.
    #[serde(rename = "AU")]
    pub authors: String,
    /// Date of publication.
    #[serde(rename = "DP")]
    pub publication_date: String,
    /// Journal title abbreviation.
    #[serde(rename = "TA")]
    pub journal_abbreviation: String,
    /// Full journal title.
    #[serde(rename = "JT")]
    pub journal_title: String,
    /// Place of publication.
    #[serde(rename = "PL")]
    pub place: String,
    /// Publication types.
    #[serde(rename = "PT")]
    pub publication_types: String,
    /// PubMed identifier.
    #[serde(rename = "PMID")]
    pub pmid: String,
    /// Title.
    #[serde(rename = "TI")]
    pub title: String,
}

impl Article {
    /// Projects a record onto the ten columns.
    ///
    /// Returns `None` when any field is missing or blank.
    #[must_use]
    pub fn from_record(record: &MedlineRecord) -> Option<Self> {
        let field = |tag: &str| -> Option<String> {
            let joined = record
                .get(tag)?
                .iter()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
                .join(MULTI_VALUE_SEPARATOR);
            (!joined.is_empty()).then_some(joined)
        };

        Some(Self {
            abstract_text: field("AB")?,
            affiliations: field("AD")?,
            authors: field("AU")?,
            publication_date: field("DP")?,
            journal_abbreviation: field("TA")?,
            journal_title: field("JT")?,
            place: field("PL")?,
            publication_types: field("PT")?,
            pmid: field("PMID")?,
            title: field("TI")?,
        })
    }
}

/// Articles gathered across one or more searches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleTable {
    articles: Vec<Article>,
    dropped: usize,
}

impl ArticleTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from parsed records, dropping incomplete ones.
    #[must_use]
    pub fn from_records(records: &[MedlineRecord]) -> Self {
        let mut table = Self::new();
        table.extend_from_records(records);
        table
    }

    /// Appends complete records; incomplete ones are counted as dropped.
    pub fn extend_from_records(&mut self, records: &[MedlineRecord]) {
        let before = self.articles.len();
        let mut dropped = 0;
        for record in records {
            match Article::from_record(record) {
                Some(article) => self.articles.push(article),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(
                dropped,
                kept = self.articles.len() - before,
                "dropped records with missing fields"
            );
        }
        self.dropped += dropped;
    }

    /// Rows in insertion order.
    #[must_use]
    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Number of records dropped for missing fields.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Writes the table as CSV with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Io`] when the file cannot be written.
    #[instrument(skip(self), fields(rows = self.articles.len()))]
    pub fn write_csv(&self, path: &Path, policy: DirectoryPolicy) -> Result<(), DatasetError> {
        write_artifact(path, policy, |out| {
            let mut writer = csv::Writer::from_writer(out);
            if self.articles.is_empty() {
                writer.write_record(FIELDS)?;
            }
            for article in &self.articles {
                writer.serialize(article)?;
            }
            writer.flush()
        })
        .map_err(|e| DatasetError::io(path, e))?;
        info!(path = %path.display(), rows = self.articles.len(), "article dataset written");
        Ok(())
    }

    /// Reads a full table back from CSV.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Csv`] on unreadable files or rows.
    pub fn read_csv(path: &Path) -> Result<Self, DatasetError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| DatasetError::csv(path, e))?;
        let articles = reader
            .deserialize()
            .collect::<Result<Vec<Article>, _>>()
            .map_err(|e| DatasetError::csv(path, e))?;
        Ok(Self {
            articles,
            dropped: 0,
        })
    }
}

/// Reads one column of a CSV dataset.
///
/// Empty cells come back as `None`, so callers can apply their own policy to
/// missing values.
///
/// # Errors
///
/// Returns [`DatasetError::MissingColumn`] when the header lacks `column`, or
/// [`DatasetError::Csv`] on unreadable files or rows.
#[instrument]
pub fn read_column(path: &Path, column: &str) -> Result<Vec<Option<String>>, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| DatasetError::csv(path, e))?;
    let headers = reader.headers().map_err(|e| DatasetError::csv(path, e))?;
    let Some(index) = headers.iter().position(|h| h == column) else {
        return Err(DatasetError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        });
    };

    let mut values = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| DatasetError::csv(path, e))?;
        let value = row
            .get(index)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        values.push(value);
    }
    Ok(values)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn complete_record(pmid: &str) -> MedlineRecord {
        let mut record = MedlineRecord::new();
        for tag in FIELDS {
            if tag != "AU" && tag != "PMID" {
                record.push(tag, format!("{tag} value"));
            }
        }
        record.push("PMID", pmid);
        record.push("AU", "Smith J");
        record.push("AU", "Doe A");
        record
    }

    #[test]
    fn test_multi_valued_fields_are_joined() {
        let article = Article::from_record(&complete_record("1")).unwrap();
        assert_eq!(article.authors, "Smith J; Doe A");
        assert_eq!(article.pmid, "1");
    }

    fn record_with(overrides: &[(&str, Option<&str>)]) -> MedlineRecord {
        let base = complete_record("9");
        let mut record = MedlineRecord::new();
        for tag in base.tags() {
            match overrides.iter().find(|(t, _)| *t == tag) {
                Some((_, Some(value))) => record.push(tag, *value),
                Some((_, None)) => {}
                None => {
                    for value in base.get(tag).unwrap() {
                        record.push(tag, value.clone());
                    }
                }
            }
        }
        record
    }

    #[test]
    fn test_rows_with_missing_fields_are_dropped() {
        let missing_abstract = record_with(&[("AB", None)]);
        let blank_title = record_with(&[("TI", Some("   "))]);

        let table =
            ArticleTable::from_records(&[complete_record("1"), missing_abstract, blank_title]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.dropped(), 2);
        assert_eq!(table.articles()[0].pmid, "1");
    }

    #[test]
    fn test_csv_write_then_read_abstract_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("data.csv");
        let table = ArticleTable::from_records(&[complete_record("1"), complete_record("2")]);
        table.write_csv(&path, DirectoryPolicy::Create).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("AB,AD,AU,DP,TA,JT,PL,PT,PMID,TI"));

        let abstracts = read_column(&path, ABSTRACT_COLUMN).unwrap();
        assert_eq!(abstracts, vec![Some("AB value".to_string()); 2]);

        let reread = ArticleTable::read_csv(&path).unwrap();
        assert_eq!(reread.articles(), table.articles());
    }

    #[test]
    fn test_empty_table_still_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        ArticleTable::new().write_csv(&path, DirectoryPolicy::Create).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim(), "AB,AD,AU,DP,TA,JT,PL,PT,PMID,TI");
    }

    #[test]
    fn test_read_column_blank_cells_are_none_and_missing_column_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "PMID,AB\n1,first abstract\n2,\n").unwrap();

        let values = read_column(&path, "AB").unwrap();
        assert_eq!(values, vec![Some("first abstract".to_string()), None]);

        let err = read_column(&path, "TI").unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn { .. }));
    }

    #[test]
    fn test_require_existing_policy_fails_without_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("data.csv");
        let err = ArticleTable::new()
            .write_csv(&path, DirectoryPolicy::RequireExisting)
            .unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
        assert!(!path.exists());
    }
}
