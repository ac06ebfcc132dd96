//! MEDLINE text format parsing (`efetch` with `rettype=medline`).
//!
//! A record is a block of tagged lines:
//!
//! ```text
//! PMID- 31452104
//! TI  - Deep learning for
//!       medical imaging.
//! AU  - Smith J
//! AU  - Doe A
//! ```
//!
//! Tags are up to four characters, left-aligned and padded before `- `.
//! Lines indented by six spaces continue the previous value. Repeated tags
//! accumulate. Blank lines separate records.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::utils::compile_static_regex;

static TAG_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"^([A-Z0-9]{1,4})\s*- ?(.*)$"));

const CONTINUATION_INDENT: &str = "      ";

/// One MEDLINE record: every tag with its values in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedlineRecord {
    fields: BTreeMap<String, Vec<String>>,
}

impl MedlineRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value to `tag`.
    pub fn push(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(tag.into()).or_default().push(value.into());
    }

    /// All values of `tag`, in file order.
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&[String]> {
        self.fields.get(tag).map(Vec::as_slice)
    }

    /// First value of `tag`.
    #[must_use]
    pub fn first(&self, tag: &str) -> Option<&str> {
        self.get(tag).and_then(|values| values.first()).map(String::as_str)
    }

    /// The PubMed identifier, if present.
    #[must_use]
    pub fn pmid(&self) -> Option<&str> {
        self.first("PMID")
    }

    /// Tags present in this record.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Whether the record has no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn append_to_last(&mut self, tag: &str, continuation: &str) {
        if let Some(last) = self.fields.get_mut(tag).and_then(|values| values.last_mut()) {
            if !last.is_empty() {
                last.push(' ');
            }
            last.push_str(continuation);
        }
    }
}

/// Parses a MEDLINE text payload into records.
///
/// Lines that are neither tag lines nor continuations are skipped with a debug
/// log; an `efetch` payload may start with blank lines or carry trailing noise.
#[must_use]
pub fn parse_medline(text: &str) -> Vec<MedlineRecord> {
    let mut records = Vec::new();
    let mut current = MedlineRecord::new();
    let mut last_tag: Option<String> = None;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');

        if line.trim().is_empty() {
            if !current.is_empty() {
                records.push(std::mem::take(&mut current));
            }
            last_tag = None;
            continue;
        }

        if let Some(continuation) = line.strip_prefix(CONTINUATION_INDENT) {
            match &last_tag {
                Some(tag) => current.append_to_last(tag, continuation.trim()),
                None => debug!(line, "continuation line without a preceding tag"),
            }
            continue;
        }

        if let Some(caps) = TAG_LINE_RE.captures(line) {
            let tag = caps[1].to_string();
            let value = caps[2].trim().to_string();
            current.push(tag.clone(), value);
            last_tag = Some(tag);
        } else {
            debug!(line, "skipping unrecognized MEDLINE line");
        }
    }

    if !current.is_empty() {
        records.push(current);
    }
    records
}
