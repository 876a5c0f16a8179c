//! Raw table model: header normalization, embedded-header removal, and
//! keep-last deduplication.
//!
//! Ownership model:
//! - `RawTable` owns the untyped rows read from one input file.
//! - Sanitizer passes consume and return the table; every pass is
//!   idempotent so re-running a pass on its own output is a no-op.
//! - Typed records are built elsewhere; raw rows never leave this module
//!   except through cell accessors.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::constants::columns;
use crate::errors::PipelineError;
use crate::types::{CanonicalHeader, CellValue, RawHeader};

/// Normalize a raw column header to its canonical form.
///
/// Removes byte-order marks, trims surrounding whitespace, lowercases, and
/// replaces internal spaces with underscores. Normalizing an
/// already-canonical header returns it unchanged.
pub fn normalize_header<T: AsRef<str>>(raw: T) -> CanonicalHeader {
    raw.as_ref()
        .replace('\u{feff}', "")
        .trim()
        .to_lowercase()
        .replace(' ', "_")
}

/// Identity key used for keep-last deduplication.
///
/// Which key applies is decided by the consuming analysis: per-source
/// counting dedupes on the issue id alone, cross-project tabulation on the
/// (project, issue id) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityKey {
    /// Dedupe on the `issueid` column alone.
    IssueId,
    /// Dedupe on the (`project`, `issueid`) pair.
    ProjectIssueId,
}

impl IdentityKey {
    /// Canonical column names this key is built from.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            IdentityKey::IssueId => &[columns::ISSUE_ID],
            IdentityKey::ProjectIssueId => &[columns::PROJECT, columns::ISSUE_ID],
        }
    }
}

/// One untyped input table: canonical headers plus opaque string rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<CanonicalHeader>,
    header_mapping: IndexMap<RawHeader, CanonicalHeader>,
    rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Build a table from raw headers and rows, normalizing every header.
    ///
    /// Two distinct raw headers normalizing to the same canonical name is a
    /// fatal error rather than a silently dropped column.
    pub fn new(
        raw_headers: Vec<RawHeader>,
        rows: Vec<Vec<CellValue>>,
    ) -> Result<Self, PipelineError> {
        let mut headers = Vec::with_capacity(raw_headers.len());
        let mut header_mapping = IndexMap::with_capacity(raw_headers.len());
        let mut seen: IndexMap<CanonicalHeader, Vec<RawHeader>> = IndexMap::new();
        for raw in raw_headers {
            let canonical = normalize_header(&raw);
            seen.entry(canonical.clone()).or_default().push(raw.clone());
            headers.push(canonical.clone());
            header_mapping.insert(raw, canonical);
        }
        for (canonical, raws) in seen {
            if raws.len() > 1 {
                return Err(PipelineError::HeaderCollision {
                    canonical,
                    raw: raws,
                });
            }
        }
        Ok(Self {
            headers,
            header_mapping,
            rows,
        })
    }

    /// Canonical headers in file order.
    pub fn headers(&self) -> &[CanonicalHeader] {
        &self.headers
    }

    /// Bijective raw-to-canonical header mapping for this table.
    pub fn header_mapping(&self) -> &IndexMap<RawHeader, CanonicalHeader> {
        &self.header_mapping
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table holds no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a canonical column, if present.
    pub fn column_index(&self, canonical: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == canonical)
    }

    /// First matching column among `candidates` (candidates are normalized
    /// before comparison).
    pub fn find_column(&self, candidates: &[&str]) -> Option<usize> {
        candidates
            .iter()
            .find_map(|candidate| self.column_index(&normalize_header(candidate)))
    }

    /// Cell value at (`row`, `col`); short rows read as absent.
    pub fn value(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col)).map(String::as_str)
    }

    /// Iterate row indices in file order.
    pub fn row_indices(&self) -> impl Iterator<Item = usize> {
        0..self.rows.len()
    }

    /// Distinct trimmed values of a column with their frequencies, most
    /// frequent first. Used for warning output when a filter empties a
    /// table.
    pub fn value_frequencies(&self, col: usize) -> IndexMap<CellValue, usize> {
        let mut counts: IndexMap<CellValue, usize> = IndexMap::new();
        for row in &self.rows {
            let value = row.get(col).map(|v| v.trim()).unwrap_or("");
            *counts.entry(value.to_string()).or_default() += 1;
        }
        counts.sort_by(|ka, va, kb, vb| vb.cmp(va).then_with(|| ka.cmp(kb)));
        counts
    }

    /// Drop rows that are a second header line concatenated into the data
    /// body: any row whose `issueid` value (trimmed, lowercased) equals the
    /// literal `issueid`, and likewise for a `project` column equal to
    /// `project`.
    pub fn without_embedded_headers(mut self) -> Self {
        for marker in [columns::ISSUE_ID, columns::PROJECT] {
            if let Some(col) = self.column_index(marker) {
                self.rows.retain(|row| {
                    row.get(col)
                        .map(|v| v.trim().to_lowercase() != marker)
                        .unwrap_or(true)
                });
            }
        }
        self
    }

    /// Keep only the last row per identity key, preserving the relative
    /// order of surviving rows.
    ///
    /// When any column of the identity key is absent the table passes
    /// through unchanged; not every table carries the identity key.
    pub fn deduped_keep_last(mut self, key: IdentityKey) -> Self {
        let mut key_cols = Vec::new();
        for column in key.columns() {
            match self.column_index(column) {
                Some(idx) => key_cols.push(idx),
                None => return self,
            }
        }
        let mut last_index: HashMap<Vec<CellValue>, usize> = HashMap::new();
        for (idx, row) in self.rows.iter().enumerate() {
            let row_key: Vec<CellValue> = key_cols
                .iter()
                .map(|&col| row.get(col).map(|v| v.trim()).unwrap_or("").to_string())
                .collect();
            last_index.insert(row_key, idx);
        }
        let mut idx = 0;
        self.rows.retain(|row| {
            let row_key: Vec<CellValue> = key_cols
                .iter()
                .map(|&col| row.get(col).map(|v| v.trim()).unwrap_or("").to_string())
                .collect();
            let keep = last_index.get(&row_key) == Some(&idx);
            idx += 1;
            keep
        });
        self
    }

    /// Retain only rows where `predicate` holds for the given column.
    pub fn filtered_by<F>(mut self, col: usize, predicate: F) -> Self
    where
        F: Fn(Option<&str>) -> bool,
    {
        self.rows
            .retain(|row| predicate(row.get(col).map(String::as_str)));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|v| v.to_string()).collect())
                .collect(),
        )
        .expect("table")
    }

    #[test]
    fn normalize_header_strips_bom_and_spaces() {
        assert_eq!(normalize_header("\u{feff}Issue ID "), "issue_id");
        assert_eq!(normalize_header("  StackLayer"), "stacklayer");
        assert_eq!(normalize_header("GPU Relevant"), "gpu_relevant");
    }

    #[test]
    fn normalize_header_is_idempotent() {
        for canonical in ["project", "issueid", "gpu_relevant", "b1/b2"] {
            assert_eq!(normalize_header(canonical), canonical);
        }
        let once = normalize_header("\u{feff} Created At ");
        assert_eq!(normalize_header(&once), once);
    }

    #[test]
    fn colliding_headers_are_a_fatal_error() {
        let err = RawTable::new(
            vec!["Issue ID".to_string(), "\u{feff}issue_id".to_string()],
            Vec::new(),
        )
        .expect_err("collision");
        match err {
            PipelineError::HeaderCollision { canonical, raw } => {
                assert_eq!(canonical, "issue_id");
                assert_eq!(raw.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn embedded_header_rows_are_removed_in_any_casing() {
        let cleaned = table(
            &["Project", "IssueID", "Status"],
            &[
                &["p1", "1", "open"],
                &["Project", "IssueID", "Status"],
                &["p1", " issueid ", "open"],
                &["p1", "2", "closed"],
            ],
        )
        .without_embedded_headers();
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned.value(0, 1), Some("1"));
        assert_eq!(cleaned.value(1, 1), Some("2"));
    }

    #[test]
    fn embedded_header_removal_is_idempotent() {
        let cleaned = table(
            &["project", "issueid"],
            &[&["p1", "1"], &["project", "issueid"]],
        )
        .without_embedded_headers();
        let again = cleaned.clone().without_embedded_headers();
        assert_eq!(cleaned, again);
    }

    #[test]
    fn dedupe_keeps_last_occurrence_and_preserves_order() {
        let deduped = table(
            &["issueid", "status"],
            &[
                &["5", "open"],
                &["7", "open"],
                &["5", "closed"],
            ],
        )
        .deduped_keep_last(IdentityKey::IssueId);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped.value(0, 0), Some("7"));
        assert_eq!(deduped.value(1, 0), Some("5"));
        assert_eq!(deduped.value(1, 1), Some("closed"));
    }

    #[test]
    fn dedupe_on_pair_key_separates_projects() {
        let deduped = table(
            &["project", "issueid"],
            &[&["p1", "1"], &["p2", "1"], &["p1", "1"]],
        )
        .deduped_keep_last(IdentityKey::ProjectIssueId);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped.value(0, 0), Some("p2"));
        assert_eq!(deduped.value(1, 0), Some("p1"));
    }

    #[test]
    fn dedupe_without_identity_column_is_a_noop() {
        let original = table(&["status"], &[&["open"], &["open"]]);
        let deduped = original.clone().deduped_keep_last(IdentityKey::IssueId);
        assert_eq!(original, deduped);
    }

    #[test]
    fn dedupe_is_idempotent() {
        let deduped = table(
            &["issueid"],
            &[&["1"], &["2"], &["1"], &["3"]],
        )
        .deduped_keep_last(IdentityKey::IssueId);
        let again = deduped.clone().deduped_keep_last(IdentityKey::IssueId);
        assert_eq!(deduped, again);
    }

    #[test]
    fn value_frequencies_sort_by_count_then_label() {
        let t = table(
            &["gpu_relevant"],
            &[&[""], &["maybe"], &[""], &["no"], &["maybe"], &[""]],
        );
        let freqs = t.value_frequencies(0);
        let entries: Vec<(&str, usize)> =
            freqs.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(entries, vec![("", 3), ("maybe", 2), ("no", 1)]);
    }

    #[test]
    fn find_column_matches_normalized_candidates() {
        let t = table(&["CT SubType", "project"], &[]);
        assert_eq!(t.find_column(&["ctsubtype", "ct_subtype"]), Some(0));
        assert_eq!(t.find_column(&["subclass", "b1/b2"]), None);
    }
}
