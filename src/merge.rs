use std::collections::HashSet;

use tracing::{info, warn};

use crate::dataset::Dataset;
use crate::metrics::invalid_class_frequencies;
use crate::record::IssueRecord;
use crate::types::{DatasetLabel, Uid};

/// Unique-issue counts reported by every merge.
///
/// This is a diagnostic contract, not logging: callers use the counts to
/// sanity-check a run before trusting its outputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeCounts {
    /// Distinct issues per source, in merge order.
    pub per_source: Vec<(DatasetLabel, usize)>,
    /// Distinct `uid`s across the merged frame.
    pub total: usize,
}

/// The merged analysis frame.
#[derive(Clone, Debug)]
pub struct MergedDataset {
    /// Records from every source, per-source order preserved.
    pub records: Vec<IssueRecord>,
    /// Unique-issue counts per source and in total.
    pub counts: MergeCounts,
}

/// Union independently prepared datasets into one analysis frame.
///
/// Row order within each source is preserved; `uid` (`project#issue_id`)
/// keys the merged frame. Out-of-taxonomy class values are surfaced as a
/// warning with their frequencies; the records stay in the frame and are
/// excluded later by the classification aggregates.
pub fn merge(datasets: Vec<Dataset>) -> MergedDataset {
    let mut per_source = Vec::with_capacity(datasets.len());
    let mut records = Vec::new();
    for dataset in datasets {
        per_source.push((dataset.label.clone(), dataset.unique_issues()));
        records.extend(dataset.records);
    }
    let uids: HashSet<Uid> = records.iter().map(IssueRecord::uid).collect();
    let counts = MergeCounts {
        per_source,
        total: uids.len(),
    };

    for (label, n) in &counts.per_source {
        info!(source = %label, unique_issues = *n, "merged source");
    }
    info!(unique_issues = counts.total, "merged frame total");

    let invalid = invalid_class_frequencies(&records);
    if !invalid.is_empty() {
        let entries: Vec<(String, usize)> = invalid.into_iter().collect();
        warn!(
            value_frequencies = ?entries,
            "out-of-taxonomy class values present; excluded from classification aggregates"
        );
    }

    MergedDataset { records, counts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorical::{CtClass, CtSubtype, Status};

    fn build_record(project: &str, issue_id: &str) -> IssueRecord {
        IssueRecord {
            project: project.to_string(),
            issue_id: issue_id.to_string(),
            status: Status::Closed,
            created_at: None,
            stack_layer: "Runtime".to_string(),
            bug_type: "Memory".to_string(),
            ct_class: CtClass::A,
            ct_subtype: CtSubtype::Missing,
            gpu_relevant: true,
        }
    }

    fn dataset(label: &str, records: Vec<IssueRecord>) -> Dataset {
        Dataset {
            label: label.to_string(),
            records,
        }
    }

    #[test]
    fn merge_reports_per_source_and_total_counts() {
        let merged = merge(vec![
            dataset("A", vec![build_record("p1", "1"), build_record("p1", "2")]),
            dataset("B", vec![build_record("p2", "1")]),
        ]);
        assert_eq!(
            merged.counts.per_source,
            vec![("A".to_string(), 2), ("B".to_string(), 1)]
        );
        assert_eq!(merged.counts.total, 3);
        assert_eq!(merged.records.len(), 3);
    }

    #[test]
    fn uids_stay_unique_across_sources_with_shared_issue_ids() {
        let merged = merge(vec![
            dataset("A", vec![build_record("p1", "1")]),
            dataset("B", vec![build_record("p2", "1")]),
        ]);
        let uids: HashSet<Uid> = merged.records.iter().map(IssueRecord::uid).collect();
        assert_eq!(uids.len(), merged.records.len());
    }

    #[test]
    fn merge_preserves_per_source_row_order() {
        let merged = merge(vec![
            dataset("A", vec![build_record("p1", "2"), build_record("p1", "1")]),
            dataset("B", vec![build_record("p2", "9")]),
        ]);
        let ids: Vec<&str> = merged.records.iter().map(|r| r.issue_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "9"]);
    }
}
