use std::collections::HashSet;

use indexmap::IndexMap;

use crate::categorical::CtClass;
use crate::constants::merge::AUDIT_OVERALL_LABEL;
use crate::record::IssueRecord;
use crate::types::{CategoryLabel, ProjectName, Uid};

/// Distinct-label audit row, overall or for one project.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelAudit {
    pub project: ProjectName,
    pub n_unique_stacklayer: usize,
    pub n_unique_bugtype: usize,
    pub n_issues: usize,
}

/// Audit distinct stack-layer/bug-type labels and unique issue counts.
///
/// The first row is the overall audit (labelled `OVERALL`), followed by
/// one row per project in sorted order.
pub fn label_audit(records: &[IssueRecord]) -> Vec<LabelAudit> {
    let mut rows = vec![audit_rows(records, AUDIT_OVERALL_LABEL)];
    let mut projects: Vec<&ProjectName> = records
        .iter()
        .map(|record| &record.project)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    projects.sort();
    for project in projects {
        let subset: Vec<IssueRecord> = records
            .iter()
            .filter(|record| &record.project == project)
            .cloned()
            .collect();
        rows.push(audit_rows(&subset, project));
    }
    rows
}

fn audit_rows(records: &[IssueRecord], project: &str) -> LabelAudit {
    let layers: HashSet<&CategoryLabel> = records.iter().map(|r| &r.stack_layer).collect();
    let bugs: HashSet<&CategoryLabel> = records.iter().map(|r| &r.bug_type).collect();
    let uids: HashSet<Uid> = records.iter().map(IssueRecord::uid).collect();
    LabelAudit {
        project: project.to_string(),
        n_unique_stacklayer: layers.len(),
        n_unique_bugtype: bugs.len(),
        n_issues: uids.len(),
    }
}

/// Frequencies of out-of-taxonomy class values, most frequent first.
///
/// Empty when every record carries a valid class; callers use this for the
/// warned-but-non-fatal diagnostic when invalid records are excluded.
pub fn invalid_class_frequencies(records: &[IssueRecord]) -> IndexMap<String, usize> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for record in records {
        if let CtClass::Invalid(raw) = &record.ct_class {
            *counts.entry(raw.clone()).or_default() += 1;
        }
    }
    counts.sort_by(|ka, va, kb, vb| vb.cmp(va).then_with(|| ka.cmp(kb)));
    counts
}
