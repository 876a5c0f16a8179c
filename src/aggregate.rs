//! Grouped distributions and cross-tabulations.
//!
//! Everything here is a pure function of the record sequence: no caches,
//! no interior state, identical input produces identical output. Category
//! and project orderings are sorted so repeated runs are byte-stable.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};

use crate::categorical::Status;
use crate::dataset::Dataset;
use crate::record::IssueRecord;
use crate::stats::StatsEngine;
use crate::types::{CategoryLabel, DatasetLabel, IssueId, ProjectName, Uid};

/// Categorical field selectable for aggregation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Project,
    Status,
    StackLayer,
    BugType,
    CtClass,
    CtSubtype,
}

impl Field {
    /// Column name used for this field in output tables.
    pub fn name(self) -> &'static str {
        match self {
            Field::Project => "project",
            Field::Status => "status",
            Field::StackLayer => "stacklayer",
            Field::BugType => "bugtype",
            Field::CtClass => "ctclass",
            Field::CtSubtype => "ctsubtype",
        }
    }

    /// Category value of `record` for this field.
    ///
    /// `None` excludes the record from the aggregate: out-of-taxonomy
    /// class values never enter classification counts.
    pub fn value<'r>(self, record: &'r IssueRecord) -> Option<&'r str> {
        match self {
            Field::Project => Some(record.project.as_str()),
            Field::Status => Some(match record.status {
                Status::Open => "open",
                Status::Closed => "closed",
                Status::Other => "other",
            }),
            Field::StackLayer => Some(record.stack_layer.as_str()),
            Field::BugType => Some(record.bug_type.as_str()),
            Field::CtClass => record
                .ct_class
                .is_valid()
                .then(|| record.ct_class.label()),
            Field::CtSubtype => Some(record.ct_subtype.label()),
        }
    }
}

/// One category row of a grouped distribution.
#[derive(Clone, Debug, PartialEq)]
pub struct DistributionRow {
    /// Group label; `None` for ungrouped distributions.
    pub project: Option<ProjectName>,
    pub category: CategoryLabel,
    pub count: usize,
    /// Unique issues in the group.
    pub total: usize,
    /// `count / total * 100`, one decimal place.
    pub percent: f64,
    /// Wilson interval lower bound in percent; NaN when unavailable.
    pub pct_ci_low: f64,
    /// Wilson interval upper bound in percent; NaN when unavailable.
    pub pct_ci_high: f64,
}

/// Round to one decimal place, the precision used in all percentage
/// outputs.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Ungrouped distribution of `field` across all records.
pub fn distribution(
    records: &[IssueRecord],
    field: Field,
    engine: &dyn StatsEngine,
    alpha: f64,
) -> Vec<DistributionRow> {
    distribution_rows(records, field, None, engine, alpha)
}

/// Per-project distributions concatenated in sorted project order.
pub fn distribution_by_project(
    records: &[IssueRecord],
    field: Field,
    engine: &dyn StatsEngine,
    alpha: f64,
) -> Vec<DistributionRow> {
    let mut rows = Vec::new();
    for project in sorted_projects(records) {
        let subset: Vec<IssueRecord> = records
            .iter()
            .filter(|record| record.project == project)
            .cloned()
            .collect();
        rows.extend(distribution_rows(
            &subset,
            field,
            Some(project),
            engine,
            alpha,
        ));
    }
    rows
}

fn distribution_rows(
    records: &[IssueRecord],
    field: Field,
    project: Option<ProjectName>,
    engine: &dyn StatsEngine,
    alpha: f64,
) -> Vec<DistributionRow> {
    let mut counts: BTreeMap<CategoryLabel, usize> = BTreeMap::new();
    let mut uids: HashSet<Uid> = HashSet::new();
    for record in records {
        if let Some(value) = field.value(record) {
            *counts.entry(value.to_string()).or_default() += 1;
            uids.insert(record.uid());
        }
    }
    let total = uids.len();
    counts
        .into_iter()
        .map(|(category, count)| {
            let percent = if total == 0 {
                f64::NAN
            } else {
                round1(count as f64 / total as f64 * 100.0)
            };
            let (ci_low, ci_high) = engine.wilson_interval(count, total, alpha);
            DistributionRow {
                project: project.clone(),
                category,
                count,
                total,
                percent,
                pct_ci_low: round1(ci_low),
                pct_ci_high: round1(ci_high),
            }
        })
        .collect()
}

/// A contingency table of two categorical fields.
///
/// Row/column label sets are sorted and shared between the counts and the
/// percentage view, so the two output tables always join positionally.
#[derive(Clone, Debug, PartialEq)]
pub struct CrossTab {
    /// Group label; `None` for ungrouped tables.
    pub project: Option<ProjectName>,
    pub row_field: Field,
    pub col_field: Field,
    pub row_labels: Vec<CategoryLabel>,
    pub col_labels: Vec<CategoryLabel>,
    /// `counts[row][col]` in label order.
    pub counts: Vec<Vec<usize>>,
}

impl CrossTab {
    /// Row-normalized percentages, one decimal place.
    ///
    /// A row with zero total yields `None` cells instead of a division
    /// fault.
    pub fn row_percentages(&self) -> Vec<Vec<Option<f64>>> {
        self.counts
            .iter()
            .map(|row| {
                let total: usize = row.iter().sum();
                row.iter()
                    .map(|&count| {
                        if total == 0 {
                            None
                        } else {
                            Some(round1(count as f64 / total as f64 * 100.0))
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Sum over every cell.
    pub fn grand_total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

/// Ungrouped contingency table of `row_field` x `col_field`.
///
/// Records missing either value (e.g. an invalid class) are excluded.
pub fn crosstab(records: &[IssueRecord], row_field: Field, col_field: Field) -> CrossTab {
    build_crosstab(records, row_field, col_field, None)
}

/// Independent per-project tables in sorted project order.
pub fn crosstab_by_project(
    records: &[IssueRecord],
    row_field: Field,
    col_field: Field,
) -> Vec<CrossTab> {
    sorted_projects(records)
        .into_iter()
        .map(|project| {
            let subset: Vec<IssueRecord> = records
                .iter()
                .filter(|record| record.project == project)
                .cloned()
                .collect();
            build_crosstab(&subset, row_field, col_field, Some(project))
        })
        .collect()
}

fn build_crosstab(
    records: &[IssueRecord],
    row_field: Field,
    col_field: Field,
    project: Option<ProjectName>,
) -> CrossTab {
    let mut pairs: Vec<(CategoryLabel, CategoryLabel)> = Vec::new();
    let mut row_set: BTreeSet<CategoryLabel> = BTreeSet::new();
    let mut col_set: BTreeSet<CategoryLabel> = BTreeSet::new();
    for record in records {
        if let (Some(row), Some(col)) = (row_field.value(record), col_field.value(record)) {
            row_set.insert(row.to_string());
            col_set.insert(col.to_string());
            pairs.push((row.to_string(), col.to_string()));
        }
    }
    let row_labels: Vec<CategoryLabel> = row_set.into_iter().collect();
    let col_labels: Vec<CategoryLabel> = col_set.into_iter().collect();
    let mut counts = vec![vec![0usize; col_labels.len()]; row_labels.len()];
    for (row, col) in pairs {
        let r = row_labels.iter().position(|l| *l == row);
        let c = col_labels.iter().position(|l| *l == col);
        if let (Some(r), Some(c)) = (r, c) {
            counts[r][c] += 1;
        }
    }
    CrossTab {
        project,
        row_field,
        col_field,
        row_labels,
        col_labels,
        counts,
    }
}

fn sorted_projects(records: &[IssueRecord]) -> Vec<ProjectName> {
    records
        .iter()
        .map(|record| record.project.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// One per-project row of the dataset overview table.
#[derive(Clone, Debug, PartialEq)]
pub struct OverviewRow {
    pub dataset: DatasetLabel,
    pub project: ProjectName,
    /// Distinct issue ids in the project group.
    pub n_issues: usize,
    /// Earliest parseable creation time in the group.
    pub start: Option<DateTime<Utc>>,
    /// Latest parseable creation time in the group.
    pub end: Option<DateTime<Utc>>,
    pub n_closed: usize,
    pub closed_pct: f64,
    pub n_open: usize,
    pub open_pct: f64,
}

/// Per-project issue counts, open/closed shares, and time span for one
/// prepared dataset. Empty datasets yield no rows.
pub fn overview(dataset: &Dataset) -> Vec<OverviewRow> {
    sorted_projects(&dataset.records)
        .into_iter()
        .map(|project| {
            let group: Vec<&IssueRecord> = dataset
                .records
                .iter()
                .filter(|record| record.project == project)
                .collect();
            let issues: HashSet<&IssueId> = group.iter().map(|r| &r.issue_id).collect();
            let n_issues = issues.len();
            let n_closed = group
                .iter()
                .filter(|r| r.status == Status::Closed)
                .count();
            let n_open = group.iter().filter(|r| r.status == Status::Open).count();
            let times: Vec<DateTime<Utc>> =
                group.iter().filter_map(|r| r.created_at).collect();
            let pct = |count: usize| {
                if n_issues == 0 {
                    f64::NAN
                } else {
                    round1(count as f64 / n_issues as f64 * 100.0)
                }
            };
            OverviewRow {
                dataset: dataset.label.clone(),
                project,
                n_issues,
                start: times.iter().min().copied(),
                end: times.iter().max().copied(),
                n_closed,
                closed_pct: pct(n_closed),
                n_open,
                open_pct: pct(n_open),
            }
        })
        .collect()
}
