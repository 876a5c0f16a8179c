//! Per-source dataset preparation.
//!
//! Raw tables stop here: after validation this module hands out typed
//! `IssueRecord`s only. The stage order matches the cleaning contract:
//! embedded-header removal, schema validation, GPU filtering, keep-last
//! deduplication, then record construction.

use std::collections::HashSet;

use tracing::warn;

use crate::categorical::{parse_created_at, CtClass, CtSubtype, GpuRule, Status};
use crate::config::DatasetSpec;
use crate::constants::{columns, merge};
use crate::errors::PipelineError;
use crate::record::IssueRecord;
use crate::table::RawTable;
use crate::types::{DatasetLabel, Uid};

/// One prepared source: typed records plus its diagnostic counts.
#[derive(Clone, Debug)]
pub struct Dataset {
    /// Diagnostic label from the preparation policy.
    pub label: DatasetLabel,
    /// Records in surviving file order.
    pub records: Vec<IssueRecord>,
}

impl Dataset {
    /// Distinct `project#issue_id` keys in this dataset.
    pub fn unique_issues(&self) -> usize {
        let uids: HashSet<Uid> = self.records.iter().map(IssueRecord::uid).collect();
        uids.len()
    }
}

/// Clean, validate, filter, deduplicate, and type one input table.
///
/// Missing required columns are fatal; the error names every missing
/// column and the available set. A GPU filter that empties the table is
/// surfaced as a warning with raw value frequencies, not an error.
pub fn prepare(spec: &DatasetSpec, table: RawTable) -> Result<Dataset, PipelineError> {
    let table = table.without_embedded_headers();

    let mut required: Vec<&str> = columns::REQUIRED_BASE.to_vec();
    if spec.gpu_filter.is_some() {
        required.push(columns::GPU_RELEVANT);
    }
    let missing: Vec<String> = required
        .iter()
        .filter(|column| table.column_index(column).is_none())
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns {
            dataset: spec.label.clone(),
            missing,
            available: table.headers().to_vec(),
        });
    }

    let table = match (spec.gpu_filter, table.column_index(columns::GPU_RELEVANT)) {
        (Some(rule), Some(col)) => {
            let before = table.len();
            let frequencies = table.value_frequencies(col);
            let filtered = table.filtered_by(col, |value| rule.is_relevant(value));
            if filtered.is_empty() && before > 0 {
                let top: Vec<(String, usize)> = frequencies
                    .into_iter()
                    .take(merge::EMPTY_FILTER_TOP_VALUES)
                    .collect();
                warn!(
                    dataset = %spec.label,
                    ?rule,
                    raw_value_frequencies = ?top,
                    "GPU-relevance filter removed every row"
                );
            }
            filtered
        }
        _ => table,
    };

    let table = table.deduped_keep_last(spec.identity);

    Ok(Dataset {
        label: spec.label.clone(),
        records: build_records(spec, &table),
    })
}

fn build_records(spec: &DatasetSpec, table: &RawTable) -> Vec<IssueRecord> {
    let project_col = table.column_index(columns::PROJECT);
    let issue_col = table.column_index(columns::ISSUE_ID);
    let status_col = table.column_index(columns::STATUS);
    let created_col = table.column_index(columns::CREATED_AT);
    let layer_col = table.column_index(columns::STACK_LAYER);
    let bug_col = table.column_index(columns::BUG_TYPE);
    let class_col = table.column_index(columns::CT_CLASS);
    let gpu_col = table.column_index(columns::GPU_RELEVANT);
    let subtype_col = table.find_column(&columns::SUBTYPE_ALIASES);
    if subtype_col.is_none() {
        warn!(
            dataset = %spec.label,
            "no subtype column found; B-subtype values default to Missing"
        );
    }

    table
        .row_indices()
        .map(|row| {
            let ct_class = CtClass::parse(cell(table, row, class_col));
            let ct_subtype = if ct_class == CtClass::B {
                CtSubtype::parse(subtype_col.and_then(|c| table.value(row, c)))
            } else {
                CtSubtype::Missing
            };
            let gpu_relevant = match gpu_col {
                // A table without the flag is conceptually all-relevant.
                None => true,
                Some(c) => {
                    let rule = spec.gpu_filter.unwrap_or(GpuRule::Synonyms);
                    rule.is_relevant(table.value(row, c))
                }
            };
            IssueRecord {
                project: cell(table, row, project_col).trim().to_string(),
                issue_id: cell(table, row, issue_col).trim().to_string(),
                status: Status::parse(cell(table, row, status_col)),
                created_at: parse_created_at(cell(table, row, created_col)),
                stack_layer: cell(table, row, layer_col).trim().to_string(),
                bug_type: cell(table, row, bug_col).trim().to_string(),
                ct_class,
                ct_subtype,
                gpu_relevant,
            }
        })
        .collect()
}

fn cell<'t>(table: &'t RawTable, row: usize, col: Option<usize>) -> &'t str {
    col.and_then(|c| table.value(row, c)).unwrap_or("")
}
