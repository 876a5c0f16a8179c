use std::path::Path;

use chrono::SecondsFormat;
use csv::{ReaderBuilder, Writer};

use crate::aggregate::{CrossTab, DistributionRow, OverviewRow};
use crate::errors::PipelineError;
use crate::metrics::LabelAudit;
use crate::stats::AssociationRow;
use crate::table::RawTable;
use crate::types::{CategoryLabel, RawHeader};

/// Read one delimited input table.
///
/// Rows are tolerated at any length (short rows read as absent cells) and
/// every value stays opaque text. Byte-order marks survive into the raw
/// headers and are removed by header normalization.
pub fn read_table(path: &Path) -> Result<RawTable, PipelineError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<RawHeader> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    RawTable::new(headers, rows)
}

/// Present-but-unavailable numeric fields are written as `NaN` so the
/// output schema stays stable; absent cells are written empty.
fn fmt_fixed(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{value:.decimals$}")
    }
}

fn fmt_stat(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{value}")
    }
}

fn fmt_time(value: Option<chrono::DateTime<chrono::Utc>>) -> String {
    value
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// Write a grouped distribution table.
///
/// Column order: identifying columns first (`project` when grouped, then
/// the category), then `count`, `total`, `percent`, then the interval
/// bounds.
pub fn write_distribution(
    path: &Path,
    category_column: &str,
    rows: &[DistributionRow],
    by_project: bool,
) -> Result<(), PipelineError> {
    let mut writer = Writer::from_path(path)?;
    let mut header = Vec::new();
    if by_project {
        header.push("project");
    }
    header.extend([category_column, "count", "total", "percent", "pct_ci_low", "pct_ci_high"]);
    writer.write_record(&header)?;
    for row in rows {
        let mut record = Vec::new();
        if by_project {
            record.push(row.project.clone().unwrap_or_default());
        }
        record.push(row.category.clone());
        record.push(row.count.to_string());
        record.push(row.total.to_string());
        record.push(fmt_fixed(row.percent, 1));
        record.push(fmt_fixed(row.pct_ci_low, 1));
        record.push(fmt_fixed(row.pct_ci_high, 1));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a matched counts/percentages cross-tab pair.
///
/// The two files share identical row and column label layouts so the
/// consumer can join them positionally. Columns are the sorted union of
/// every table's labels; a label absent from one table's columns writes
/// as an empty cell, as does a zero-total percentage row.
pub fn write_crosstab_pair(
    counts_path: &Path,
    pct_path: &Path,
    tables: &[CrossTab],
) -> Result<(), PipelineError> {
    let by_project = tables.iter().any(|t| t.project.is_some());
    let mut union: Vec<CategoryLabel> = tables
        .iter()
        .flat_map(|t| t.col_labels.iter().cloned())
        .collect();
    union.sort();
    union.dedup();

    let mut counts_writer = Writer::from_path(counts_path)?;
    let mut pct_writer = Writer::from_path(pct_path)?;
    let row_name = tables
        .first()
        .map(|t| t.row_field.name())
        .unwrap_or("category");
    let mut header: Vec<String> = Vec::new();
    if by_project {
        header.push("project".to_string());
    }
    header.push(row_name.to_string());
    header.extend(union.iter().cloned());
    counts_writer.write_record(&header)?;
    pct_writer.write_record(&header)?;

    for table in tables {
        let percentages = table.row_percentages();
        for (r, row_label) in table.row_labels.iter().enumerate() {
            let mut counts_record: Vec<String> = Vec::new();
            let mut pct_record: Vec<String> = Vec::new();
            if by_project {
                let project = table.project.clone().unwrap_or_default();
                counts_record.push(project.clone());
                pct_record.push(project);
            }
            counts_record.push(row_label.clone());
            pct_record.push(row_label.clone());
            for label in &union {
                match table.col_labels.iter().position(|l| l == label) {
                    Some(c) => {
                        counts_record.push(table.counts[r][c].to_string());
                        pct_record.push(
                            percentages[r][c]
                                .map(|p| format!("{p:.1}"))
                                .unwrap_or_default(),
                        );
                    }
                    None => {
                        counts_record.push(String::new());
                        pct_record.push(String::new());
                    }
                }
            }
            counts_writer.write_record(&counts_record)?;
            pct_writer.write_record(&pct_record)?;
        }
    }
    counts_writer.flush()?;
    pct_writer.flush()?;
    Ok(())
}

/// Write the per-project dataset overview table.
pub fn write_overview(path: &Path, rows: &[OverviewRow]) -> Result<(), PipelineError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record([
        "dataset",
        "project",
        "n_issues",
        "start",
        "end",
        "n_closed",
        "closed_pct",
        "n_open",
        "open_pct",
    ])?;
    for row in rows {
        writer.write_record([
            row.dataset.clone(),
            row.project.clone(),
            row.n_issues.to_string(),
            fmt_time(row.start),
            fmt_time(row.end),
            row.n_closed.to_string(),
            fmt_fixed(row.closed_pct, 1),
            row.n_open.to_string(),
            fmt_fixed(row.open_pct, 1),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the unique-label audit table.
pub fn write_audit(path: &Path, rows: &[LabelAudit]) -> Result<(), PipelineError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["project", "n_unique_stacklayer", "n_unique_bugtype", "n_issues"])?;
    for row in rows {
        writer.write_record([
            row.project.clone(),
            row.n_unique_stacklayer.to_string(),
            row.n_unique_bugtype.to_string(),
            row.n_issues.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the association statistics table.
pub fn write_associations(path: &Path, rows: &[AssociationRow]) -> Result<(), PipelineError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record([
        "test",
        "row_var",
        "col_var",
        "n_used_uid",
        "shape_rxc",
        "chi2",
        "dof",
        "p_chi2",
        "p_perm",
        "p_fisher_2x2",
        "cramers_v",
        "min_expected",
    ])?;
    for row in rows {
        writer.write_record([
            row.test.clone(),
            row.row_var.to_string(),
            row.col_var.to_string(),
            row.n_used_uid.to_string(),
            row.shape_rxc.clone(),
            fmt_stat(row.chi2),
            row.dof.to_string(),
            fmt_stat(row.p_chi2),
            fmt_stat(row.p_perm),
            fmt_stat(row.p_fisher_2x2),
            fmt_stat(row.cramers_v),
            fmt_stat(row.min_expected),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Field;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn read_table_keeps_cells_opaque_and_handles_bom() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("input.csv");
        fs::write(
            &path,
            "\u{feff}Project,Issue ID,CTClass\np1,1,a\np1,2,\n",
        )
        .expect("write");
        let table = read_table(&path).expect("read");
        assert_eq!(table.headers(), ["project", "issue_id", "ctclass"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, 2), Some("a"));
        assert_eq!(table.value(1, 2), Some(""));
    }

    #[test]
    fn read_table_tolerates_short_rows() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("input.csv");
        fs::write(&path, "a,b,c\n1,2\n").expect("write");
        let table = read_table(&path).expect("read");
        assert_eq!(table.value(0, 2), None);
    }

    #[test]
    fn distribution_writer_orders_identifying_columns_first() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("dist.csv");
        let rows = vec![DistributionRow {
            project: Some("p1".to_string()),
            category: "A".to_string(),
            count: 2,
            total: 10,
            percent: 20.0,
            pct_ci_low: f64::NAN,
            pct_ci_high: f64::NAN,
        }];
        write_distribution(&path, "ctclass", &rows, true).expect("write");
        let written = fs::read_to_string(&path).expect("read");
        let mut lines = written.lines();
        assert_eq!(
            lines.next(),
            Some("project,ctclass,count,total,percent,pct_ci_low,pct_ci_high")
        );
        assert_eq!(lines.next(), Some("p1,A,2,10,20.0,NaN,NaN"));
    }

    #[test]
    fn crosstab_pair_shares_layout_and_pads_missing_columns() {
        let temp = tempdir().expect("tempdir");
        let counts_path = temp.path().join("counts.csv");
        let pct_path = temp.path().join("pct.csv");
        let tables = vec![
            CrossTab {
                project: Some("p1".to_string()),
                row_field: Field::StackLayer,
                col_field: Field::CtClass,
                row_labels: vec!["Runtime".to_string()],
                col_labels: vec!["A".to_string()],
                counts: vec![vec![3]],
            },
            CrossTab {
                project: Some("p2".to_string()),
                row_field: Field::StackLayer,
                col_field: Field::CtClass,
                row_labels: vec!["Compiler".to_string()],
                col_labels: vec!["B".to_string()],
                counts: vec![vec![1]],
            },
        ];
        write_crosstab_pair(&counts_path, &pct_path, &tables).expect("write");

        let counts = fs::read_to_string(&counts_path).expect("read");
        let pct = fs::read_to_string(&pct_path).expect("read");
        let counts_lines: Vec<&str> = counts.lines().collect();
        let pct_lines: Vec<&str> = pct.lines().collect();
        assert_eq!(counts_lines[0], "project,stacklayer,A,B");
        assert_eq!(pct_lines[0], counts_lines[0]);
        assert_eq!(counts_lines[1], "p1,Runtime,3,");
        assert_eq!(pct_lines[1], "p1,Runtime,100.0,");
        assert_eq!(counts_lines[2], "p2,Compiler,,1");
        assert_eq!(pct_lines[2], "p2,Compiler,,100.0");
    }
}
