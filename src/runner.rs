//! Fixed analysis runs over the configured input sources.
//!
//! Each runner mirrors one published table set: the dataset overview, the
//! core category distributions, the cross-tabulations with their label
//! audit, and the association statistics. Runners own all file I/O;
//! everything below them is pure.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::aggregate::{
    crosstab, crosstab_by_project, distribution, distribution_by_project, overview, Field,
};
use crate::categorical::{CtClass, GpuRule};
use crate::config::{DatasetSpec, PipelineConfig, SourceConfig};
use crate::constants::outputs;
use crate::dataset::{prepare, Dataset};
use crate::errors::PipelineError;
use crate::merge::{merge, MergedDataset};
use crate::metrics::label_audit;
use crate::record::IssueRecord;
use crate::stats::{analyze_association, default_engine};
use crate::table::IdentityKey;
use crate::transport;

/// Install a fmt subscriber honoring `RUST_LOG`; safe to call repeatedly.
pub fn init_diagnostics() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn spec_for(source: &SourceConfig, identity: IdentityKey, rule: GpuRule) -> DatasetSpec {
    DatasetSpec {
        label: source.label.clone(),
        gpu_filter: source.gpu_filtered.then_some(rule),
        identity,
    }
}

fn load_datasets(
    config: &PipelineConfig,
    identity: IdentityKey,
    rule: GpuRule,
) -> Result<Vec<Dataset>, PipelineError> {
    config
        .sources
        .iter()
        .map(|source| {
            let table = transport::read_table(&source.path)?;
            prepare(&spec_for(source, identity, rule), table)
        })
        .collect()
}

fn load_merged(
    config: &PipelineConfig,
    identity: IdentityKey,
    rule: GpuRule,
) -> Result<MergedDataset, PipelineError> {
    Ok(merge(load_datasets(config, identity, rule)?))
}

/// Write the per-project dataset overview table.
///
/// Counting dedupes on the issue id alone and resolves GPU relevance with
/// the permissive synonym rule.
pub fn run_dataset_overview(config: &PipelineConfig) -> Result<PathBuf, PipelineError> {
    let datasets = load_datasets(config, IdentityKey::IssueId, GpuRule::Synonyms)?;
    let mut rows = Vec::new();
    for dataset in &datasets {
        info!(
            dataset = %dataset.label,
            unique_issues = dataset.unique_issues(),
            "prepared source"
        );
        rows.extend(overview(dataset));
    }
    let path = config.output_dir.join(outputs::DATASET_OVERVIEW);
    transport::write_overview(&path, &rows)?;
    Ok(path)
}

/// Write the core category distribution tables (overall and by project).
///
/// Tabulation dedupes on the issue id and accepts only the strict `X`
/// GPU marking.
pub fn run_core_distributions(config: &PipelineConfig) -> Result<Vec<PathBuf>, PipelineError> {
    let merged = load_merged(config, IdentityKey::IssueId, GpuRule::StrictX)?;
    let engine = default_engine();
    let alpha = config.stats.alpha;
    let mut written = Vec::new();

    let analyses = [
        (Field::CtClass, outputs::PREFIX_CT_CLASS),
        (Field::StackLayer, outputs::PREFIX_STACK_LAYER),
        (Field::BugType, outputs::PREFIX_BUG_TYPE),
    ];
    for (field, prefix) in analyses {
        written.push(write_distribution_pair(
            &config.output_dir,
            prefix,
            field,
            &merged.records,
            alpha,
        )?);
    }

    let b_records: Vec<IssueRecord> = merged
        .records
        .iter()
        .filter(|record| record.ct_class == CtClass::B)
        .cloned()
        .collect();
    if b_records.is_empty() {
        warn!("no class-B issues; subtype distributions skipped");
    } else {
        written.push(write_distribution_pair(
            &config.output_dir,
            outputs::PREFIX_B_SUBTYPE,
            Field::CtSubtype,
            &b_records,
            alpha,
        )?);
    }

    if !engine.is_available() {
        info!("interval estimation unavailable; interval columns are NaN");
    }
    Ok(written.into_iter().flatten().collect())
}

fn write_distribution_pair(
    output_dir: &Path,
    prefix: &str,
    field: Field,
    records: &[IssueRecord],
    alpha: f64,
) -> Result<Vec<PathBuf>, PipelineError> {
    let engine = default_engine();
    let overall_path = output_dir.join(format!("{prefix}{}", outputs::SUFFIX_OVERALL));
    let by_project_path = output_dir.join(format!("{prefix}{}", outputs::SUFFIX_BY_PROJECT));
    transport::write_distribution(
        &overall_path,
        field.name(),
        &distribution(records, field, engine, alpha),
        false,
    )?;
    transport::write_distribution(
        &by_project_path,
        field.name(),
        &distribution_by_project(records, field, engine, alpha),
        true,
    )?;
    Ok(vec![overall_path, by_project_path])
}

/// Write the cross-tabulation pairs and the unique-label audit.
///
/// Tabulation dedupes on the (project, issue id) pair and accepts only
/// the strict `X` GPU marking.
pub fn run_cross_tabs(config: &PipelineConfig) -> Result<Vec<PathBuf>, PipelineError> {
    let merged = load_merged(config, IdentityKey::ProjectIssueId, GpuRule::StrictX)?;
    let mut written = Vec::new();

    let paired = [
        (Field::StackLayer, outputs::PREFIX_LAYER_X_CLASS),
        (Field::BugType, outputs::PREFIX_BUGTYPE_X_CLASS),
    ];
    for (row_field, prefix) in paired {
        let overall_counts = config
            .output_dir
            .join(format!("{prefix}{}", outputs::SUFFIX_OVERALL_COUNTS));
        let overall_pct = config
            .output_dir
            .join(format!("{prefix}{}", outputs::SUFFIX_OVERALL_PCT));
        transport::write_crosstab_pair(
            &overall_counts,
            &overall_pct,
            &[crosstab(&merged.records, row_field, Field::CtClass)],
        )?;
        written.extend([overall_counts, overall_pct]);

        let project_counts = config
            .output_dir
            .join(format!("{prefix}{}", outputs::SUFFIX_BY_PROJECT_COUNTS));
        let project_pct = config
            .output_dir
            .join(format!("{prefix}{}", outputs::SUFFIX_BY_PROJECT_PCT));
        transport::write_crosstab_pair(
            &project_counts,
            &project_pct,
            &crosstab_by_project(&merged.records, row_field, Field::CtClass),
        )?;
        written.extend([project_counts, project_pct]);
    }

    let project_counts = config.output_dir.join(format!(
        "{}{}",
        outputs::PREFIX_PROJECT_X_CLASS,
        outputs::SUFFIX_OVERALL_COUNTS
    ));
    let project_pct = config.output_dir.join(format!(
        "{}{}",
        outputs::PREFIX_PROJECT_X_CLASS,
        outputs::SUFFIX_OVERALL_PCT
    ));
    transport::write_crosstab_pair(
        &project_counts,
        &project_pct,
        &[crosstab(&merged.records, Field::Project, Field::CtClass)],
    )?;
    written.extend([project_counts, project_pct]);

    let audit_path = config.output_dir.join(outputs::AUDIT_UNIQUE_LABELS);
    transport::write_audit(&audit_path, &label_audit(&merged.records))?;
    written.push(audit_path);
    Ok(written)
}

/// Write the association statistics table.
///
/// Uses the same preparation policy as the cross-tabs; invalid class
/// records are excluded per test by the field accessors.
pub fn run_effect_sizes(config: &PipelineConfig) -> Result<PathBuf, PipelineError> {
    let merged = load_merged(config, IdentityKey::ProjectIssueId, GpuRule::StrictX)?;
    let engine = default_engine();
    let rows = vec![
        analyze_association(
            &merged.records,
            Field::Project,
            Field::CtClass,
            "Project x CTClass",
            &config.stats,
            engine,
        ),
        analyze_association(
            &merged.records,
            Field::StackLayer,
            Field::CtClass,
            "StackLayer x CTClass",
            &config.stats,
            engine,
        ),
        analyze_association(
            &merged.records,
            Field::BugType,
            Field::CtClass,
            "BugType x CTClass",
            &config.stats,
            engine,
        ),
    ];
    if !engine.is_available() {
        info!("asymptotic tests unavailable; permutation p-values were computed instead");
    }
    let path = config.output_dir.join(outputs::EFFECT_SIZES);
    transport::write_associations(&path, &rows)?;
    Ok(path)
}

/// Run every analysis and return the written paths.
pub fn run_all(config: &PipelineConfig) -> Result<Vec<PathBuf>, PipelineError> {
    let mut written = vec![run_dataset_overview(config)?];
    written.extend(run_core_distributions(config)?);
    written.extend(run_cross_tabs(config)?);
    written.push(run_effect_sizes(config)?);
    Ok(written)
}
