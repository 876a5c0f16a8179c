#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Grouped distributions, cross-tabulations, and the dataset overview.
pub mod aggregate;
/// Categorical parsing with explicit fallback policies.
pub mod categorical;
/// Pipeline configuration with documented defaults.
pub mod config;
/// Canonical column names, synonym tables, and output file names.
pub mod constants;
/// Per-source dataset preparation.
pub mod dataset;
/// Cross-project merging and its diagnostic counts.
pub mod merge;
/// Label audits and value-frequency diagnostics.
pub mod metrics;
/// Typed issue records.
pub mod record;
/// Fixed analysis runs writing the published tables.
pub mod runner;
/// Contingency statistics and the capability-gated engine.
pub mod stats;
/// Raw table model: header normalization and sanitization.
pub mod table;
/// File transports for input tables and output reports.
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;

pub use aggregate::{
    crosstab, crosstab_by_project, distribution, distribution_by_project, overview, CrossTab,
    DistributionRow, Field, OverviewRow,
};
pub use categorical::{parse_created_at, CtClass, CtSubtype, GpuRule, Status};
pub use config::{DatasetSpec, PipelineConfig, SourceConfig, StatsConfig};
pub use dataset::{prepare, Dataset};
pub use errors::PipelineError;
pub use merge::{merge, MergeCounts, MergedDataset};
pub use metrics::{invalid_class_frequencies, label_audit, LabelAudit};
pub use record::IssueRecord;
pub use stats::{
    analyze_association, chi_square_stat, cramers_v, default_engine, expected_counts,
    permutation_pvalue, AssociationRow, StatsEngine, UnavailableEngine,
};
pub use table::{normalize_header, IdentityKey, RawTable};
pub use types::{
    CanonicalHeader, CategoryLabel, CellValue, DatasetLabel, IssueId, ProjectName, RawHeader, Uid,
};
