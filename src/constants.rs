/// Constants used by column normalization and schema validation.
pub mod columns {
    /// Canonical project column.
    pub const PROJECT: &str = "project";
    /// Canonical issue identifier column.
    pub const ISSUE_ID: &str = "issueid";
    /// Canonical issue status column (optional in most tables).
    pub const STATUS: &str = "status";
    /// Canonical creation timestamp column (optional).
    pub const CREATED_AT: &str = "createdat";
    /// Canonical stack layer column.
    pub const STACK_LAYER: &str = "stacklayer";
    /// Canonical bug type column.
    pub const BUG_TYPE: &str = "bugtype";
    /// Canonical taxonomy class column.
    pub const CT_CLASS: &str = "ctclass";
    /// Canonical GPU relevance flag column.
    pub const GPU_RELEVANT: &str = "gpu_relevant";

    /// Columns every prepared dataset must expose.
    pub const REQUIRED_BASE: [&str; 5] = [PROJECT, ISSUE_ID, STACK_LAYER, BUG_TYPE, CT_CLASS];

    /// Header spellings accepted for the taxonomy subtype column.
    pub const SUBTYPE_ALIASES: [&str; 5] = ["ctsubtype", "ct_subtype", "subclass", "subtype", "b1/b2"];
}

/// Constants used by boolean GPU-relevance resolution.
pub mod gpu {
    /// Values resolved to `true` under the permissive synonym rule.
    pub const TRUE_SYNONYMS: [&str; 7] = ["true", "1", "yes", "y", "x", "gpu", "g"];
    /// Values resolved to `false` under the permissive synonym rule.
    ///
    /// Everything outside both sets also resolves to `false` (fail-closed).
    pub const FALSE_SYNONYMS: [&str; 5] = ["false", "0", "no", "n", ""];
    /// The only marker accepted by the strict rule, compared after trim + uppercase.
    pub const STRICT_MARKER: &str = "X";
}

/// Constants used by taxonomy classification.
pub mod taxonomy {
    /// Valid top-level class labels.
    pub const VALID_CLASSES: [&str; 3] = ["A", "B", "C"];
    /// Subtype prefix for configuration/metadata constraint violations.
    pub const SUBTYPE_B1_PREFIX: &str = "B1";
    /// Subtype prefix for contract/typestate violations.
    pub const SUBTYPE_B2_PREFIX: &str = "B2";
    /// Label assigned when a subtype is absent or unrecognized.
    pub const SUBTYPE_MISSING: &str = "Missing";
}

/// Constants used by merging and diagnostics.
pub mod merge {
    /// Separator between project and issue id in the global key.
    pub const UID_SEPARATOR: &str = "#";
    /// Project label used for the overall row of the label audit.
    pub const AUDIT_OVERALL_LABEL: &str = "OVERALL";
    /// Number of distinct raw values shown when a filter empties a dataset.
    pub const EMPTY_FILTER_TOP_VALUES: usize = 20;
}

/// Default settings for significance testing and interval estimation.
pub mod stats {
    /// Permutation count for the independence test.
    pub const DEFAULT_PERMUTATIONS: usize = 5000;
    /// RNG seed for the permutation test.
    pub const DEFAULT_SEED: u64 = 0;
    /// Two-sided significance level for confidence intervals.
    pub const DEFAULT_ALPHA: f64 = 0.05;
    /// Expected-count threshold below which the permutation test also runs.
    pub const MIN_EXPECTED_THRESHOLD: f64 = 5.0;
}

/// Fixed output file names written by the analysis runners.
pub mod outputs {
    /// Per-project dataset overview table.
    pub const DATASET_OVERVIEW: &str = "table1_dataset_overview.csv";
    /// Distribution output prefix for the taxonomy class.
    pub const PREFIX_CT_CLASS: &str = "c_ctclass";
    /// Distribution output prefix for the stack layer.
    pub const PREFIX_STACK_LAYER: &str = "c_stacklayer";
    /// Distribution output prefix for the bug type.
    pub const PREFIX_BUG_TYPE: &str = "c_bugtype";
    /// Distribution output prefix for the B-subtype breakdown.
    pub const PREFIX_B_SUBTYPE: &str = "c_b_subtype";
    /// Cross-tab output prefix for stack layer x class.
    pub const PREFIX_LAYER_X_CLASS: &str = "d_layer_x_ctclass";
    /// Cross-tab output prefix for bug type x class.
    pub const PREFIX_BUGTYPE_X_CLASS: &str = "d_bugtype_x_ctclass";
    /// Cross-tab output prefix for project x class.
    pub const PREFIX_PROJECT_X_CLASS: &str = "d_project_x_ctclass";
    /// Unique-label audit table.
    pub const AUDIT_UNIQUE_LABELS: &str = "d_audit_unique_labels.csv";
    /// Association statistics table.
    pub const EFFECT_SIZES: &str = "e_effect_sizes.csv";

    /// Suffix for ungrouped distribution tables.
    pub const SUFFIX_OVERALL: &str = "_overall.csv";
    /// Suffix for per-project distribution tables.
    pub const SUFFIX_BY_PROJECT: &str = "_by_project.csv";
    /// Suffix for ungrouped cross-tab count tables.
    pub const SUFFIX_OVERALL_COUNTS: &str = "_overall_counts.csv";
    /// Suffix for ungrouped cross-tab percentage tables.
    pub const SUFFIX_OVERALL_PCT: &str = "_overall_pct.csv";
    /// Suffix for per-project cross-tab count tables.
    pub const SUFFIX_BY_PROJECT_COUNTS: &str = "_by_project_counts.csv";
    /// Suffix for per-project cross-tab percentage tables.
    pub const SUFFIX_BY_PROJECT_PCT: &str = "_by_project_pct.csv";
}
