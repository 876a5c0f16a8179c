use std::path::PathBuf;

use crate::categorical::GpuRule;
use crate::table::IdentityKey;
use crate::types::DatasetLabel;

/// Settings for significance testing and interval estimation.
#[derive(Clone, Copy, Debug)]
pub struct StatsConfig {
    /// Number of label reshuffles in the permutation test. Runs are
    /// sequential so a fixed seed produces a fixed result.
    pub n_permutations: usize,
    /// RNG seed controlling the permutation order.
    pub seed: u64,
    /// Two-sided significance level for confidence intervals.
    pub alpha: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            n_permutations: crate::constants::stats::DEFAULT_PERMUTATIONS,
            seed: crate::constants::stats::DEFAULT_SEED,
            alpha: crate::constants::stats::DEFAULT_ALPHA,
        }
    }
}

/// One input table and how it participates in the merged analysis frame.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// Label used in diagnostics and the overview table.
    pub label: DatasetLabel,
    /// Path to the delimited input file.
    pub path: PathBuf,
    /// Whether this source is restricted to GPU-relevant rows.
    ///
    /// The resolution rule (synonym table vs. strict `X`) is chosen by
    /// each analysis, not here; see `runner`.
    pub gpu_filtered: bool,
}

/// Preparation policy for one dataset within a specific analysis.
#[derive(Clone, Debug)]
pub struct DatasetSpec {
    /// Diagnostic label.
    pub label: DatasetLabel,
    /// GPU filter rule, when this dataset is restricted to relevant rows.
    pub gpu_filter: Option<GpuRule>,
    /// Identity key for keep-last deduplication.
    pub identity: IdentityKey,
}

/// Top-level pipeline configuration.
///
/// Replaces fixed module-level paths and magic constants: callers build
/// one of these (or take the defaults) and pass it into the runners.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Input sources in merge order.
    pub sources: Vec<SourceConfig>,
    /// Significance-test settings.
    pub stats: StatsConfig,
    /// Directory the output tables are written into.
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                SourceConfig {
                    label: "CUDA-Q".to_string(),
                    path: PathBuf::from("./Cuda-Q/cudaq_issues_raw.csv"),
                    gpu_filtered: false,
                },
                SourceConfig {
                    label: "Qiskit (GPU)".to_string(),
                    path: PathBuf::from("./qskit/github_issues.csv"),
                    gpu_filtered: true,
                },
            ],
            stats: StatsConfig::default(),
            output_dir: PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_settings() {
        let config = PipelineConfig::default();
        assert_eq!(config.sources.len(), 2);
        assert!(!config.sources[0].gpu_filtered);
        assert!(config.sources[1].gpu_filtered);
        assert_eq!(config.stats.n_permutations, 5000);
        assert_eq!(config.stats.seed, 0);
        assert!((config.stats.alpha - 0.05).abs() < 1e-12);
    }
}
