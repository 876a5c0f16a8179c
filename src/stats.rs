//! Contingency statistics over the aggregated frame.
//!
//! Ownership model:
//! - Pure table math (expected counts, chi-square statistic, Cramér's V,
//!   permutation test) is always available and deterministic.
//! - Asymptotic p-values, Fisher exact tests, and Wilson intervals need a
//!   distribution library and sit behind the `stats` feature. The
//!   `StatsEngine` capability is selected once via `default_engine`;
//!   call sites never branch on availability themselves.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::aggregate::{crosstab, CrossTab, Field};
use crate::config::StatsConfig;
use crate::constants::stats::MIN_EXPECTED_THRESHOLD;
use crate::record::IssueRecord;
use crate::types::Uid;

/// Capability interface for dependency-gated statistics.
///
/// Implementations must be stateless; the engine is chosen once at
/// startup and shared by every call site.
pub trait StatsEngine: Send + Sync {
    /// True when asymptotic tests and intervals can be computed.
    fn is_available(&self) -> bool;
    /// Upper-tail chi-square p-value, NaN when unavailable.
    fn chi_square_pvalue(&self, chi2: f64, dof: usize) -> f64;
    /// Two-sided Fisher exact p-value for a 2x2 table, NaN when
    /// unavailable.
    fn fisher_exact_2x2(&self, table: [[u64; 2]; 2]) -> f64;
    /// Wilson score interval bounds in percent (continuity-uncorrected);
    /// `(NaN, NaN)` when unavailable or `total` is zero.
    fn wilson_interval(&self, count: usize, total: usize, alpha: f64) -> (f64, f64);
}

/// Engine used when no distribution library is compiled in: every
/// asymptotic quantity is NaN and callers fall back to permutation tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableEngine;

impl StatsEngine for UnavailableEngine {
    fn is_available(&self) -> bool {
        false
    }

    fn chi_square_pvalue(&self, _chi2: f64, _dof: usize) -> f64 {
        f64::NAN
    }

    fn fisher_exact_2x2(&self, _table: [[u64; 2]; 2]) -> f64 {
        f64::NAN
    }

    fn wilson_interval(&self, _count: usize, _total: usize, _alpha: f64) -> (f64, f64) {
        (f64::NAN, f64::NAN)
    }
}

/// Distribution-library-backed engine.
#[cfg(feature = "stats")]
#[derive(Clone, Copy, Debug, Default)]
pub struct AsymptoticEngine;

#[cfg(feature = "stats")]
impl StatsEngine for AsymptoticEngine {
    fn is_available(&self) -> bool {
        true
    }

    fn chi_square_pvalue(&self, chi2: f64, dof: usize) -> f64 {
        use statrs::distribution::{ChiSquared, ContinuousCDF};
        if dof == 0 || !chi2.is_finite() {
            return f64::NAN;
        }
        match ChiSquared::new(dof as f64) {
            Ok(dist) => 1.0 - dist.cdf(chi2),
            Err(_) => f64::NAN,
        }
    }

    fn fisher_exact_2x2(&self, table: [[u64; 2]; 2]) -> f64 {
        use statrs::distribution::{Discrete, Hypergeometric};
        let [[a, b], [c, d]] = table;
        let population = a + b + c + d;
        let successes = a + b;
        let draws = a + c;
        if population == 0 {
            return f64::NAN;
        }
        let dist = match Hypergeometric::new(population, successes, draws) {
            Ok(dist) => dist,
            Err(_) => return f64::NAN,
        };
        let lo = draws.saturating_sub(population - successes);
        let hi = draws.min(successes);
        let observed = dist.pmf(a);
        // Two-sided: sum the probability of every table at most as likely
        // as the observed one (with a small tolerance for ties).
        let cutoff = observed * (1.0 + 1e-7);
        (lo..=hi)
            .map(|k| dist.pmf(k))
            .filter(|p| *p <= cutoff)
            .sum()
    }

    fn wilson_interval(&self, count: usize, total: usize, alpha: f64) -> (f64, f64) {
        use statrs::distribution::{ContinuousCDF, Normal};
        if total == 0 {
            return (f64::NAN, f64::NAN);
        }
        let normal = match Normal::new(0.0, 1.0) {
            Ok(normal) => normal,
            Err(_) => return (f64::NAN, f64::NAN),
        };
        let z = normal.inverse_cdf(1.0 - alpha / 2.0);
        let n = total as f64;
        let p = count as f64 / n;
        let denom = 1.0 + z * z / n;
        let center = (p + z * z / (2.0 * n)) / denom;
        let half = z * (p * (1.0 - p) / n + z * z / (4.0 * n * n)).sqrt() / denom;
        ((center - half) * 100.0, (center + half) * 100.0)
    }
}

/// Engine selected by compiled capabilities, chosen once at startup.
#[cfg(feature = "stats")]
pub fn default_engine() -> &'static dyn StatsEngine {
    &AsymptoticEngine
}

/// Engine selected by compiled capabilities, chosen once at startup.
#[cfg(not(feature = "stats"))]
pub fn default_engine() -> &'static dyn StatsEngine {
    &UnavailableEngine
}

/// Expected cell counts under independence: `row_sum * col_sum / n`.
pub fn expected_counts(counts: &[Vec<usize>]) -> Vec<Vec<f64>> {
    let n: usize = counts.iter().flatten().sum();
    let rows = counts.len();
    let cols = counts.first().map(Vec::len).unwrap_or(0);
    if n == 0 {
        return vec![vec![0.0; cols]; rows];
    }
    let row_sums: Vec<usize> = counts.iter().map(|row| row.iter().sum()).collect();
    let mut col_sums = vec![0usize; cols];
    for row in counts {
        for (c, &count) in row.iter().enumerate() {
            col_sums[c] += count;
        }
    }
    (0..rows)
        .map(|r| {
            (0..cols)
                .map(|c| row_sums[r] as f64 * col_sums[c] as f64 / n as f64)
                .collect()
        })
        .collect()
}

/// Chi-square statistic; cells with zero expectation are skipped.
pub fn chi_square_stat(counts: &[Vec<usize>], expected: &[Vec<f64>]) -> f64 {
    let mut stat = 0.0;
    for (row, exp_row) in counts.iter().zip(expected) {
        for (&count, &exp) in row.iter().zip(exp_row) {
            if exp > 0.0 {
                let diff = count as f64 - exp;
                stat += diff * diff / exp;
            }
        }
    }
    stat
}

/// Cramér's V effect size; NaN when `n` is zero or the table is
/// degenerate (`min(r, c) <= 1`).
pub fn cramers_v(chi2: f64, n: usize, rows: usize, cols: usize) -> f64 {
    let k = rows.min(cols);
    if n == 0 || k <= 1 {
        return f64::NAN;
    }
    (chi2 / (n as f64 * (k - 1) as f64)).sqrt()
}

/// Permutation test for independence of two label sequences.
///
/// Reshuffles `ys` against `xs` a fixed number of times with a seeded RNG
/// and counts chi-square statistics at least as large as the observed one:
/// `p = (count_ge + 1) / (n_permutations + 1)`. Sequential by design so a
/// fixed seed produces a fixed result.
pub fn permutation_pvalue(
    xs: &[&str],
    ys: &[&str],
    n_permutations: usize,
    seed: u64,
) -> f64 {
    let observed = contingency_from_pairs(xs, ys);
    let expected = expected_counts(&observed);
    let chi2_observed = chi_square_stat(&observed, &expected);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut shuffled: Vec<&str> = ys.to_vec();
    let mut count_ge = 0usize;
    for _ in 0..n_permutations {
        shuffled.shuffle(&mut rng);
        let table = contingency_from_pairs(xs, &shuffled);
        let expected = expected_counts(&table);
        if chi_square_stat(&table, &expected) >= chi2_observed {
            count_ge += 1;
        }
    }
    (count_ge + 1) as f64 / (n_permutations + 1) as f64
}

fn contingency_from_pairs(xs: &[&str], ys: &[&str]) -> Vec<Vec<usize>> {
    use std::collections::BTreeMap;
    let mut row_index: BTreeMap<&str, usize> = BTreeMap::new();
    let mut col_index: BTreeMap<&str, usize> = BTreeMap::new();
    for &x in xs {
        let next = row_index.len();
        row_index.entry(x).or_insert(next);
    }
    for &y in ys {
        let next = col_index.len();
        col_index.entry(y).or_insert(next);
    }
    let mut counts = vec![vec![0usize; col_index.len()]; row_index.len()];
    for (&x, &y) in xs.iter().zip(ys) {
        counts[row_index[x]][col_index[y]] += 1;
    }
    counts
}

/// One association-test result row.
#[derive(Clone, Debug, PartialEq)]
pub struct AssociationRow {
    /// Human-readable test name, e.g. `StackLayer x CTClass`.
    pub test: String,
    pub row_var: &'static str,
    pub col_var: &'static str,
    /// Unique issues entering the table after dropping blank values.
    pub n_used_uid: usize,
    /// Table shape as `r x c`.
    pub shape_rxc: String,
    pub chi2: f64,
    pub dof: usize,
    /// Asymptotic p-value; NaN when the engine is unavailable.
    pub p_chi2: f64,
    /// Permutation p-value; NaN when the asymptotic test sufficed.
    pub p_perm: f64,
    /// Fisher exact p-value; NaN unless the table is 2x2 and the engine
    /// is available.
    pub p_fisher_2x2: f64,
    pub cramers_v: f64,
    pub min_expected: f64,
}

/// Run the association analysis for `row_field` x `col_field`.
///
/// Records with a blank or excluded value on either side are dropped
/// first. The permutation test runs when the asymptotic engine is
/// unavailable or the smallest expected cell count is below the
/// small-sample threshold.
pub fn analyze_association(
    records: &[IssueRecord],
    row_field: Field,
    col_field: Field,
    name: &str,
    config: &StatsConfig,
    engine: &dyn StatsEngine,
) -> AssociationRow {
    let mut xs: Vec<&str> = Vec::new();
    let mut ys: Vec<&str> = Vec::new();
    let mut used: Vec<IssueRecord> = Vec::new();
    for record in records {
        match (row_field.value(record), col_field.value(record)) {
            (Some(x), Some(y)) if !x.is_empty() && !y.is_empty() => {
                xs.push(x);
                ys.push(y);
                used.push(record.clone());
            }
            _ => {}
        }
    }
    let n_used_uid = {
        use std::collections::HashSet;
        let uids: HashSet<Uid> = used.iter().map(IssueRecord::uid).collect();
        uids.len()
    };

    let table: CrossTab = crosstab(&used, row_field, col_field);
    let rows = table.row_labels.len();
    let cols = table.col_labels.len();
    let n = table.grand_total();

    let expected = expected_counts(&table.counts);
    let min_expected = expected
        .iter()
        .flatten()
        .copied()
        .fold(f64::NAN, f64::min);
    let chi2 = chi_square_stat(&table.counts, &expected);
    let dof = rows.saturating_sub(1) * cols.saturating_sub(1);

    let p_chi2 = if engine.is_available() && n > 0 && rows > 1 && cols > 1 {
        engine.chi_square_pvalue(chi2, dof)
    } else {
        f64::NAN
    };

    let p_fisher_2x2 = if rows == 2 && cols == 2 {
        engine.fisher_exact_2x2([
            [table.counts[0][0] as u64, table.counts[0][1] as u64],
            [table.counts[1][0] as u64, table.counts[1][1] as u64],
        ])
    } else {
        f64::NAN
    };

    let p_perm = if !engine.is_available() || min_expected < MIN_EXPECTED_THRESHOLD {
        permutation_pvalue(&xs, &ys, config.n_permutations, config.seed)
    } else {
        f64::NAN
    };

    AssociationRow {
        test: name.to_string(),
        row_var: row_field.name(),
        col_var: col_field.name(),
        n_used_uid,
        shape_rxc: format!("{rows}x{cols}"),
        chi2: round_to(chi2, 4),
        dof,
        p_chi2: round_to(p_chi2, 6),
        p_perm: round_to(p_perm, 6),
        p_fisher_2x2: round_to(p_fisher_2x2, 6),
        cramers_v: round_to(cramers_v(chi2, n, rows, cols), 4),
        min_expected: round_to(min_expected, 4),
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorical::{CtClass, CtSubtype, Status};

    fn build_record(project: &str, issue_id: &str, layer: &str, class: &str) -> IssueRecord {
        IssueRecord {
            project: project.to_string(),
            issue_id: issue_id.to_string(),
            status: Status::Open,
            created_at: None,
            stack_layer: layer.to_string(),
            bug_type: "Memory".to_string(),
            ct_class: CtClass::parse(class),
            ct_subtype: CtSubtype::Missing,
            gpu_relevant: true,
        }
    }

    #[test]
    fn expected_counts_follow_marginals() {
        let counts = vec![vec![10, 10], vec![10, 10]];
        let expected = expected_counts(&counts);
        for row in &expected {
            for &cell in row {
                assert!((cell - 10.0).abs() < 1e-12);
            }
        }
        let empty = expected_counts(&[vec![0, 0]]);
        assert_eq!(empty, vec![vec![0.0, 0.0]]);
    }

    #[test]
    fn chi_square_is_zero_under_perfect_independence() {
        let counts = vec![vec![10, 10], vec![10, 10]];
        let expected = expected_counts(&counts);
        assert!(chi_square_stat(&counts, &expected).abs() < 1e-12);
    }

    #[test]
    fn chi_square_matches_hand_computed_table() {
        // [[20, 10], [10, 20]]: marginals 30/30, expected 15 in each cell,
        // chi2 = 4 * 25 / 15 = 6.6667.
        let counts = vec![vec![20, 10], vec![10, 20]];
        let expected = expected_counts(&counts);
        let chi2 = chi_square_stat(&counts, &expected);
        assert!((chi2 - 20.0 / 3.0).abs() < 1e-9, "chi2 = {chi2}");
    }

    #[test]
    fn cramers_v_handles_degenerate_tables() {
        assert!(cramers_v(1.0, 0, 2, 2).is_nan());
        assert!(cramers_v(1.0, 10, 1, 5).is_nan());
        let v = cramers_v(20.0 / 3.0, 60, 2, 2);
        assert!((v - (20.0 / 180.0f64).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn permutation_test_is_deterministic_for_a_fixed_seed() {
        let xs = vec!["a", "a", "b", "b", "a", "b", "a", "b"];
        let ys = vec!["x", "x", "y", "y", "x", "y", "y", "x"];
        let p1 = permutation_pvalue(&xs, &ys, 500, 7);
        let p2 = permutation_pvalue(&xs, &ys, 500, 7);
        assert_eq!(p1, p2);
        assert!(p1 > 0.0 && p1 <= 1.0);
    }

    #[test]
    fn permutation_test_flags_a_perfect_association() {
        let xs: Vec<&str> = std::iter::repeat("a")
            .take(12)
            .chain(std::iter::repeat("b").take(12))
            .collect();
        let ys: Vec<&str> = std::iter::repeat("x")
            .take(12)
            .chain(std::iter::repeat("y").take(12))
            .collect();
        let p = permutation_pvalue(&xs, &ys, 2000, 0);
        assert!(p < 0.01, "p = {p}");
    }

    #[test]
    fn unavailable_engine_returns_nan_everywhere() {
        let engine = UnavailableEngine;
        assert!(!engine.is_available());
        assert!(engine.chi_square_pvalue(3.84, 1).is_nan());
        assert!(engine.fisher_exact_2x2([[3, 1], [1, 3]]).is_nan());
        let (low, high) = engine.wilson_interval(5, 10, 0.05);
        assert!(low.is_nan() && high.is_nan());
    }

    #[cfg(feature = "stats")]
    #[test]
    fn chi_square_pvalue_matches_reference_points() {
        let engine = AsymptoticEngine;
        let p = engine.chi_square_pvalue(3.841, 1);
        assert!((p - 0.05).abs() < 1e-3, "p = {p}");
        assert!(engine.chi_square_pvalue(0.0, 1) > 0.999);
        assert!(engine.chi_square_pvalue(1.0, 0).is_nan());
    }

    #[cfg(feature = "stats")]
    #[test]
    fn fisher_exact_matches_hand_computed_table() {
        // Hypergeometric over [[3,1],[1,3]]: two-sided p = 34/70.
        let engine = AsymptoticEngine;
        let p = engine.fisher_exact_2x2([[3, 1], [1, 3]]);
        assert!((p - 34.0 / 70.0).abs() < 1e-9, "p = {p}");
    }

    #[cfg(feature = "stats")]
    #[test]
    fn wilson_interval_matches_reference_value() {
        let engine = AsymptoticEngine;
        let (low, high) = engine.wilson_interval(5, 10, 0.05);
        assert!((low - 23.66).abs() < 0.05, "low = {low}");
        assert!((high - 76.34).abs() < 0.05, "high = {high}");
        let (nan_low, nan_high) = engine.wilson_interval(0, 0, 0.05);
        assert!(nan_low.is_nan() && nan_high.is_nan());
    }

    #[test]
    fn association_drops_blank_values_and_reports_shape() {
        let mut records = vec![
            build_record("p1", "1", "Runtime", "A"),
            build_record("p1", "2", "Runtime", "B"),
            build_record("p2", "3", "Compiler", "A"),
            build_record("p2", "4", "Compiler", "B"),
        ];
        records.push(build_record("p2", "5", "", "A"));
        records.push(build_record("p2", "6", "Compiler", "?"));

        let row = analyze_association(
            &records,
            Field::StackLayer,
            Field::CtClass,
            "StackLayer x CTClass",
            &StatsConfig {
                n_permutations: 200,
                seed: 0,
                alpha: 0.05,
            },
            default_engine(),
        );
        assert_eq!(row.n_used_uid, 4);
        assert_eq!(row.shape_rxc, "2x2");
        assert_eq!(row.row_var, "stacklayer");
        assert_eq!(row.col_var, "ctclass");
        // Expected counts are all 1 here, so the permutation p-value runs
        // regardless of the compiled engine.
        assert!(row.p_perm > 0.0 && row.p_perm <= 1.0);
    }
}
