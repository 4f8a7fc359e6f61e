//! # Paired Comparative Statistics
//!
//! Tests comparing two aligned per-team vectors (general rate vs. a timeout
//! horizon). Every test returns a `(statistic, p-value)` pair and fails
//! loudly on mismatched or too-short input instead of producing NaN.
//!
//! - `paired_t_test` - Student t on the differences, two-sided
//! - `wilcoxon_signed_rank` - zero differences dropped, min(W+, W-);
//!   exact p for n <= 50 without ties, normal approximation otherwise
//! - `pearson` / `spearman` - correlation with a two-sided t-based p-value

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use thiserror::Error;

/// Largest sample the exact Wilcoxon distribution is computed for.
pub const WILCOXON_EXACT_MAX_N: usize = 50;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("paired samples differ in length: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("{test} needs at least {required} samples, got {found}")]
    InsufficientSamples {
        test: &'static str,
        required: usize,
        found: usize,
    },

    #[error("{test} is undefined for constant input")]
    ConstantInput { test: &'static str },

    #[error("input contains a non-finite value")]
    NonFinite,

    #[error("distribution error: {0}")]
    Distribution(String),
}

/// Result of one test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestOutcome {
    pub statistic: f64,
    pub p_value: f64,
}

/// The four comparisons run per horizon, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatTest {
    PairedT,
    Wilcoxon,
    Pearson,
    Spearman,
}

impl StatTest {
    pub const ALL: [StatTest; 4] = [
        StatTest::PairedT,
        StatTest::Wilcoxon,
        StatTest::Pearson,
        StatTest::Spearman,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StatTest::PairedT => "Paired t-test",
            StatTest::Wilcoxon => "Wilcoxon",
            StatTest::Pearson => "Pearson",
            StatTest::Spearman => "Spearman",
        }
    }

    pub fn run(&self, a: &[f64], b: &[f64]) -> Result<TestOutcome, StatsError> {
        match self {
            StatTest::PairedT => paired_t_test(a, b),
            StatTest::Wilcoxon => wilcoxon_signed_rank(a, b),
            StatTest::Pearson => pearson(a, b),
            StatTest::Spearman => spearman(a, b),
        }
    }
}

fn check_pair(test: &'static str, a: &[f64], b: &[f64], required: usize) -> Result<(), StatsError> {
    if a.len() != b.len() {
        return Err(StatsError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    if a.iter().chain(b).any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite);
    }
    if a.len() < required {
        return Err(StatsError::InsufficientSamples {
            test,
            required,
            found: a.len(),
        });
    }
    Ok(())
}

/// Two-sided tail probability of Student's t with `df` degrees of freedom.
fn t_two_sided(t: f64, df: f64) -> Result<f64, StatsError> {
    let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| StatsError::Distribution(e.to_string()))?;
    Ok((2.0 * dist.sf(t.abs())).min(1.0))
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Paired t-test on `a - b`.
///
/// Zero variance of the differences resolves to `(0, 1)` when the mean
/// difference is zero and to `(±inf, 0)` otherwise.
pub fn paired_t_test(a: &[f64], b: &[f64]) -> Result<TestOutcome, StatsError> {
    check_pair("Paired t-test", a, b, 2)?;

    let diffs: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    let n = diffs.len() as f64;
    let m = mean(&diffs);
    let var = diffs.iter().map(|d| (d - m).powi(2)).sum::<f64>() / (n - 1.0);

    if var == 0.0 {
        return Ok(if m == 0.0 {
            TestOutcome {
                statistic: 0.0,
                p_value: 1.0,
            }
        } else {
            TestOutcome {
                statistic: m.signum() * f64::INFINITY,
                p_value: 0.0,
            }
        });
    }

    let t = m / (var / n).sqrt();
    Ok(TestOutcome {
        statistic: t,
        p_value: t_two_sided(t, n - 1.0)?,
    })
}

/// Average ranks (1-based) plus the sizes of the tie groups.
fn average_ranks(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    let mut ranks = vec![0.0; values.len()];
    let mut ties = Vec::new();
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && values[order[j]] == values[order[i]] {
            j += 1;
        }
        let avg = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = avg;
        }
        if j - i > 1 {
            ties.push(j - i);
        }
        i = j;
    }
    (ranks, ties)
}

/// Wilcoxon signed-rank test on `a - b`.
pub fn wilcoxon_signed_rank(a: &[f64], b: &[f64]) -> Result<TestOutcome, StatsError> {
    check_pair("Wilcoxon", a, b, 1)?;

    let diffs: Vec<f64> = a
        .iter()
        .zip(b)
        .map(|(x, y)| x - y)
        .filter(|d| *d != 0.0)
        .collect();
    if diffs.is_empty() {
        return Err(StatsError::InsufficientSamples {
            test: "Wilcoxon",
            required: 1,
            found: 0,
        });
    }

    let magnitudes: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
    let (ranks, ties) = average_ranks(&magnitudes);
    let w_plus: f64 = diffs
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();
    let w_minus: f64 = diffs
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d < 0.0)
        .map(|(_, r)| r)
        .sum();
    let statistic = w_plus.min(w_minus);
    let n = diffs.len();

    let p_value = if n <= WILCOXON_EXACT_MAX_N && ties.is_empty() {
        wilcoxon_exact_p(n, statistic)
    } else {
        let nf = n as f64;
        let expected = nf * (nf + 1.0) / 4.0;
        let tie_term: f64 = ties.iter().map(|&t| (t.pow(3) - t) as f64).sum::<f64>() / 48.0;
        let var = nf * (nf + 1.0) * (2.0 * nf + 1.0) / 24.0 - tie_term;
        if var <= 0.0 {
            1.0
        } else {
            let z = (statistic - expected) / var.sqrt();
            let normal =
                Normal::new(0.0, 1.0).map_err(|e| StatsError::Distribution(e.to_string()))?;
            (2.0 * normal.cdf(-z.abs())).min(1.0)
        }
    };

    Ok(TestOutcome { statistic, p_value })
}

/// Exact two-sided p-value: `2 * P(W <= statistic)` under the null, where W
/// is the sum of a random subset of the ranks `1..=n`.
fn wilcoxon_exact_p(n: usize, statistic: f64) -> f64 {
    let max_sum = n * (n + 1) / 2;
    let mut counts = vec![0.0f64; max_sum + 1];
    counts[0] = 1.0;
    for rank in 1..=n {
        for s in (rank..=max_sum).rev() {
            counts[s] += counts[s - rank];
        }
    }

    let total = 2f64.powi(n as i32);
    let limit = statistic.floor() as usize;
    let lower: f64 = counts.iter().take(limit.min(max_sum) + 1).sum();
    (2.0 * lower / total).min(1.0)
}

fn correlation(test: &'static str, x: &[f64], y: &[f64]) -> Result<TestOutcome, StatsError> {
    let mx = mean(x);
    let my = mean(y);
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return Err(StatsError::ConstantInput { test });
    }

    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let df = x.len() as f64 - 2.0;
    let p_value = if r.abs() == 1.0 {
        0.0
    } else {
        let t = r * (df / (1.0 - r * r)).sqrt();
        t_two_sided(t, df)?
    };

    Ok(TestOutcome {
        statistic: r,
        p_value,
    })
}

/// Pearson product-moment correlation.
pub fn pearson(a: &[f64], b: &[f64]) -> Result<TestOutcome, StatsError> {
    check_pair("Pearson", a, b, 3)?;
    correlation("Pearson", a, b)
}

/// Spearman rank correlation (Pearson over average ranks).
pub fn spearman(a: &[f64], b: &[f64]) -> Result<TestOutcome, StatsError> {
    check_pair("Spearman", a, b, 3)?;
    let (ra, _) = average_ranks(a);
    let (rb, _) = average_ranks(b);
    correlation("Spearman", &ra, &rb)
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    // no "-0" in the tables
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
