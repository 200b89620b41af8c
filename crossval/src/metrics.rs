//! Element-wise comparison metrics
//!
//! - **Exact**: bit-for-bit equality (`==`), used for scalar vs scalar.
//! - **Within ε**: `|a - b| <= ε · max(1, |a|, |b|)`, relative for large
//!   magnitudes and absolute near zero. Used whenever a vectorized kernel or
//!   the oracle is involved.
//!
//! Non-finite values compare equal only when both sides are the same
//! infinity, or both are NaN.

use crate::{CrossvalError, Result};
use serde::{Deserialize, Serialize};

/// Outcome of comparing two output buffers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub passed: bool,
    pub max_abs_diff: f32,
    pub max_rel_diff: f32,
    /// Index of the largest relative deviation, `None` for empty buffers.
    pub worst_index: Option<usize>,
    pub len: usize,
}

/// Largest `|a[i] - b[i]|`.
pub fn max_abs(a: &[f32], b: &[f32]) -> Result<f32> {
    check_len(a, b)?;
    Ok(a.iter().zip(b).map(|(&x, &y)| abs_diff(x, y)).fold(0.0f32, f32::max))
}

/// Largest `|a[i] - b[i]| / max(1, |a[i]|, |b[i]|)`.
pub fn max_rel(a: &[f32], b: &[f32]) -> Result<f32> {
    check_len(a, b)?;
    Ok(a.iter().zip(b).map(|(&x, &y)| rel_diff(x, y)).fold(0.0f32, f32::max))
}

/// Every element must be identical.
pub fn compare_exact(a: &[f32], b: &[f32]) -> Result<Comparison> {
    compare(a, b, |x, y| x == y || (x.is_nan() && y.is_nan()))
}

/// Every element must satisfy `|a - b| <= eps · max(1, |a|, |b|)`.
pub fn compare_within(a: &[f32], b: &[f32], eps: f32) -> Result<Comparison> {
    if !(eps.is_finite() && eps >= 0.0) {
        return Err(CrossvalError::InvalidConfig(format!("tolerance must be >= 0, got {eps}")));
    }
    compare(a, b, |x, y| {
        if x.is_nan() || y.is_nan() {
            return x.is_nan() && y.is_nan();
        }
        if x.is_infinite() || y.is_infinite() {
            return x == y;
        }
        (x - y).abs() <= eps * 1.0f32.max(x.abs()).max(y.abs())
    })
}

fn compare(a: &[f32], b: &[f32], ok: impl Fn(f32, f32) -> bool) -> Result<Comparison> {
    check_len(a, b)?;

    let mut passed = true;
    let mut max_abs_diff = 0.0f32;
    let mut max_rel_diff = 0.0f32;
    let mut worst_index = None;

    for (i, (&x, &y)) in a.iter().zip(b).enumerate() {
        passed &= ok(x, y);

        let rel = rel_diff(x, y);
        max_abs_diff = max_abs_diff.max(abs_diff(x, y));
        if worst_index.is_none() || rel > max_rel_diff {
            max_rel_diff = rel;
            worst_index = Some(i);
        }
    }

    Ok(Comparison { passed, max_abs_diff, max_rel_diff, worst_index, len: a.len() })
}

fn check_len(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(CrossvalError::ComparisonError(format!(
            "length mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

// Matching non-finite pairs count as zero deviation; mismatched ones as infinite.
fn abs_diff(x: f32, y: f32) -> f32 {
    if x == y || (x.is_nan() && y.is_nan()) {
        0.0
    } else {
        let d = (x - y).abs();
        if d.is_nan() { f32::INFINITY } else { d }
    }
}

fn rel_diff(x: f32, y: f32) -> f32 {
    let d = abs_diff(x, y);
    if d == 0.0 || d.is_infinite() { d } else { d / 1.0f32.max(x.abs()).max(y.abs()) }
}
