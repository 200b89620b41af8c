//! Scalar reference kernels
//!
//! Plain sequential loops with no alignment requirement. Each output element
//! is seeded with its bias and then accumulates the products strictly left to
//! right; this order defines the reference rounding that the SIMD kernels and
//! the BLAS oracle are compared against.

use crate::MatvecKernel;
use crate::validation::check_buffers;
use matvec_common::{KernelOutcome, Result, Traversal};

/// Scalar kernel that works on any architecture and any shape.
///
/// Always available. The SIMD providers delegate to it whenever their
/// alignment precondition fails.
pub struct FallbackKernel;

impl MatvecKernel for FallbackKernel {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn matvec(
        &self,
        matrix: &[f32],
        vec_mul: &[f32],
        vec_add: &[f32],
        res: &mut [f32],
        rows: usize,
        cols: usize,
    ) -> Result<KernelOutcome> {
        scalar_matvec(matrix, vec_mul, vec_add, res, rows, cols)?;
        Ok(KernelOutcome::Computed)
    }

    fn matvec_t(
        &self,
        matrix: &[f32],
        vec_mul: &[f32],
        vec_add: &[f32],
        res: &mut [f32],
        rows: usize,
        cols: usize,
    ) -> Result<KernelOutcome> {
        scalar_matvec_t(matrix, vec_mul, vec_add, res, rows, cols)?;
        Ok(KernelOutcome::Computed)
    }
}

/// `res[i] = vec_add[i] + Σ_{j<cols} vec_mul[j] * matrix[i*cols + j]` for `i < rows`.
pub fn scalar_matvec(
    matrix: &[f32],
    vec_mul: &[f32],
    vec_add: &[f32],
    res: &mut [f32],
    rows: usize,
    cols: usize,
) -> Result<()> {
    check_buffers(matrix, vec_mul, vec_add, res, rows, cols, Traversal::RowMajor)?;
    matvec_rows(matrix, vec_mul, vec_add, res, cols);
    Ok(())
}

/// `res[i] = vec_add[i] + Σ_{j<rows} vec_mul[j] * matrix[j*cols + i]` for `i < cols`.
pub fn scalar_matvec_t(
    matrix: &[f32],
    vec_mul: &[f32],
    vec_add: &[f32],
    res: &mut [f32],
    rows: usize,
    cols: usize,
) -> Result<()> {
    check_buffers(matrix, vec_mul, vec_add, res, rows, cols, Traversal::Transposed)?;
    matvec_cols(matrix, vec_mul, vec_add, res, rows, cols);
    Ok(())
}

/// Row-major reduction on pre-validated buffers.
pub(crate) fn matvec_rows(
    matrix: &[f32],
    vec_mul: &[f32],
    vec_add: &[f32],
    res: &mut [f32],
    cols: usize,
) {
    if cols == 0 {
        res.copy_from_slice(vec_add);
        return;
    }

    for ((out, &bias), row) in res.iter_mut().zip(vec_add).zip(matrix.chunks_exact(cols)) {
        let mut acc = bias;
        for (&x, &m) in vec_mul.iter().zip(row) {
            acc += x * m;
        }
        *out = acc;
    }
}

/// Column reduction on pre-validated buffers.
pub(crate) fn matvec_cols(
    matrix: &[f32],
    vec_mul: &[f32],
    vec_add: &[f32],
    res: &mut [f32],
    rows: usize,
    cols: usize,
) {
    for (i, (out, &bias)) in res.iter_mut().zip(vec_add).enumerate() {
        let mut acc = bias;
        for (j, &x) in vec_mul.iter().enumerate().take(rows) {
            acc += x * matrix[j * cols + i];
        }
        *out = acc;
    }
}
