//! x86_64 kernels using AVX2 and FMA
#![allow(unsafe_op_in_unsafe_fn)]

use crate::MatvecKernel;
use crate::cpu::fallback::{matvec_cols, matvec_rows};
use crate::validation::check_buffers;
use matvec_common::warn_once::fallback_notice;
use matvec_common::{KernelOutcome, MatvecShape, Result, SIMD_WIDTH, Traversal};
use std::arch::x86_64::*;

/// AVX2 + FMA kernel for x86_64.
///
/// Works on groups of eight contiguous `f32` lanes held in one 256-bit
/// register. Requires `rows % 8 == 0 && cols % 8 == 0`; any other shape, or a
/// CPU without AVX2/FMA, is served by the scalar reference and reported as
/// [`KernelOutcome::FellBackToScalar`].
pub struct Avx2Kernel;

impl MatvecKernel for Avx2Kernel {
    fn name(&self) -> &'static str {
        "avx2"
    }

    fn is_available(&self) -> bool {
        is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma")
    }

    fn is_simd(&self) -> bool {
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
        let shape =
            check_buffers(matrix, vec_mul, vec_add, res, rows, cols, Traversal::RowMajor)?;

        if !self.accepts(shape, Traversal::RowMajor) {
            matvec_rows(matrix, vec_mul, vec_add, res, cols);
            return Ok(KernelOutcome::FellBackToScalar);
        }

        // Safety: AVX2 and FMA were detected and every buffer length was checked
        unsafe { matvec_avx2(matrix, vec_mul, vec_add, res, rows, cols) };
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
        let shape =
            check_buffers(matrix, vec_mul, vec_add, res, rows, cols, Traversal::Transposed)?;

        if !self.accepts(shape, Traversal::Transposed) {
            matvec_cols(matrix, vec_mul, vec_add, res, rows, cols);
            return Ok(KernelOutcome::FellBackToScalar);
        }

        // Safety: AVX2 and FMA were detected and every buffer length was checked
        unsafe { matvec_t_avx2(matrix, vec_mul, vec_add, res, rows, cols) };
        Ok(KernelOutcome::Computed)
    }
}

impl Avx2Kernel {
    fn accepts(&self, shape: MatvecShape, traversal: Traversal) -> bool {
        if !self.is_available() {
            log::debug!("avx2: AVX2/FMA not detected, using scalar kernel for {shape}");
            return false;
        }
        if !shape.is_simd_aligned() {
            fallback_notice(self.name(), shape, traversal);
            return false;
        }
        true
    }
}

/// Row-major product, one FMA accumulator per output row.
///
/// # Safety
/// Requires AVX2 and FMA, `rows % 8 == 0`, `cols % 8 == 0`, and buffers sized
/// for a `rows × cols` row-major traversal.
#[target_feature(enable = "avx2,fma")]
unsafe fn matvec_avx2(
    matrix: &[f32],
    vec_mul: &[f32],
    vec_add: &[f32],
    res: &mut [f32],
    rows: usize,
    cols: usize,
) {
    let x = vec_mul.as_ptr();

    for i in 0..rows {
        let row = matrix.as_ptr().add(i * cols);
        let mut sum = _mm256_setzero_ps();

        for j in (0..cols).step_by(SIMD_WIDTH) {
            let v_vec = _mm256_loadu_ps(x.add(j));
            let v_mat = _mm256_loadu_ps(row.add(j));
            sum = _mm256_fmadd_ps(v_mat, v_vec, sum);
        }

        res[i] = horizontal_sum_f32(sum) + vec_add[i];
    }
}

/// Column product with the output held as vectors: `res` starts as the bias,
/// then each row of the matrix is scaled by the broadcast multiplier and
/// accumulated into it. No horizontal reduction.
///
/// # Safety
/// Same contract as [`matvec_avx2`] with the transposed buffer lengths.
#[target_feature(enable = "avx2,fma")]
unsafe fn matvec_t_avx2(
    matrix: &[f32],
    vec_mul: &[f32],
    vec_add: &[f32],
    res: &mut [f32],
    rows: usize,
    cols: usize,
) {
    res.copy_from_slice(vec_add);
    let out = res.as_mut_ptr();

    for (j, &x) in vec_mul.iter().enumerate().take(rows) {
        let scale = _mm256_set1_ps(x);
        let row = matrix.as_ptr().add(j * cols);

        for i in (0..cols).step_by(SIMD_WIDTH) {
            let acc = _mm256_loadu_ps(out.add(i));
            let v_mat = _mm256_loadu_ps(row.add(i));
            _mm256_storeu_ps(out.add(i), _mm256_fmadd_ps(v_mat, scale, acc));
        }
    }
}

/// Pairwise lane reduction: 8 → 4 → 2 → 1.
#[target_feature(enable = "avx2")]
#[inline]
unsafe fn horizontal_sum_f32(v: __m256) -> f32 {
    let hi = _mm256_extractf128_ps(v, 1);
    let lo = _mm256_castps256_ps128(v);
    let quad = _mm_add_ps(hi, lo);
    let dual = _mm_add_ps(quad, _mm_movehl_ps(quad, quad));
    let single = _mm_add_ss(dual, _mm_shuffle_ps(dual, dual, 0x55));
    _mm_cvtss_f32(single)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::fallback::FallbackKernel;

    fn pattern(len: usize, k: usize) -> Vec<f32> {
        (0..len).map(|i| (i % k) as f32).collect()
    }

    #[test]
    fn test_avx2_matvec_parity() {
        let kernel = Avx2Kernel;
        if !kernel.is_available() {
            return;
        }

        let (rows, cols) = (16, 24);
        let matrix = pattern(rows * cols, 7);
        let vec_mul = pattern(cols, 3);
        let vec_add = pattern(rows, 5);
        let mut simd = vec![0.0f32; rows];
        let mut scalar = vec![0.0f32; rows];

        let outcome = kernel.matvec(&matrix, &vec_mul, &vec_add, &mut simd, rows, cols).unwrap();
        FallbackKernel.matvec(&matrix, &vec_mul, &vec_add, &mut scalar, rows, cols).unwrap();

        assert_eq!(outcome, KernelOutcome::Computed);
        // small integers: every partial sum is exact
        assert_eq!(simd, scalar);
    }

    #[test]
    fn test_avx2_matvec_t_parity() {
        let kernel = Avx2Kernel;
        if !kernel.is_available() {
            return;
        }

        let (rows, cols) = (8, 32);
        let matrix = pattern(rows * cols, 7);
        let vec_mul = pattern(rows, 3);
        let vec_add = pattern(cols, 2);
        let mut simd = vec![0.0f32; cols];
        let mut scalar = vec![0.0f32; cols];

        let outcome =
            kernel.matvec_t(&matrix, &vec_mul, &vec_add, &mut simd, rows, cols).unwrap();
        FallbackKernel.matvec_t(&matrix, &vec_mul, &vec_add, &mut scalar, rows, cols).unwrap();

        assert_eq!(outcome, KernelOutcome::Computed);
        assert_eq!(simd, scalar);
    }

    #[test]
    fn test_avx2_misaligned_falls_back() {
        let kernel = Avx2Kernel;
        let (rows, cols) = (9, 8);
        let matrix = pattern(rows * cols, 3);
        let vec_mul = pattern(cols, 3);
        let vec_add = vec![0.0f32; rows];
        let mut simd = vec![-1.0f32; rows];
        let mut scalar = vec![0.0f32; rows];

        let outcome = kernel.matvec(&matrix, &vec_mul, &vec_add, &mut simd, rows, cols).unwrap();
        FallbackKernel.matvec(&matrix, &vec_mul, &vec_add, &mut scalar, rows, cols).unwrap();

        assert_eq!(outcome, KernelOutcome::FellBackToScalar);
        assert_eq!(simd, scalar);
    }

    #[test]
    fn test_horizontal_sum() {
        if !is_x86_feature_detected!("avx2") {
            return;
        }
        let lanes = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let sum = unsafe { horizontal_sum_f32(_mm256_loadu_ps(lanes.as_ptr())) };
        assert_eq!(sum, 36.0);
    }
}
