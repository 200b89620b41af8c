//! ARM NEON kernel implementations
//!
//! NEON registers hold four `f32` lanes, so each 8-lane group is processed as
//! a low and a high half. The alignment rule and the fallback behaviour are
//! the same as for the x86 kernel.

use crate::MatvecKernel;
use crate::cpu::fallback::{matvec_cols, matvec_rows};
use crate::validation::check_buffers;
use matvec_common::warn_once::fallback_notice;
use matvec_common::{KernelOutcome, MatvecShape, Result, SIMD_WIDTH, Traversal};
use std::arch::aarch64::*;

/// NEON kernel for ARM64.
pub struct NeonKernel;

impl MatvecKernel for NeonKernel {
    fn name(&self) -> &'static str {
        "neon"
    }

    fn is_available(&self) -> bool {
        // mandatory on ARM64, still probed at runtime
        std::arch::is_aarch64_feature_detected!("neon")
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

        // Safety: NEON detected, buffer lengths checked
        unsafe { matvec_neon(matrix, vec_mul, vec_add, res, rows, cols) };
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

        // Safety: NEON detected, buffer lengths checked
        unsafe { matvec_t_neon(matrix, vec_mul, vec_add, res, rows, cols) };
        Ok(KernelOutcome::Computed)
    }
}

impl NeonKernel {
    fn accepts(&self, shape: MatvecShape, traversal: Traversal) -> bool {
        if !self.is_available() {
            log::debug!("neon: not detected, using scalar kernel for {shape}");
            return false;
        }
        if !shape.is_simd_aligned() {
            fallback_notice(self.name(), shape, traversal);
            return false;
        }
        true
    }
}

#[target_feature(enable = "neon")]
unsafe fn matvec_neon(
    matrix: &[f32],
    vec_mul: &[f32],
    vec_add: &[f32],
    res: &mut [f32],
    rows: usize,
    cols: usize,
) {
    unsafe {
        let x = vec_mul.as_ptr();

        for i in 0..rows {
            let row = matrix.as_ptr().add(i * cols);
            let mut sum_lo = vdupq_n_f32(0.0);
            let mut sum_hi = vdupq_n_f32(0.0);

            for j in (0..cols).step_by(SIMD_WIDTH) {
                sum_lo = vfmaq_f32(sum_lo, vld1q_f32(row.add(j)), vld1q_f32(x.add(j)));
                sum_hi = vfmaq_f32(sum_hi, vld1q_f32(row.add(j + 4)), vld1q_f32(x.add(j + 4)));
            }

            // 8 → 4 lanes, then across the remaining four
            res[i] = vaddvq_f32(vaddq_f32(sum_lo, sum_hi)) + vec_add[i];
        }
    }
}

#[target_feature(enable = "neon")]
unsafe fn matvec_t_neon(
    matrix: &[f32],
    vec_mul: &[f32],
    vec_add: &[f32],
    res: &mut [f32],
    rows: usize,
    cols: usize,
) {
    unsafe {
        res.copy_from_slice(vec_add);
        let out = res.as_mut_ptr();

        for (j, &x) in vec_mul.iter().enumerate().take(rows) {
            let scale = vdupq_n_f32(x);
            let row = matrix.as_ptr().add(j * cols);

            for i in (0..cols).step_by(SIMD_WIDTH) {
                let lo = vfmaq_f32(vld1q_f32(out.add(i)), vld1q_f32(row.add(i)), scale);
                let hi = vfmaq_f32(vld1q_f32(out.add(i + 4)), vld1q_f32(row.add(i + 4)), scale);
                vst1q_f32(out.add(i), lo);
                vst1q_f32(out.add(i + 4), hi);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::fallback::FallbackKernel;

    fn pattern(len: usize, k: usize) -> Vec<f32> {
        (0..len).map(|i| (i % k) as f32).collect()
    }

    #[test]
    fn test_neon_matvec_parity() {
        let kernel = NeonKernel;
        if !kernel.is_available() {
            return;
        }

        let (rows, cols) = (8, 16);
        let matrix = pattern(rows * cols, 7);
        let vec_mul = pattern(cols, 3);
        let vec_add = pattern(rows, 4);
        let mut simd = vec![0.0f32; rows];
        let mut scalar = vec![0.0f32; rows];

        let outcome = kernel.matvec(&matrix, &vec_mul, &vec_add, &mut simd, rows, cols).unwrap();
        FallbackKernel.matvec(&matrix, &vec_mul, &vec_add, &mut scalar, rows, cols).unwrap();

        assert_eq!(outcome, KernelOutcome::Computed);
        assert_eq!(simd, scalar);
    }

    #[test]
    fn test_neon_matvec_t_parity() {
        let kernel = NeonKernel;
        if !kernel.is_available() {
            return;
        }

        let (rows, cols) = (16, 8);
        let matrix = pattern(rows * cols, 5);
        let vec_mul = pattern(rows, 3);
        let vec_add = pattern(cols, 2);
        let mut simd = vec![0.0f32; cols];
        let mut scalar = vec![0.0f32; cols];

        kernel.matvec_t(&matrix, &vec_mul, &vec_add, &mut simd, rows, cols).unwrap();
        FallbackKernel.matvec_t(&matrix, &vec_mul, &vec_add, &mut scalar, rows, cols).unwrap();
        assert_eq!(simd, scalar);
    }

    #[test]
    fn test_neon_misaligned_falls_back() {
        let kernel = NeonKernel;
        let mut res = vec![0.0f32; 3];
        let outcome = kernel
            .matvec(&pattern(12, 3), &pattern(4, 3), &[1.0; 3], &mut res, 3, 4)
            .unwrap();
        assert_eq!(outcome, KernelOutcome::FellBackToScalar);
    }
}
