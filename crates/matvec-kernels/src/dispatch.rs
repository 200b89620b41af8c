//! Per-call routing between the vectorized and scalar kernels
//!
//! Two independent choices are made for every call:
//!
//! - **traversal**: reduce across rows (`vec_mul` matches the matrix's second
//!   axis) or down columns (`vec_mul` matches the first axis);
//! - **implementation**: the SIMD kernel when both dimensions are multiples of
//!   [`SIMD_WIDTH`], the scalar kernel otherwise.
//!
//! [`select`] is a pure function of the dimensions. Nothing about the decision
//! is cached, so successive calls with different shapes route independently.

use crate::cpu::FallbackKernel;
use crate::validation::check_buffers;
use crate::MatvecKernel;
use matvec_common::warn_once::fallback_notice;
use matvec_common::{KernelOutcome, KernelPath, MatvecShape, Result, Traversal};
use std::sync::OnceLock;

/// Choose a kernel assuming a SIMD unit is present.
pub fn select(rows: usize, cols: usize, transposed: bool) -> KernelPath {
    select_with(MatvecShape::new(rows, cols), Traversal::from_flag(transposed), true)
}

/// Choose a kernel for `shape`, honouring whether SIMD is usable at all.
pub fn select_with(shape: MatvecShape, traversal: Traversal, simd_available: bool) -> KernelPath {
    let simd = simd_available && shape.is_simd_aligned();
    match (traversal, simd) {
        (Traversal::RowMajor, true) => KernelPath::Simd,
        (Traversal::RowMajor, false) => KernelPath::Scalar,
        (Traversal::Transposed, true) => KernelPath::SimdTransposed,
        (Traversal::Transposed, false) => KernelPath::ScalarTransposed,
    }
}

/// What ran for one dispatched call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatched {
    pub path: KernelPath,
    pub outcome: KernelOutcome,
    pub kernel: &'static str,
}

/// Routes calls to a SIMD provider or the scalar fallback.
#[derive(Clone, Copy)]
pub struct Dispatcher<'a> {
    simd: Option<&'a dyn MatvecKernel>,
}

impl std::fmt::Debug for Dispatcher<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").field("simd", &self.simd.map(|k| k.name())).finish()
    }
}

impl Dispatcher<'static> {
    /// Dispatcher backed by the best SIMD kernel this CPU supports.
    pub fn detect() -> Self {
        Self { simd: native_simd_kernel() }
    }

    pub fn scalar_only() -> Self {
        Self { simd: None }
    }
}

impl<'a> Dispatcher<'a> {
    pub fn with_simd(kernel: &'a dyn MatvecKernel) -> Self {
        Self { simd: Some(kernel) }
    }

    pub fn has_simd(&self) -> bool {
        self.simd.is_some()
    }

    pub fn simd_kernel_name(&self) -> Option<&'static str> {
        self.simd.map(|k| k.name())
    }

    pub fn select(&self, rows: usize, cols: usize, traversal: Traversal) -> KernelPath {
        select_with(MatvecShape::new(rows, cols), traversal, self.simd.is_some())
    }

    /// Compute `res` with the kernel chosen for this call's dimensions.
    ///
    /// A scalar path is reported as [`KernelOutcome::FellBackToScalar`].
    pub fn matvec(
        &self,
        traversal: Traversal,
        matrix: &[f32],
        vec_mul: &[f32],
        vec_add: &[f32],
        res: &mut [f32],
        rows: usize,
        cols: usize,
    ) -> Result<Dispatched> {
        let shape = check_buffers(matrix, vec_mul, vec_add, res, rows, cols, traversal)?;
        let path = select_with(shape, traversal, self.simd.is_some());
        log::trace!("dispatch {shape} ({traversal}) -> {path}");

        match (path.is_simd(), self.simd) {
            (true, Some(kernel)) => {
                let outcome = kernel.apply(traversal, matrix, vec_mul, vec_add, res, rows, cols)?;
                Ok(Dispatched { path, outcome, kernel: kernel.name() })
            }
            _ => {
                if let Some(kernel) = self.simd {
                    fallback_notice(kernel.name(), shape, traversal);
                }
                FallbackKernel.apply(traversal, matrix, vec_mul, vec_add, res, rows, cols)?;
                Ok(Dispatched {
                    path,
                    outcome: KernelOutcome::FellBackToScalar,
                    kernel: FallbackKernel.name(),
                })
            }
        }
    }
}

impl Default for Dispatcher<'static> {
    fn default() -> Self {
        Self::detect()
    }
}

/// Best SIMD kernel for this CPU; hardware detection runs once.
pub fn native_simd_kernel() -> Option<&'static dyn MatvecKernel> {
    static DETECTED: OnceLock<Option<&'static dyn MatvecKernel>> = OnceLock::new();
    *DETECTED.get_or_init(detect_simd_kernel)
}

fn detect_simd_kernel() -> Option<&'static dyn MatvecKernel> {
    #[cfg(all(target_arch = "x86_64", feature = "avx2"))]
    {
        static AVX2: crate::cpu::Avx2Kernel = crate::cpu::Avx2Kernel;
        if AVX2.is_available() {
            log::info!("SIMD kernel: avx2");
            return Some(&AVX2);
        }
    }

    #[cfg(all(target_arch = "aarch64", feature = "neon"))]
    {
        static NEON: crate::cpu::NeonKernel = crate::cpu::NeonKernel;
        if NEON.is_available() {
            log::info!("SIMD kernel: neon");
            return Some(&NEON);
        }
    }

    log::info!("No SIMD kernel available, all calls use the scalar fallback");
    None
}

/// Vectorized row-major entry point.
///
/// Uses the native SIMD kernel when the CPU has one and both dimensions are
/// multiples of [`SIMD_WIDTH`](matvec_common::SIMD_WIDTH); otherwise `res` is
/// produced by the scalar kernel and the outcome is
/// [`KernelOutcome::FellBackToScalar`].
pub fn simd_matvec(
    matrix: &[f32],
    vec_mul: &[f32],
    vec_add: &[f32],
    res: &mut [f32],
    rows: usize,
    cols: usize,
) -> Result<KernelOutcome> {
    Dispatcher::detect()
        .matvec(Traversal::RowMajor, matrix, vec_mul, vec_add, res, rows, cols)
        .map(|d| d.outcome)
}

/// Vectorized transposed entry point; see [`simd_matvec`].
pub fn simd_matvec_t(
    matrix: &[f32],
    vec_mul: &[f32],
    vec_add: &[f32],
    res: &mut [f32],
    rows: usize,
    cols: usize,
) -> Result<KernelOutcome> {
    Dispatcher::detect()
        .matvec(Traversal::Transposed, matrix, vec_mul, vec_add, res, rows, cols)
        .map(|d| d.outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_routes_on_alignment_and_traversal() {
        assert_eq!(select(8, 8, false), KernelPath::Simd);
        assert_eq!(select(8, 8, true), KernelPath::SimdTransposed);
        assert_eq!(select(9, 8, false), KernelPath::Scalar);
        assert_eq!(select(8, 9, true), KernelPath::ScalarTransposed);
        assert_eq!(select(64, 16, false), KernelPath::Simd);
    }

    #[test]
    fn select_is_reevaluated_per_call() {
        let shapes = [(8, 8), (9, 8), (16, 16), (16, 12), (8, 8)];
        let paths: Vec<_> = shapes.iter().map(|&(r, c)| select(r, c, false)).collect();
        assert_eq!(
            paths,
            vec![
                KernelPath::Simd,
                KernelPath::Scalar,
                KernelPath::Simd,
                KernelPath::Scalar,
                KernelPath::Simd
            ]
        );
    }

    #[test]
    fn select_without_simd_is_always_scalar() {
        let shape = MatvecShape::new(8, 8);
        assert_eq!(select_with(shape, Traversal::RowMajor, false), KernelPath::Scalar);
        assert_eq!(select_with(shape, Traversal::Transposed, false), KernelPath::ScalarTransposed);
    }

    #[test]
    fn scalar_only_dispatcher_reports_fallback() {
        let dispatcher = Dispatcher::scalar_only();
        let matrix = vec![1.0f32; 64];
        let mut res = vec![0.0f32; 8];
        let d = dispatcher
            .matvec(Traversal::RowMajor, &matrix, &[1.0; 8], &[0.0; 8], &mut res, 8, 8)
            .unwrap();
        assert_eq!(d.path, KernelPath::Scalar);
        assert_eq!(d.outcome, KernelOutcome::FellBackToScalar);
        assert_eq!(d.kernel, "fallback");
        assert_eq!(res, vec![8.0; 8]);
    }

    #[test]
    fn detected_dispatcher_uses_simd_for_aligned_shapes() {
        let dispatcher = Dispatcher::detect();
        let matrix = vec![1.0f32; 64];
        let mut res = vec![0.0f32; 8];
        let d = dispatcher
            .matvec(Traversal::RowMajor, &matrix, &[1.0; 8], &[0.5; 8], &mut res, 8, 8)
            .unwrap();

        if dispatcher.has_simd() {
            assert_eq!(d.path, KernelPath::Simd);
            assert_eq!(d.outcome, KernelOutcome::Computed);
        } else {
            assert_eq!(d.outcome, KernelOutcome::FellBackToScalar);
        }
        assert_eq!(res, vec![8.5; 8]);
    }

    #[test]
    fn dispatcher_rejects_bad_buffers_before_routing() {
        let mut res = vec![0.0f32; 7];
        let result = Dispatcher::detect().matvec(
            Traversal::RowMajor,
            &[0.0; 64],
            &[0.0; 8],
            &[0.0; 8],
            &mut res,
            8,
            8,
        );
        assert!(result.is_err());
    }
}
