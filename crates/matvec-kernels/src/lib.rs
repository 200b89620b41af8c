//! Dense `f32` matrix-vector kernels
//!
//! Every kernel computes `res = matrix · vec_mul + vec_add` (or the
//! transposed form) over a caller-owned, row-major matrix and writes the full
//! `res` buffer. Three families are provided:
//!
//! - [`FallbackKernel`]: strictly sequential scalar loops, the reference.
//! - [`Avx2Kernel`] / [`NeonKernel`]: 8-lane SIMD kernels that require both
//!   dimensions to be multiples of [`SIMD_WIDTH`] and otherwise delegate to
//!   the scalar reference.
//! - [`OracleKernel`]: an external `sgemv` routine used as a baseline.
//!
//! [`dispatch`] picks between them per call.

use matvec_common::{KernelError, KernelOutcome, Result, Traversal};
use std::sync::OnceLock;

pub mod blas;
pub mod cpu;
pub mod dispatch;
mod validation;

pub use matvec_common::SIMD_WIDTH;

/// A matrix-vector kernel implementation.
pub trait MatvecKernel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the kernel can run on this machine.
    fn is_available(&self) -> bool;

    /// Whether the kernel has a vectorized path subject to the alignment rule.
    fn is_simd(&self) -> bool {
        false
    }

    /// `res[i] = vec_add[i] + Σ_j vec_mul[j] * matrix[i*cols + j]`, `i < rows`.
    fn matvec(
        &self,
        matrix: &[f32],
        vec_mul: &[f32],
        vec_add: &[f32],
        res: &mut [f32],
        rows: usize,
        cols: usize,
    ) -> Result<KernelOutcome>;

    /// `res[i] = vec_add[i] + Σ_j vec_mul[j] * matrix[j*cols + i]`, `i < cols`.
    fn matvec_t(
        &self,
        matrix: &[f32],
        vec_mul: &[f32],
        vec_add: &[f32],
        res: &mut [f32],
        rows: usize,
        cols: usize,
    ) -> Result<KernelOutcome>;

    /// Run the variant selected by `traversal`.
    fn apply(
        &self,
        traversal: Traversal,
        matrix: &[f32],
        vec_mul: &[f32],
        vec_add: &[f32],
        res: &mut [f32],
        rows: usize,
        cols: usize,
    ) -> Result<KernelOutcome> {
        match traversal {
            Traversal::RowMajor => self.matvec(matrix, vec_mul, vec_add, res, rows, cols),
            Traversal::Transposed => self.matvec_t(matrix, vec_mul, vec_add, res, rows, cols),
        }
    }
}

/// Ordered set of CPU providers, best first, with the fallback last.
///
/// Only the hardware-driven choice of provider is cached. The per-call choice
/// between vectorized and scalar paths is made by [`dispatch::Dispatcher`]
/// from the dimensions of each call.
pub struct KernelManager {
    providers: Vec<Box<dyn MatvecKernel>>,
    selected: OnceLock<usize>,
}

impl KernelManager {
    pub fn new() -> Self {
        #[allow(unused_mut)]
        let mut providers: Vec<Box<dyn MatvecKernel>> = vec![Box::new(cpu::FallbackKernel)];

        #[cfg(all(target_arch = "x86_64", feature = "avx2"))]
        {
            if cpu::Avx2Kernel.is_available() {
                providers.insert(0, Box::new(cpu::Avx2Kernel));
            } else {
                log::debug!("AVX2/FMA not detected, AVX2 provider not registered");
            }
        }

        #[cfg(all(target_arch = "aarch64", feature = "neon"))]
        {
            if cpu::NeonKernel.is_available() {
                providers.insert(0, Box::new(cpu::NeonKernel));
            }
        }

        Self { providers, selected: OnceLock::new() }
    }

    /// Manager holding only the scalar fallback.
    pub fn scalar_only() -> Self {
        Self { providers: vec![Box::new(cpu::FallbackKernel)], selected: OnceLock::new() }
    }

    /// Select the best available provider; the choice is cached.
    pub fn select_best(&self) -> Result<&dyn MatvecKernel> {
        let selected_idx = self.selected.get_or_init(|| {
            for (i, provider) in self.providers.iter().enumerate() {
                if provider.is_available() {
                    log::info!("Selected matvec provider: {}", provider.name());
                    return i;
                }
            }
            log::error!("No available matvec provider found");
            self.providers.len()
        });

        self.providers
            .get(*selected_idx)
            .map(|p| p.as_ref())
            .ok_or_else(|| KernelError::NoProvider.into())
    }

    /// Name of the cached provider, if [`select_best`](Self::select_best) ran.
    pub fn selected_provider_name(&self) -> Option<&'static str> {
        self.selected.get().and_then(|&idx| self.providers.get(idx)).map(|p| p.name())
    }

    pub fn list_available_providers(&self) -> Vec<&'static str> {
        self.providers.iter().filter(|p| p.is_available()).map(|p| p.name()).collect()
    }

    /// A per-call dispatcher backed by the best SIMD provider, if any.
    pub fn dispatcher(&self) -> Result<dispatch::Dispatcher<'_>> {
        let best = self.select_best()?;
        Ok(if best.is_simd() {
            dispatch::Dispatcher::with_simd(best)
        } else {
            dispatch::Dispatcher::scalar_only()
        })
    }

    #[cfg(test)]
    pub fn reset_selection(&mut self) {
        self.selected = OnceLock::new();
    }
}

impl Default for KernelManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Best CPU provider for this machine, boxed.
pub fn select_cpu_kernel() -> Result<Box<dyn MatvecKernel>> {
    #[cfg(all(target_arch = "x86_64", feature = "avx2"))]
    {
        if cpu::Avx2Kernel.is_available() {
            return Ok(Box::new(cpu::Avx2Kernel));
        }
    }

    #[cfg(all(target_arch = "aarch64", feature = "neon"))]
    {
        if cpu::NeonKernel.is_available() {
            return Ok(Box::new(cpu::NeonKernel));
        }
    }

    Ok(Box::new(cpu::FallbackKernel))
}

pub use blas::{BlasOracle, CblasOracle, OracleKernel, ReferenceBlas, oracle_matvec};
pub use cpu::{FallbackKernel, scalar_matvec, scalar_matvec_t};
#[cfg(target_arch = "x86_64")]
pub use cpu::Avx2Kernel;
#[cfg(target_arch = "aarch64")]
pub use cpu::NeonKernel;
pub use dispatch::{Dispatched, Dispatcher, select, simd_matvec, simd_matvec_t};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_always_has_fallback_last() {
        let km = KernelManager::new();
        let providers = km.list_available_providers();
        assert_eq!(providers.last(), Some(&"fallback"));
    }

    #[test]
    fn manager_selection_is_cached_until_reset() {
        let mut km = KernelManager::new();
        assert!(km.selected_provider_name().is_none());
        let first = km.select_best().unwrap().name();
        assert_eq!(km.selected_provider_name(), Some(first));
        km.reset_selection();
        assert!(km.selected_provider_name().is_none());
    }

    #[test]
    fn scalar_only_manager_dispatches_scalar() {
        let km = KernelManager::scalar_only();
        let dispatcher = km.dispatcher().unwrap();
        assert!(!dispatcher.has_simd());
        assert_eq!(km.selected_provider_name(), Some("fallback"));
    }

    #[test]
    fn select_cpu_kernel_is_available() {
        let kernel = select_cpu_kernel().unwrap();
        assert!(kernel.is_available());
    }
}
