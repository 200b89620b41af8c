//! System CBLAS oracle
//!
//! Linked only with the `cblas` feature; `build.rs` emits the link line
//! (library name from `MATVEC_BLAS_LIB`, default `cblas`). Without the
//! feature every call reports [`KernelError::OracleUnavailable`].

use super::{BlasOracle, Order, Transpose, check_sgemv_args};
use matvec_common::{KernelError, Result};

mod ffi {
    #[cfg(feature = "cblas")]
    mod imp {
        use std::ffi::{c_float, c_int};

        unsafe extern "C" {
            fn cblas_sgemv(
                order: c_int,
                trans: c_int,
                m: c_int,
                n: c_int,
                alpha: c_float,
                a: *const c_float,
                lda: c_int,
                x: *const c_float,
                incx: c_int,
                beta: c_float,
                y: *mut c_float,
                incy: c_int,
            );
        }

        pub fn is_available() -> bool {
            true
        }

        /// Caller guarantees every buffer covers the extents implied by the
        /// dimensions, leading dimension and increments.
        #[allow(clippy::too_many_arguments)]
        pub fn sgemv(
            order: i32,
            trans: i32,
            m: i32,
            n: i32,
            alpha: f32,
            a: &[f32],
            lda: i32,
            x: &[f32],
            incx: i32,
            beta: f32,
            y: &mut [f32],
            incy: i32,
        ) -> Result<(), &'static str> {
            unsafe {
                cblas_sgemv(
                    order,
                    trans,
                    m,
                    n,
                    alpha,
                    a.as_ptr(),
                    lda,
                    x.as_ptr(),
                    incx,
                    beta,
                    y.as_mut_ptr(),
                    incy,
                );
            }
            Ok(())
        }
    }

    #[cfg(not(feature = "cblas"))]
    mod imp {
        pub fn is_available() -> bool {
            false
        }

        #[allow(clippy::too_many_arguments)]
        pub fn sgemv(
            _order: i32,
            _trans: i32,
            _m: i32,
            _n: i32,
            _alpha: f32,
            _a: &[f32],
            _lda: i32,
            _x: &[f32],
            _incx: i32,
            _beta: f32,
            _y: &mut [f32],
            _incy: i32,
        ) -> Result<(), &'static str> {
            Err("built without the `cblas` feature")
        }
    }

    pub use imp::*;
}

/// `cblas_sgemv` from the system BLAS.
#[derive(Debug, Clone, Copy, Default)]
pub struct CblasOracle;

impl BlasOracle for CblasOracle {
    fn name(&self) -> &'static str {
        "cblas"
    }

    fn is_available(&self) -> bool {
        ffi::is_available()
    }

    fn sgemv(
        &self,
        order: Order,
        trans: Transpose,
        m: usize,
        n: usize,
        alpha: f32,
        a: &[f32],
        lda: usize,
        x: &[f32],
        incx: usize,
        beta: f32,
        y: &mut [f32],
        incy: usize,
    ) -> Result<()> {
        if !self.is_available() {
            return Err(KernelError::OracleUnavailable {
                reason: "built without the `cblas` feature".to_string(),
            }
            .into());
        }

        check_sgemv_args(order, trans, m, n, a, lda, x, incx, y, incy)?;

        let to_int = |name: &str, v: usize| -> Result<i32> {
            i32::try_from(v).map_err(|_| {
                KernelError::invalid(format!("{name} = {v} exceeds i32::MAX for CBLAS")).into()
            })
        };

        ffi::sgemv(
            order as i32,
            trans as i32,
            to_int("m", m)?,
            to_int("n", n)?,
            alpha,
            a,
            to_int("lda", lda)?,
            x,
            to_int("incx", incx)?,
            beta,
            y,
            to_int("incy", incy)?,
        )
        .map_err(|reason| KernelError::OracleFailed { reason: reason.to_string() }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_follows_feature() {
        assert_eq!(CblasOracle.is_available(), cfg!(feature = "cblas"));
    }

    #[cfg(not(feature = "cblas"))]
    #[test]
    fn stub_reports_unavailable() {
        let mut y = [0.0f32; 1];
        let err = CblasOracle
            .sgemv(Order::RowMajor, Transpose::NoTrans, 1, 1, 1.0, &[1.0], 1, &[1.0], 1, 0.0, &mut y, 1)
            .unwrap_err();
        assert!(err.to_string().contains("BLAS oracle unavailable"));
    }

    #[cfg(feature = "cblas")]
    #[test]
    fn cblas_matches_reference() {
        use crate::blas::ReferenceBlas;

        let a: Vec<f32> = (0..64).map(|i| (i % 7) as f32).collect();
        let x: Vec<f32> = (0..8).map(|i| (i % 3) as f32).collect();
        let mut y_ref = vec![1.0f32; 8];
        let mut y_sys = vec![1.0f32; 8];

        ReferenceBlas
            .sgemv(Order::RowMajor, Transpose::NoTrans, 8, 8, 1.0, &a, 8, &x, 1, 1.0, &mut y_ref, 1)
            .unwrap();
        CblasOracle
            .sgemv(Order::RowMajor, Transpose::NoTrans, 8, 8, 1.0, &a, 8, &x, 1, 1.0, &mut y_sys, 1)
            .unwrap();
        assert_eq!(y_ref, y_sys);
    }
}
