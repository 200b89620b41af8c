//! BLAS `sgemv` oracle
//!
//! The oracle follows the CBLAS call contract
//! `y := alpha · op(A) · x + beta · y`. The kernels in this crate match it with
//! `alpha = beta = 1` once the bias has been copied into `y`, which is what
//! [`oracle_matvec`] does.
//!
//! Two implementations are available:
//!
//! - [`ReferenceBlas`]: pure Rust, accumulates in `f64`, always available.
//! - [`CblasOracle`]: the system CBLAS library, behind the `cblas` feature.

mod cblas;
mod reference;

pub use cblas::CblasOracle;
pub use reference::ReferenceBlas;

use crate::MatvecKernel;
use crate::validation::check_buffers;
use matvec_common::{KernelError, KernelOutcome, Result, Traversal};

/// CBLAS storage order.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    RowMajor = 101,
    ColMajor = 102,
}

/// CBLAS transpose flag.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transpose {
    NoTrans = 111,
    Trans = 112,
}

impl From<Traversal> for Transpose {
    fn from(traversal: Traversal) -> Self {
        match traversal {
            Traversal::RowMajor => Transpose::NoTrans,
            Traversal::Transposed => Transpose::Trans,
        }
    }
}

/// A general matrix-vector routine with the CBLAS `sgemv` signature.
///
/// `A` is logically `m × n`; `lda` is its leading dimension in `order`.
/// Strides must be positive.
pub trait BlasOracle: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    #[allow(clippy::too_many_arguments)]
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
    ) -> Result<()>;
}

/// Argument checks shared by every oracle, run before any memory access.
#[allow(clippy::too_many_arguments)]
pub(crate) fn check_sgemv_args(
    order: Order,
    trans: Transpose,
    m: usize,
    n: usize,
    a: &[f32],
    lda: usize,
    x: &[f32],
    incx: usize,
    y: &[f32],
    incy: usize,
) -> Result<()> {
    let min_lda = match order {
        Order::RowMajor => n.max(1),
        Order::ColMajor => m.max(1),
    };
    if lda < min_lda {
        return Err(KernelError::invalid(format!("lda = {lda} must be >= {min_lda}")).into());
    }
    if incx == 0 || incy == 0 {
        return Err(KernelError::invalid("vector increments must be non-zero").into());
    }

    let (outer, inner) = match order {
        Order::RowMajor => (m, n),
        Order::ColMajor => (n, m),
    };
    let a_needed = if outer == 0 || inner == 0 { 0 } else { (outer - 1) * lda + inner };
    if a.len() < a_needed {
        return Err(KernelError::invalid(format!(
            "matrix buffer has {} elements, needs {a_needed}",
            a.len()
        ))
        .into());
    }

    let (x_len, y_len) = match trans {
        Transpose::NoTrans => (n, m),
        Transpose::Trans => (m, n),
    };
    let strided = |len: usize, inc: usize| if len == 0 { 0 } else { (len - 1) * inc + 1 };
    if x.len() < strided(x_len, incx) {
        return Err(KernelError::invalid(format!(
            "x has {} elements, needs {} (len {x_len}, inc {incx})",
            x.len(),
            strided(x_len, incx)
        ))
        .into());
    }
    if y.len() < strided(y_len, incy) {
        return Err(KernelError::invalid(format!(
            "y has {} elements, needs {} (len {y_len}, inc {incy})",
            y.len(),
            strided(y_len, incy)
        ))
        .into());
    }

    Ok(())
}

/// Compute the kernel contract through an oracle: copy the bias into `res`,
/// then `res := 1 · op(matrix) · vec_mul + 1 · res` on the row-major matrix.
#[allow(clippy::too_many_arguments)]
pub fn oracle_matvec(
    oracle: &dyn BlasOracle,
    traversal: Traversal,
    matrix: &[f32],
    vec_mul: &[f32],
    vec_add: &[f32],
    res: &mut [f32],
    rows: usize,
    cols: usize,
) -> Result<()> {
    check_buffers(matrix, vec_mul, vec_add, res, rows, cols, traversal)?;

    res.copy_from_slice(vec_add);
    oracle.sgemv(
        Order::RowMajor,
        traversal.into(),
        rows,
        cols,
        1.0,
        matrix,
        cols.max(1),
        vec_mul,
        1,
        1.0,
        res,
        1,
    )
}

/// Exposes an oracle through the [`MatvecKernel`] interface so the harness
/// can run it alongside the native kernels.
pub struct OracleKernel<O: BlasOracle> {
    oracle: O,
}

impl<O: BlasOracle> OracleKernel<O> {
    pub fn new(oracle: O) -> Self {
        Self { oracle }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }
}

impl OracleKernel<ReferenceBlas> {
    pub fn reference() -> Self {
        Self::new(ReferenceBlas)
    }
}

impl<O: BlasOracle> MatvecKernel for OracleKernel<O> {
    fn name(&self) -> &'static str {
        self.oracle.name()
    }

    fn is_available(&self) -> bool {
        self.oracle.is_available()
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
        oracle_matvec(&self.oracle, Traversal::RowMajor, matrix, vec_mul, vec_add, res, rows, cols)?;
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
        oracle_matvec(&self.oracle, Traversal::Transposed, matrix, vec_mul, vec_add, res, rows, cols)?;
        Ok(KernelOutcome::Computed)
    }
}

/// Best oracle for this build: CBLAS when linked, otherwise the reference.
pub fn select_oracle() -> Box<dyn BlasOracle> {
    let cblas = CblasOracle;
    if cblas.is_available() {
        log::info!("BLAS oracle: {}", cblas.name());
        Box::new(cblas)
    } else {
        log::debug!("CBLAS not linked, using the reference oracle");
        Box::new(ReferenceBlas)
    }
}
