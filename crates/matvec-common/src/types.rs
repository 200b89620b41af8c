//! Shapes and routing types for matrix-vector kernels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of `f32` lanes processed together by the vectorized kernels
/// (one 256-bit register).
pub const SIMD_WIDTH: usize = 8;

/// Which axis of the row-major matrix is reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Traversal {
    /// `res[i] = Σ_j matrix[i*cols + j] * vec_mul[j]`, output length `rows`.
    #[default]
    RowMajor,
    /// `res[i] = Σ_j matrix[j*cols + i] * vec_mul[j]`, output length `cols`.
    Transposed,
}

impl Traversal {
    pub fn from_flag(transposed: bool) -> Self {
        if transposed { Traversal::Transposed } else { Traversal::RowMajor }
    }

    pub fn is_transposed(self) -> bool {
        matches!(self, Traversal::Transposed)
    }
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Traversal::RowMajor => write!(f, "row-major"),
            Traversal::Transposed => write!(f, "transposed"),
        }
    }
}

/// The concrete kernel chosen by the dispatch policy for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelPath {
    Scalar,
    ScalarTransposed,
    Simd,
    SimdTransposed,
}

impl KernelPath {
    pub fn is_simd(self) -> bool {
        matches!(self, KernelPath::Simd | KernelPath::SimdTransposed)
    }

    pub fn traversal(self) -> Traversal {
        match self {
            KernelPath::Scalar | KernelPath::Simd => Traversal::RowMajor,
            KernelPath::ScalarTransposed | KernelPath::SimdTransposed => Traversal::Transposed,
        }
    }
}

impl fmt::Display for KernelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelPath::Scalar => write!(f, "scalar"),
            KernelPath::ScalarTransposed => write!(f, "scalar_T"),
            KernelPath::Simd => write!(f, "simd"),
            KernelPath::SimdTransposed => write!(f, "simd_T"),
        }
    }
}

/// Routing status returned by every kernel call.
///
/// Lets callers assert on which implementation actually produced `res`
/// without scraping log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelOutcome {
    /// The kernel's own implementation wrote `res`.
    Computed,
    /// Preconditions for the vectorized path were not met; the scalar
    /// reference wrote `res`.
    FellBackToScalar,
}

impl fmt::Display for KernelOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelOutcome::Computed => write!(f, "computed"),
            KernelOutcome::FellBackToScalar => write!(f, "fell-back-to-scalar"),
        }
    }
}

/// Logical dimensions of a row-major `rows × cols` matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatvecShape {
    pub rows: usize,
    pub cols: usize,
}

impl MatvecShape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn matrix_len(&self) -> usize {
        self.rows * self.cols
    }

    /// Length of `vec_mul` for the given traversal.
    pub fn input_len(&self, traversal: Traversal) -> usize {
        match traversal {
            Traversal::RowMajor => self.cols,
            Traversal::Transposed => self.rows,
        }
    }

    /// Length of `vec_add` and `res` for the given traversal.
    pub fn output_len(&self, traversal: Traversal) -> usize {
        match traversal {
            Traversal::RowMajor => self.rows,
            Traversal::Transposed => self.cols,
        }
    }

    /// Both dimensions are multiples of [`SIMD_WIDTH`].
    pub fn is_simd_aligned(&self) -> bool {
        self.rows % SIMD_WIDTH == 0 && self.cols % SIMD_WIDTH == 0
    }
}

impl fmt::Display for MatvecShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}
