//! Differential testing for the matvec kernels
//!
//! A trial fills `matrix`, `vec_mul` and `vec_add` deterministically, runs the
//! scalar reference, the dispatched vectorized kernel and optionally a BLAS
//! oracle on identical inputs, and compares the outputs element by element.
//!
//! ```no_run
//! use matvec_common::{GeneratorSpec, HarnessConfig, TrialConfig};
//! use matvec_crossval::DifferentialHarness;
//!
//! let harness = DifferentialHarness::new(HarnessConfig::default());
//! let trial = TrialConfig::new(64, 64).generator(GeneratorSpec::Seeded(7));
//! let report = harness.run(&trial).unwrap();
//! println!("{report}");
//! assert!(report.passed());
//! ```

pub mod display;
pub mod generators;
pub mod harness;
pub mod metrics;

pub use generators::{TrialData, fill};
pub use harness::{
    CompareMode, ComparisonEntry, DifferentialHarness, KernelRun, Role, SweepSummary, TrialReport,
};
pub use metrics::{Comparison, compare_exact, compare_within, max_abs, max_rel};

use matvec_common::MatvecError;

#[derive(Debug, thiserror::Error)]
pub enum CrossvalError {
    #[error("kernel error: {0}")]
    Kernel(#[from] MatvecError),

    #[error("comparison failed: {0}")]
    ComparisonError(String),

    #[error("invalid trial configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, CrossvalError>;
