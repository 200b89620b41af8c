//! Differential harness
//!
//! One trial runs, on identical inputs and separate output buffers:
//!
//! 1. the scalar reference ([`FallbackKernel`]);
//! 2. the dispatched vectorized entry point;
//! 3. the BLAS oracle, when enabled.
//!
//! Pairs are then compared. A vectorized call that fell back to scalar must
//! match the reference exactly; a genuinely vectorized result, and anything
//! against the oracle, must agree within the configured tolerance. Failed
//! comparisons are recorded in the report, never raised.

use crate::generators::TrialData;
use crate::metrics::{Comparison, compare_exact, compare_within};
use crate::{CrossvalError, Result};
use matvec_common::{
    HarnessConfig, KernelOutcome, KernelPath, MatvecShape, Traversal, TrialConfig,
};
use matvec_kernels::blas::select_oracle;
use matvec_kernels::{BlasOracle, Dispatcher, FallbackKernel, MatvecKernel, oracle_matvec};
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Which side of a comparison an output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Scalar,
    Vectorized,
    Oracle,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Scalar => write!(f, "scalar"),
            Role::Vectorized => write!(f, "vectorized"),
            Role::Oracle => write!(f, "oracle"),
        }
    }
}

/// One kernel invocation within a trial.
#[derive(Debug, Clone, Serialize)]
pub struct KernelRun {
    pub role: Role,
    pub kernel: &'static str,
    /// Dispatch decision; `None` for kernels called directly.
    pub path: Option<KernelPath>,
    pub outcome: KernelOutcome,
    pub elapsed_us: f64,
}

/// How two outputs were compared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareMode {
    Exact,
    Within(f32),
}

impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareMode::Exact => write!(f, "exact"),
            CompareMode::Within(eps) => write!(f, "within {eps:e}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonEntry {
    pub left: Role,
    pub right: Role,
    pub mode: CompareMode,
    #[serde(flatten)]
    pub result: Comparison,
}

/// Everything observed for one trial.
#[derive(Debug, Clone, Serialize)]
pub struct TrialReport {
    pub trial: TrialConfig,
    pub shape: MatvecShape,
    pub traversal: Traversal,
    pub simd_kernel: Option<&'static str>,
    pub runs: Vec<KernelRun>,
    pub comparisons: Vec<ComparisonEntry>,
}

impl TrialReport {
    pub fn passed(&self) -> bool {
        self.comparisons.iter().all(|c| c.result.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ComparisonEntry> {
        self.comparisons.iter().filter(|c| !c.result.passed)
    }

    pub fn run(&self, role: Role) -> Option<&KernelRun> {
        self.runs.iter().find(|r| r.role == role)
    }

    /// Outcome of the vectorized entry point.
    pub fn vectorized_outcome(&self) -> Option<KernelOutcome> {
        self.run(Role::Vectorized).map(|r| r.outcome)
    }
}

impl fmt::Display for TrialReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "trial {} ({}) matrix={} vec_mul={} vec_add={}",
            self.shape, self.traversal, self.trial.matrix, self.trial.vec_mul, self.trial.vec_add
        )?;
        for run in &self.runs {
            let path = run.path.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
            writeln!(
                f,
                "  {:<10} {:<15} {:<9} {:<20} {:>10.2} us",
                run.role.to_string(),
                run.kernel,
                path,
                run.outcome.to_string(),
                run.elapsed_us
            )?;
        }
        for c in &self.comparisons {
            let status = if c.result.passed { "PASS" } else { "FAIL" };
            write!(
                f,
                "  {status} {} vs {} ({}): max_abs={:.3e} max_rel={:.3e}",
                c.left, c.right, c.mode, c.result.max_abs_diff, c.result.max_rel_diff
            )?;
            if let (false, Some(i)) = (c.result.passed, c.result.worst_index) {
                write!(f, " worst at [{i}]")?;
            }
            writeln!(f)?;
        }
        write!(f, "  => {}", if self.passed() { "PASS" } else { "FAIL" })
    }
}

/// Aggregate of several independent trials.
#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub reports: Vec<TrialReport>,
    pub passed: usize,
    pub failed: usize,
}

impl SweepSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.reports {
            writeln!(f, "{report}")?;
        }
        write!(f, "{} trial(s): {} passed, {} failed", self.reports.len(), self.passed, self.failed)
    }
}

/// Runs trials against the scalar, vectorized and oracle kernels.
pub struct DifferentialHarness {
    config: HarnessConfig,
    dispatcher: Dispatcher<'static>,
    oracle: Box<dyn BlasOracle>,
}

impl DifferentialHarness {
    pub fn new(config: HarnessConfig) -> Self {
        let dispatcher =
            if config.disable_simd { Dispatcher::scalar_only() } else { Dispatcher::detect() };
        Self { config, dispatcher, oracle: select_oracle() }
    }

    /// Harness configured from `MATVEC_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(HarnessConfig::from_env()?))
    }

    #[must_use]
    pub fn with_oracle(mut self, oracle: Box<dyn BlasOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher<'static>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn oracle_name(&self) -> &'static str {
        self.oracle.name()
    }

    /// Generate fresh buffers for `trial` and run it.
    pub fn run(&self, trial: &TrialConfig) -> Result<TrialReport> {
        let data = TrialData::generate(trial)?;
        self.run_with_data(trial, &data)
    }

    /// Run `trial` on caller-supplied inputs.
    pub fn run_with_data(&self, trial: &TrialConfig, data: &TrialData) -> Result<TrialReport> {
        if data.shape != trial.shape() {
            return Err(CrossvalError::InvalidConfig(format!(
                "trial is {} but data is {}",
                trial.shape(),
                data.shape
            )));
        }

        let (rows, cols) = (trial.rows, trial.cols);
        let traversal = trial.traversal;
        debug!(shape = %data.shape, %traversal, "running trial");

        let mut runs = Vec::with_capacity(3);

        let mut scalar = data.output_buffer(trial);
        let start = Instant::now();
        let outcome = FallbackKernel.apply(
            traversal,
            &data.matrix,
            &data.vec_mul,
            &data.vec_add,
            &mut scalar,
            rows,
            cols,
        )?;
        runs.push(KernelRun {
            role: Role::Scalar,
            kernel: FallbackKernel.name(),
            path: None,
            outcome,
            elapsed_us: elapsed_us(start),
        });

        let mut vectorized = data.output_buffer(trial);
        let start = Instant::now();
        let dispatched = self.dispatcher.matvec(
            traversal,
            &data.matrix,
            &data.vec_mul,
            &data.vec_add,
            &mut vectorized,
            rows,
            cols,
        )?;
        runs.push(KernelRun {
            role: Role::Vectorized,
            kernel: dispatched.kernel,
            path: Some(dispatched.path),
            outcome: dispatched.outcome,
            elapsed_us: elapsed_us(start),
        });

        let mut comparisons = Vec::with_capacity(3);
        let (mode, result) = match dispatched.outcome {
            KernelOutcome::FellBackToScalar => {
                (CompareMode::Exact, compare_exact(&scalar, &vectorized)?)
            }
            KernelOutcome::Computed => (
                CompareMode::Within(self.config.tolerance),
                compare_within(&scalar, &vectorized, self.config.tolerance)?,
            ),
        };
        comparisons.push(ComparisonEntry { left: Role::Scalar, right: Role::Vectorized, mode, result });

        if self.config.use_oracle {
            let mut oracle = data.output_buffer(trial);
            let start = Instant::now();
            oracle_matvec(
                self.oracle.as_ref(),
                traversal,
                &data.matrix,
                &data.vec_mul,
                &data.vec_add,
                &mut oracle,
                rows,
                cols,
            )?;
            runs.push(KernelRun {
                role: Role::Oracle,
                kernel: self.oracle.name(),
                path: None,
                outcome: KernelOutcome::Computed,
                elapsed_us: elapsed_us(start),
            });

            let eps = self.config.oracle_tolerance;
            for (left, output) in [(Role::Scalar, &scalar), (Role::Vectorized, &vectorized)] {
                comparisons.push(ComparisonEntry {
                    left,
                    right: Role::Oracle,
                    mode: CompareMode::Within(eps),
                    result: compare_within(output, &oracle, eps)?,
                });
            }
        }

        let report = TrialReport {
            trial: trial.clone(),
            shape: data.shape,
            traversal,
            simd_kernel: self.dispatcher.simd_kernel_name(),
            runs,
            comparisons,
        };

        if report.passed() {
            info!(shape = %report.shape, %traversal, "trial passed");
        } else {
            for c in report.failures() {
                warn!(
                    shape = %report.shape,
                    %traversal,
                    "{} vs {} ({}) failed: max_rel={:e} at {:?}",
                    c.left,
                    c.right,
                    c.mode,
                    c.result.max_rel_diff,
                    c.result.worst_index
                );
            }
        }

        Ok(report)
    }

    /// Run each trial with its own freshly generated buffers.
    pub fn sweep(&self, trials: &[TrialConfig]) -> Result<SweepSummary> {
        let mut reports = Vec::with_capacity(trials.len());
        for trial in trials {
            reports.push(self.run(trial)?);
        }
        let passed = reports.iter().filter(|r| r.passed()).count();
        let failed = reports.len() - passed;
        Ok(SweepSummary { reports, passed, failed })
    }
}

impl Default for DifferentialHarness {
    fn default() -> Self {
        Self::new(HarnessConfig::default())
    }
}

fn elapsed_us(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1e6
}

#[cfg(test)]
mod tests {
    use super::*;
    use matvec_common::GeneratorSpec;
    use matvec_kernels::ReferenceBlas;

    #[test]
    fn aligned_trial_passes_all_comparisons() {
        let harness = DifferentialHarness::default();
        let report = harness.run(&TrialConfig::new(8, 8)).unwrap();
        assert!(report.passed(), "{report}");
        assert_eq!(report.runs.len(), 3);
        assert_eq!(report.comparisons.len(), 3);
    }

    #[test]
    fn misaligned_trial_compares_exactly() {
        let harness = DifferentialHarness::default();
        let report = harness.run(&TrialConfig::new(9, 8).generator(GeneratorSpec::Modulo(7))).unwrap();
        assert_eq!(report.vectorized_outcome(), Some(KernelOutcome::FellBackToScalar));
        assert_eq!(report.comparisons[0].mode, CompareMode::Exact);
        assert!(report.passed());
    }

    #[test]
    fn oracle_can_be_disabled() {
        let config = HarnessConfig { use_oracle: false, ..HarnessConfig::default() };
        let report = DifferentialHarness::new(config).run(&TrialConfig::new(16, 16)).unwrap();
        assert!(report.run(Role::Oracle).is_none());
        assert_eq!(report.comparisons.len(), 1);
    }

    #[test]
    fn disabled_simd_falls_back_everywhere() {
        let config = HarnessConfig { disable_simd: true, ..HarnessConfig::default() };
        let report = DifferentialHarness::new(config).run(&TrialConfig::new(32, 32)).unwrap();
        assert_eq!(report.simd_kernel, None);
        assert_eq!(report.vectorized_outcome(), Some(KernelOutcome::FellBackToScalar));
    }

    #[test]
    fn mismatched_data_is_rejected() {
        let harness = DifferentialHarness::default().with_oracle(Box::new(ReferenceBlas));
        let data = TrialData::generate(&TrialConfig::new(8, 8)).unwrap();
        let err = harness.run_with_data(&TrialConfig::new(16, 8), &data).unwrap_err();
        assert!(matches!(err, CrossvalError::InvalidConfig(_)));
    }

    #[test]
    fn report_serializes_and_displays() {
        let report = DifferentialHarness::default()
            .run(&TrialConfig::new(8, 16).transposed(true).generator(GeneratorSpec::Seeded(3)))
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["traversal"], "transposed");
        assert_eq!(json["comparisons"][0]["left"], "scalar");
        assert!(json["comparisons"][0]["passed"].is_boolean());

        let text = report.to_string();
        assert!(text.starts_with("trial 8x16 (transposed)"));
        assert!(text.ends_with("=> PASS"));
    }

    #[test]
    fn sweep_counts_results() {
        let trials = [TrialConfig::new(8, 8), TrialConfig::new(9, 9), TrialConfig::new(64, 64)];
        let summary = DifferentialHarness::default().sweep(&trials).unwrap();
        assert_eq!(summary.reports.len(), 3);
        assert!(summary.all_passed());
        assert!(summary.to_string().ends_with("3 trial(s): 3 passed, 0 failed"));
    }
}
