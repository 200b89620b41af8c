//! Configuration types for trials and the differential harness
//!
//! There is no persisted configuration format: scenarios construct a
//! [`TrialConfig`] directly, and [`HarnessConfig`] can be overlaid from
//! `MATVEC_*` environment variables.

use crate::{MatvecError, MatvecShape, Result, Traversal};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deterministic value source used to populate trial buffers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "arg")]
pub enum GeneratorSpec {
    /// `value(i) = i % k`
    Modulo(u32),
    /// `value(i) = sin(i)`, normalized to `[-1, 1]`
    Periodic,
    /// Uniform in `[-1, 1)` from a seeded ChaCha8 stream
    Seeded(u64),
    /// All zeros
    Zeros,
}

impl Default for GeneratorSpec {
    fn default() -> Self {
        GeneratorSpec::Modulo(3)
    }
}

impl fmt::Display for GeneratorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorSpec::Modulo(k) => write!(f, "modulo:{k}"),
            GeneratorSpec::Periodic => write!(f, "periodic"),
            GeneratorSpec::Seeded(seed) => write!(f, "seeded:{seed}"),
            GeneratorSpec::Zeros => write!(f, "zeros"),
        }
    }
}

impl FromStr for GeneratorSpec {
    type Err = MatvecError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (s.as_str(), None),
        };

        match (name, arg) {
            ("modulo" | "mod", Some(k)) => {
                let k: u32 = k
                    .parse()
                    .map_err(|_| MatvecError::Config(format!("invalid modulus '{k}'")))?;
                if k == 0 {
                    return Err(MatvecError::Config("modulus must be >= 1".into()));
                }
                Ok(GeneratorSpec::Modulo(k))
            }
            ("modulo" | "mod", None) => Ok(GeneratorSpec::Modulo(3)),
            ("periodic" | "sin", None) => Ok(GeneratorSpec::Periodic),
            ("seeded" | "random", Some(seed)) => seed
                .parse()
                .map(GeneratorSpec::Seeded)
                .map_err(|_| MatvecError::Config(format!("invalid seed '{seed}'"))),
            ("seeded" | "random", None) => Ok(GeneratorSpec::Seeded(42)),
            ("zeros" | "zero", None) => Ok(GeneratorSpec::Zeros),
            _ => Err(MatvecError::Config(format!(
                "unknown generator '{s}' (expected modulo:K, periodic, seeded:SEED or zeros)"
            ))),
        }
    }
}

/// One scenario: matrix shape, traversal, and how each buffer is filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    pub rows: usize,
    pub cols: usize,
    pub traversal: Traversal,
    pub matrix: GeneratorSpec,
    pub vec_mul: GeneratorSpec,
    pub vec_add: GeneratorSpec,
}

impl TrialConfig {
    /// Row-major trial with every buffer filled by `index % 3`.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            traversal: Traversal::RowMajor,
            matrix: GeneratorSpec::default(),
            vec_mul: GeneratorSpec::default(),
            vec_add: GeneratorSpec::default(),
        }
    }

    #[must_use]
    pub fn transposed(mut self, transposed: bool) -> Self {
        self.traversal = Traversal::from_flag(transposed);
        self
    }

    /// Use `spec` for all three buffers.
    #[must_use]
    pub fn generator(mut self, spec: GeneratorSpec) -> Self {
        self.matrix = spec;
        self.vec_mul = spec;
        self.vec_add = spec;
        self
    }

    #[must_use]
    pub fn bias(mut self, spec: GeneratorSpec) -> Self {
        self.vec_add = spec;
        self
    }

    #[must_use]
    pub fn multiplicand(mut self, spec: GeneratorSpec) -> Self {
        self.vec_mul = spec;
        self
    }

    pub fn shape(&self) -> MatvecShape {
        MatvecShape::new(self.rows, self.cols)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(MatvecError::Config(format!(
                "trial dimensions must be non-zero, got {}x{}",
                self.rows, self.cols
            )));
        }
        if self.rows.checked_mul(self.cols).is_none() {
            return Err(MatvecError::Config(format!(
                "trial dimensions {}x{} overflow usize",
                self.rows, self.cols
            )));
        }
        Ok(())
    }
}

/// Tolerances and switches for the differential harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Relative tolerance for vectorized-vs-scalar comparisons.
    pub tolerance: f32,
    /// Relative tolerance for comparisons against the BLAS oracle.
    pub oracle_tolerance: f32,
    /// Include the BLAS oracle in each trial.
    pub use_oracle: bool,
    /// Route every call to the scalar kernels, as if no SIMD unit existed.
    pub disable_simd: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self { tolerance: 1e-4, oracle_tolerance: 1e-3, use_oracle: true, disable_simd: false }
    }
}

impl HarnessConfig {
    /// Defaults overlaid with `MATVEC_TOLERANCE`, `MATVEC_ORACLE_TOLERANCE`,
    /// `MATVEC_USE_ORACLE` and `MATVEC_DISABLE_SIMD`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("MATVEC_TOLERANCE") {
            cfg.tolerance = parse_env_f32("MATVEC_TOLERANCE", &v)?;
        }
        if let Some(v) = lookup("MATVEC_ORACLE_TOLERANCE") {
            cfg.oracle_tolerance = parse_env_f32("MATVEC_ORACLE_TOLERANCE", &v)?;
        }
        if let Some(v) = lookup("MATVEC_USE_ORACLE") {
            cfg.use_oracle = parse_env_bool("MATVEC_USE_ORACLE", &v)?;
        }
        if let Some(v) = lookup("MATVEC_DISABLE_SIMD") {
            cfg.disable_simd = parse_env_bool("MATVEC_DISABLE_SIMD", &v)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(MatvecError::Config(format!(
                "tolerance must be finite and >= 0, got {}",
                self.tolerance
            )));
        }
        if !(self.oracle_tolerance.is_finite() && self.oracle_tolerance >= 0.0) {
            return Err(MatvecError::Config(format!(
                "oracle_tolerance must be finite and >= 0, got {}",
                self.oracle_tolerance
            )));
        }
        Ok(())
    }
}

fn parse_env_f32(key: &str, value: &str) -> Result<f32> {
    value
        .trim()
        .parse()
        .map_err(|_| MatvecError::Config(format!("{key}: expected a float, got '{value}'")))
}

fn parse_env_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(MatvecError::Config(format!("{key}: expected a boolean, got '{value}'"))),
    }
}
