//! Subcommand implementations
//!
//! Each `execute` returns whether every comparison passed; errors are reserved
//! for bad arguments and kernel failures.

use anyhow::{Context, Result, bail};
use clap::Args;
use matvec_common::{GeneratorSpec, HarnessConfig, TrialConfig};
use matvec_crossval::display::{format_matrix, format_vector};
use matvec_crossval::{DifferentialHarness, TrialData};
use matvec_kernels::{Dispatcher, FallbackKernel, MatvecKernel};
use tracing::{debug, info};

/// Options shared by every harness-driving subcommand.
#[derive(Args, Debug, Clone)]
pub struct HarnessArgs {
    /// Use the transposed traversal
    #[arg(short, long)]
    pub transposed: bool,

    /// Buffer generator: modulo:K, periodic, seeded:SEED or zeros
    #[arg(short, long, value_name = "SPEC", default_value = "modulo:3", env = "MATVEC_GENERATOR")]
    pub generator: GeneratorSpec,

    /// Relative tolerance for vectorized vs scalar
    #[arg(long, value_name = "EPS")]
    pub tolerance: Option<f32>,

    /// Relative tolerance for comparisons against the BLAS oracle
    #[arg(long, value_name = "EPS")]
    pub oracle_tolerance: Option<f32>,

    /// Skip the BLAS oracle
    #[arg(long)]
    pub no_oracle: bool,

    /// Route every call to the scalar kernels
    #[arg(long)]
    pub scalar_only: bool,

    /// Print the report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl HarnessArgs {
    /// Environment defaults with command-line flags applied on top.
    fn harness(&self) -> Result<DifferentialHarness> {
        let mut config = HarnessConfig::from_env().context("invalid MATVEC_* environment")?;
        if let Some(eps) = self.tolerance {
            config.tolerance = eps;
        }
        if let Some(eps) = self.oracle_tolerance {
            config.oracle_tolerance = eps;
        }
        if self.no_oracle {
            config.use_oracle = false;
        }
        if self.scalar_only {
            config.disable_simd = true;
        }
        config.validate().context("invalid harness configuration")?;
        debug!(?config, "harness configuration");

        let harness = DifferentialHarness::new(config);
        if harness.config().use_oracle {
            info!("BLAS oracle: {}", harness.oracle_name());
        }
        Ok(harness)
    }

    fn trial(&self, rows: usize, cols: usize) -> TrialConfig {
        TrialConfig::new(rows, cols).transposed(self.transposed).generator(self.generator)
    }
}

/// Run one trial and print its report.
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Matrix rows
    #[arg(short, long)]
    pub rows: usize,

    /// Matrix columns
    #[arg(short, long)]
    pub cols: usize,

    #[command(flatten)]
    pub harness: HarnessArgs,
}

impl RunCommand {
    pub fn execute(&self) -> Result<bool> {
        let harness = self.harness.harness()?;
        let trial = self.harness.trial(self.rows, self.cols);
        let report = harness
            .run(&trial)
            .with_context(|| format!("trial {}x{} failed to run", self.rows, self.cols))?;

        if self.harness.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("{report}");
        }
        Ok(report.passed())
    }
}

/// Run square trials over several sizes.
#[derive(Args, Debug)]
pub struct SweepCommand {
    /// Comma-separated square sizes
    #[arg(short, long, value_delimiter = ',', default_value = "8,16,64,256,1024")]
    pub sizes: Vec<usize>,

    #[command(flatten)]
    pub harness: HarnessArgs,
}

impl SweepCommand {
    pub fn execute(&self) -> Result<bool> {
        if self.sizes.is_empty() {
            bail!("--sizes must name at least one size");
        }

        let harness = self.harness.harness()?;
        let trials: Vec<_> = self.sizes.iter().map(|&n| self.harness.trial(n, n)).collect();
        let summary = harness.sweep(&trials).context("sweep failed to run")?;

        if self.harness.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!("{summary}");
        }
        Ok(summary.all_passed())
    }
}

/// Print the generated buffers and the scalar and vectorized results.
#[derive(Args, Debug)]
pub struct DumpCommand {
    /// Matrix rows
    #[arg(short, long)]
    pub rows: usize,

    /// Matrix columns
    #[arg(short, long)]
    pub cols: usize,

    /// Use the transposed traversal
    #[arg(short, long)]
    pub transposed: bool,

    /// Buffer generator: modulo:K, periodic, seeded:SEED or zeros
    #[arg(short, long, value_name = "SPEC", default_value = "modulo:3", env = "MATVEC_GENERATOR")]
    pub generator: GeneratorSpec,
}

impl DumpCommand {
    pub fn execute(&self) -> Result<bool> {
        let trial = TrialConfig::new(self.rows, self.cols)
            .transposed(self.transposed)
            .generator(self.generator);
        let data = TrialData::generate(&trial)?;

        let mut scalar = data.output_buffer(&trial);
        FallbackKernel
            .apply(
                trial.traversal,
                &data.matrix,
                &data.vec_mul,
                &data.vec_add,
                &mut scalar,
                trial.rows,
                trial.cols,
            )
            .context("scalar kernel failed")?;

        let mut vectorized = data.output_buffer(&trial);
        let dispatched = Dispatcher::detect().matvec(
            trial.traversal,
            &data.matrix,
            &data.vec_mul,
            &data.vec_add,
            &mut vectorized,
            trial.rows,
            trial.cols,
        )?;

        println!("matrix ({}):", data.shape);
        print!("{}", format_matrix(&data.matrix, trial.rows, trial.cols));
        println!("vec_mul: {}", format_vector(&data.vec_mul));
        println!("vec_add: {}", format_vector(&data.vec_add));
        println!("scalar ({}): {}", trial.traversal, format_vector(&scalar));
        println!(
            "{} ({}, {}): {}",
            dispatched.kernel,
            dispatched.path,
            dispatched.outcome,
            format_vector(&vectorized)
        );
        Ok(true)
    }
}
