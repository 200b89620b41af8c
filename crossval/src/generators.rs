//! Deterministic buffer population for trials

use crate::{CrossvalError, Result};
use matvec_common::{GeneratorSpec, MatvecShape, TrialConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Produce `len` values from `spec`. Identical inputs give identical output.
pub fn fill(spec: GeneratorSpec, len: usize) -> Vec<f32> {
    match spec {
        GeneratorSpec::Modulo(k) => {
            let k = k.max(1) as usize;
            (0..len).map(|h| (h % k) as f32).collect()
        }
        GeneratorSpec::Periodic => (0..len).map(|h| (h as f32).sin()).collect(),
        GeneratorSpec::Seeded(seed) => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..len).map(|_| rng.random_range(-1.0f32..1.0)).collect()
        }
        GeneratorSpec::Zeros => vec![0.0; len],
    }
}

/// Inputs of one trial. Buffers are owned by the trial and never shared.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialData {
    pub shape: MatvecShape,
    pub matrix: Vec<f32>,
    pub vec_mul: Vec<f32>,
    pub vec_add: Vec<f32>,
}

impl TrialData {
    /// Allocate and populate the buffers described by `config`.
    ///
    /// Seeded generators are offset per buffer so `matrix`, `vec_mul` and
    /// `vec_add` do not repeat each other's prefix.
    pub fn generate(config: &TrialConfig) -> Result<Self> {
        config.validate().map_err(|e| CrossvalError::InvalidConfig(e.to_string()))?;

        let shape = config.shape();
        let traversal = config.traversal;
        Ok(Self {
            shape,
            matrix: fill(config.matrix, shape.matrix_len()),
            vec_mul: fill(offset(config.vec_mul, 1), shape.input_len(traversal)),
            vec_add: fill(offset(config.vec_add, 2), shape.output_len(traversal)),
        })
    }

    /// A zeroed output buffer of the right length.
    pub fn output_buffer(&self, config: &TrialConfig) -> Vec<f32> {
        vec![0.0; self.shape.output_len(config.traversal)]
    }
}

fn offset(spec: GeneratorSpec, stream: u64) -> GeneratorSpec {
    match spec {
        GeneratorSpec::Seeded(seed) => GeneratorSpec::Seeded(seed.wrapping_add(stream)),
        other => other,
    }
}
