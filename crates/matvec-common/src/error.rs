//! Error types shared across the workspace.

use thiserror::Error;

/// Top-level error for the matvec crates.
#[derive(Debug, Error)]
pub enum MatvecError {
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by kernel providers and the BLAS oracle.
///
/// Dimension misalignment on the vectorized path is not an error:
/// it routes to the scalar kernel and is reported through
/// [`KernelOutcome`](crate::KernelOutcome), not as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("invalid arguments: {reason}")]
    InvalidArguments { reason: String },

    #[error("unsupported hardware: required {required}, available {available}")]
    UnsupportedHardware { required: String, available: String },

    #[error("no kernel provider available")]
    NoProvider,

    #[error("BLAS oracle unavailable: {reason}")]
    OracleUnavailable { reason: String },

    #[error("BLAS oracle call failed: {reason}")]
    OracleFailed { reason: String },
}

pub type Result<T> = std::result::Result<T, MatvecError>;

impl KernelError {
    /// Shorthand for a buffer/shape mismatch reported by a kernel entry point.
    pub fn invalid(reason: impl Into<String>) -> Self {
        KernelError::InvalidArguments { reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_error_converts_into_matvec_error() {
        let err: MatvecError = KernelError::NoProvider.into();
        assert!(matches!(err, MatvecError::Kernel(KernelError::NoProvider)));
        assert_eq!(err.to_string(), "kernel error: no kernel provider available");
    }

    #[test]
    fn invalid_arguments_message_carries_reason() {
        let err = KernelError::invalid("vec_mul has 3 elements, expected 8");
        assert_eq!(err.to_string(), "invalid arguments: vec_mul has 3 elements, expected 8");
    }
}
