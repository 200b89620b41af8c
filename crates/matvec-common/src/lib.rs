//! Common types, errors, and configuration for the matvec kernels
//!
//! This crate holds the pieces shared by the kernel crate, the cross-validation
//! harness, and the command line driver: the error taxonomy, the routing
//! types that describe which kernel ran, and the harness configuration.

pub mod config;
pub mod error;
pub mod types;
pub mod warn_once;

pub use config::*;
pub use error::*;
pub use types::*;
pub use warn_once::warn_once_fn;
