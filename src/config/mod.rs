//! Configuration module for WrapSlurm
//!
//! Provides the command-line interface and the persisted defaults that
//! back it.

mod defaults;
mod settings;

pub use defaults::*;
pub use settings::*;
