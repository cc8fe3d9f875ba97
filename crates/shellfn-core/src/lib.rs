//! shellfn-core: shared types for shellfn
//!
//! This crate provides the foundational types used by the process and shell layers:
//! - Error types and Result alias
//! - Data values passed into and out of processes (including file content)
//! - Exit code specifications and the per-schema exit code table

pub mod error;
pub mod exit_code;
pub mod value;

pub use error::{Result, ShellfnError};
pub use exit_code::{ExitCode, ExitCodeSpec, ExitCodes};
pub use value::{FileContent, Outputs, Value};
