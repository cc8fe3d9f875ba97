//! Error types for shellfn operations

use std::io;
use thiserror::Error;

/// Result type for shellfn operations
pub type Result<T> = std::result::Result<T, ShellfnError>;

/// Errors raised while building or running a process function.
///
/// Execution outcomes such as a command exiting non-zero are not errors: they are
/// exit codes on the execution record. These variants cover programmer mistakes and
/// infrastructure failures.
#[derive(Error, Debug)]
pub enum ShellfnError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Invalid inputs: {0}")]
    InvalidInputs(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Function body failed: {0}")]
    Body(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Signal error: {0}")]
    Signal(String),
}

impl ShellfnError {
    /// Whether the error stems from a misconfigured wrapper or call rather than the runtime.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ShellfnError::InvalidConfig(_) | ShellfnError::Type(_) | ShellfnError::InvalidInputs(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShellfnError::InvalidConfig("variadic arguments are not supported".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: variadic arguments are not supported"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = ShellfnError::from(io_err);
        assert!(err.to_string().contains("IO error"));
        assert!(!err.is_configuration_error());
    }

    #[test]
    fn test_configuration_errors() {
        assert!(ShellfnError::Type("bad".into()).is_configuration_error());
        assert!(ShellfnError::InvalidInputs("bad".into()).is_configuration_error());
        assert!(!ShellfnError::Body("boom".into()).is_configuration_error());
    }

    #[test]
    fn test_transition_display() {
        let err = ShellfnError::InvalidTransition {
            from: "finished".to_string(),
            to: "killed".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid state transition: finished -> killed");
    }
}
