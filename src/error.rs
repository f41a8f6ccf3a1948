//! Error taxonomy shared by every calculator and the pipeline.
//!
//! Each variant maps to a process exit code so the `emi` binary can report
//! failures the same way regardless of where they were raised.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    /// Out-of-domain or missing measurement (negative concentration, dimension mismatch, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Weights not summing to 1, unordered thresholds, unknown group, unreadable config.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Integration non-convergence, failed joint solve, non-finite intermediate.
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// File system or serialization failure.
    #[error("I/O error: {0}")]
    Io(String),
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidInput(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        AppError::Configuration(message.into())
    }

    pub fn numerical(message: impl Into<String>) -> Self {
        AppError::Numerical(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        AppError::Io(message.into())
    }

    /// Prefix the message with `context`, keeping the error class.
    pub fn with_context(self, context: impl std::fmt::Display) -> Self {
        match self {
            AppError::InvalidInput(m) => AppError::InvalidInput(format!("{context}: {m}")),
            AppError::Configuration(m) => AppError::Configuration(format!("{context}: {m}")),
            AppError::Numerical(m) => AppError::Numerical(format!("{context}: {m}")),
            AppError::Io(m) => AppError::Io(format!("{context}: {m}")),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::InvalidInput(_) | AppError::Configuration(_) | AppError::Io(_) => 2,
            AppError::Numerical(_) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(AppError::invalid("x").exit_code(), 2);
        assert_eq!(AppError::config("x").exit_code(), 2);
        assert_eq!(AppError::io("x").exit_code(), 2);
        assert_eq!(AppError::numerical("x").exit_code(), 4);
    }

    #[test]
    fn display_names_the_class() {
        let err = AppError::invalid("negative concentration for Os");
        assert_eq!(err.to_string(), "Invalid input: negative concentration for Os");
    }

    #[test]
    fn context_keeps_the_variant() {
        let err = AppError::numerical("did not converge").with_context("specimen 'A-1'");
        assert_eq!(err, AppError::Numerical("specimen 'A-1': did not converge".into()));
        assert_eq!(err.exit_code(), 4);
    }
}
