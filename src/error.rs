//! Error types for shape validation

use thiserror::Error;

use crate::source::SourceError;

/// Result type for shape operations
pub type Result<T> = std::result::Result<T, ShapeError>;

/// Coarse category of a [`ShapeError`], independent of how it is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidConfiguration,
    ValidationFailure,
    InvalidInput,
    DeclarationSyntax,
    UnknownReturnMode,
    Source,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidConfiguration => "invalid_configuration",
            ErrorKind::ValidationFailure => "validation_failure",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::DeclarationSyntax => "declaration_syntax",
            ErrorKind::UnknownReturnMode => "unknown_return_mode",
            ErrorKind::Source => "source",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape validation errors
#[derive(Error, Debug)]
pub enum ShapeError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Validation failed: expected {expected}, found {found}")]
    ValidationFailure { expected: String, found: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Declaration syntax error in statement {index} `{statement}`: {reason}")]
    DeclarationSyntax {
        index: usize,
        statement: String,
        reason: String,
    },

    #[error("Unknown return mode: {0}")]
    UnknownReturnMode(String),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

impl ShapeError {
    /// The category half of the `{kind, message}` error contract
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShapeError::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            ShapeError::ValidationFailure { .. } => ErrorKind::ValidationFailure,
            ShapeError::InvalidInput(_) => ErrorKind::InvalidInput,
            ShapeError::DeclarationSyntax { .. } => ErrorKind::DeclarationSyntax,
            ShapeError::UnknownReturnMode(_) => ErrorKind::UnknownReturnMode,
            ShapeError::Source(_) => ErrorKind::Source,
        }
    }

    pub(crate) fn syntax(index: usize, statement: &str, reason: impl Into<String>) -> Self {
        ShapeError::DeclarationSyntax {
            index,
            statement: statement.trim().to_string(),
            reason: reason.into(),
        }
    }
}
