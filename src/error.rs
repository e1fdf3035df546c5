//! Error types for allocation.
//!
//! Three outcomes are kept apart:
//! - input-shape problems ([`AllocationError::Validation`]), reported before
//!   any run starts;
//! - broken internal invariants ([`AllocationError::ContractViolation`]);
//! - infeasibility, which is *not* an error but a
//!   [`SearchOutcome`](crate::search::SearchOutcome) variant.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Errors raised by the allocation engine and its adapters.
#[derive(Error, Debug)]
pub enum AllocationError {
    /// Input data failed structural validation.
    #[error("input validation failed: {0}")]
    Validation(ValidationErrors),

    /// A configuration value is missing or out of range.
    #[error("configuration error in '{field}': {message}")]
    Config { field: String, message: String },

    /// An engine invariant was broken (a bug, not bad input).
    #[error("contract violation: {0}")]
    ContractViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("zip operation failed: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl AllocationError {
    pub(crate) fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn contract(message: impl Into<String>) -> Self {
        Self::ContractViolation(message.into())
    }

    /// Whether this error stems from caller-supplied input rather than an
    /// engine bug.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, Self::ContractViolation(_))
    }
}

impl From<ValidationErrors> for AllocationError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Crate result alias.
pub type Result<T> = std::result::Result<T, AllocationError>;
