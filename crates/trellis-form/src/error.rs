//! Form runtime errors

use trellis_core::CoreError;

/// Errors raised by form instances and their configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    /// Structural access on the field model failed
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A form accessor was called with no surrounding form scope
    #[error("Cannot call method on empty context: no form scope is active on this thread")]
    MissingFormContext,

    /// Configuration could not be loaded or is invalid
    #[error("Invalid configuration: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },
}

impl FormError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this error is a misuse of the API rather than bad input.
    #[must_use]
    pub fn is_programmer_error(&self) -> bool {
        matches!(self, Self::MissingFormContext)
    }
}

/// Result alias for form operations.
pub type Result<T, E = FormError> = std::result::Result<T, E>;
