//! Core error type
//!
//! Structural access errors are raised before any mutation is applied, so a
//! failed operation never leaves a partially updated snapshot behind.

use crate::field::FieldId;

/// Errors raised by the pure field model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Index was out of bounds for a positional operation.
    #[error("{operation} failed: index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// The invalid index
        index: usize,
        /// The current length of the collection
        len: usize,
        /// The operation that failed
        operation: &'static str,
    },

    /// An index addressed no element.
    #[error("Invalid element access: no element at index {index} (length {len})")]
    InvalidElementAccess {
        /// The index that had no element
        index: usize,
        /// The current length of the collection
        len: usize,
    },

    /// An array operation was applied to a field whose value is not an item list.
    #[error("Field {field} does not hold an item list")]
    NotAnArray {
        /// The offending field
        field: FieldId,
    },
}

impl CoreError {
    /// Create an out-of-bounds error for `operation`.
    pub fn out_of_bounds(operation: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds {
            index,
            len,
            operation,
        }
    }

    /// Create an invalid element access error.
    pub fn invalid_access(index: usize, len: usize) -> Self {
        Self::InvalidElementAccess { index, len }
    }

    /// Create a not-an-array error.
    pub fn not_an_array(field: FieldId) -> Self {
        Self::NotAnArray { field }
    }

    /// Whether this error describes a bad index supplied by the caller.
    #[must_use]
    pub fn is_index_error(&self) -> bool {
        matches!(
            self,
            Self::IndexOutOfBounds { .. } | Self::InvalidElementAccess { .. }
        )
    }
}

/// Result alias for core operations.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
