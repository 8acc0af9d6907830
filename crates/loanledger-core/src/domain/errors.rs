//! Domain error types
//!
//! This module defines error types raised by the domain model itself:
//! malformed identifiers, out-of-range values, and illegal status transitions.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid identifier (loan, borrower or lender)
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Invalid monetary value or term
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// Operation is not permitted in the current state
    #[error("{operation} not allowed while loan is {status}")]
    NotAllowed {
        /// The attempted operation
        operation: String,
        /// The current state
        status: String,
    },
}
