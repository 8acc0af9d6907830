//! Contract error types
//!
//! Every failure surfaced to the caller of a contract operation is one of
//! the kinds below. Failures are local to one invocation: nothing is retried
//! and nothing is written.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::DomainError;

/// Errors returned by contract operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// Malformed numeric input, empty identifier, or wrong argument count
    #[error("{0}")]
    InvalidArgument(String),

    /// A loan with this identifier already exists
    #[error("the loan with ID {0} already exists")]
    AlreadyExists(String),

    /// No loan is stored under this identifier
    #[error("loan with ID {0} not found")]
    NotFound(String),

    /// The operation is illegal for the loan's current status
    #[error("{0}")]
    InvalidState(String),

    /// Stored bytes could not be decoded into a loan
    #[error("corrupt record for loan {loan_id}: {reason}")]
    CorruptRecord {
        /// Key of the offending record
        loan_id: String,
        /// Decoder error
        reason: String,
    },

    /// The world state could not be read or written
    #[error("world state unavailable: {0}")]
    StoreUnavailable(String),

    /// The requested entry point does not exist
    #[error("invalid function name: {0}")]
    InvalidOperation(String),
}

/// Machine-readable failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidArgument,
    AlreadyExists,
    NotFound,
    InvalidState,
    CorruptRecord,
    StoreUnavailable,
    InvalidOperation,
}

impl ErrorKind {
    /// Returns the stable code for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::InvalidState => "InvalidState",
            ErrorKind::CorruptRecord => "CorruptRecord",
            ErrorKind::StoreUnavailable => "StoreUnavailable",
            ErrorKind::InvalidOperation => "InvalidOperation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ContractError {
    /// Returns the failure category
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContractError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ContractError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            ContractError::NotFound(_) => ErrorKind::NotFound,
            ContractError::InvalidState(_) => ErrorKind::InvalidState,
            ContractError::CorruptRecord { .. } => ErrorKind::CorruptRecord,
            ContractError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            ContractError::InvalidOperation(_) => ErrorKind::InvalidOperation,
        }
    }
}

impl From<DomainError> for ContractError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidId(_) | DomainError::InvalidValue(_) => {
                ContractError::InvalidArgument(e.to_string())
            }
            DomainError::InvalidState { .. } | DomainError::NotAllowed { .. } => {
                ContractError::InvalidState(e.to_string())
            }
        }
    }
}
