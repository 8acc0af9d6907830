//! Domain entities and business logic
//!
//! This module contains the core domain types for Loanledger:
//! - Newtypes for caller-supplied identifiers
//! - The Loan entity and its lifecycle state machine
//! - The audit trail recorder
//! - Domain-specific error types

pub mod audit;
pub mod errors;
pub mod loan;
pub mod newtypes;

// Re-export commonly used types
pub use audit::{AuditEvent, AuditTrail};
pub use errors::DomainError;
pub use loan::{Loan, LoanStatus};
pub use newtypes::*;
