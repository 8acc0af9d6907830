//! Loanledger Core - Loan lifecycle logic for a replicated ledger
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Loan`, `LoanStatus`, `AuditEvent`, `AuditTrail`
//! - **Use cases** - `LoanContract` (lifecycle operations) and `dispatch` (name-based entry point)
//! - **Port definitions** - `IWorldState`, the key-value store owned by the hosting ledger
//! - **Record store** - `LoanStore`, the field-tagged encoding of loans in the world state
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O. Every
//! invocation follows one explicit pipeline: load the loan through
//! [`store::LoanStore`], validate and apply a transition on the in-memory
//! [`domain::Loan`], then save it back. The world state behind the port is
//! the only state that outlives an invocation.
//!
//! Execution must be deterministic: identical input and prior world state
//! produce byte-identical writes on every replica. Nothing in this crate reads
//! clocks, randomness or configuration while executing a transaction.

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod store;
pub mod usecases;
