//! Use cases (interactors) for Loanledger
//!
//! Use cases orchestrate domain entities and the world-state port. They are
//! thin coordinators: business rules live on [`crate::domain::Loan`] and
//! all I/O goes through [`crate::store::LoanStore`].
//!
//! ## Use Cases
//!
//! - [`LoanContract`] - Typed lifecycle operations on a single loan
//! - [`Operation`] - Name-based entry point taking string arguments

pub mod args;
pub mod dispatch;
pub mod loan_contract;

pub use dispatch::Operation;
pub use loan_contract::LoanContract;
