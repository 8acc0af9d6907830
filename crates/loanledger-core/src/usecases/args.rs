//! Argument decoding for contract entry points
//!
//! All arguments arrive as strings at the transport boundary. These helpers
//! turn them into typed values, failing with `InvalidArgument` before any
//! state is read.

use crate::domain::{LoanId, PartyId};
use crate::error::ContractError;

/// Checks that exactly `expected` arguments were supplied
pub fn expect_args(args: &[String], expected: usize) -> Result<(), ContractError> {
    if args.len() != expected {
        return Err(ContractError::InvalidArgument(format!(
            "Incorrect number of arguments. Expected {expected}"
        )));
    }
    Ok(())
}

/// Checks that between `min` and `max` arguments (inclusive) were supplied
pub fn expect_args_between(args: &[String], min: usize, max: usize) -> Result<(), ContractError> {
    if args.len() < min || args.len() > max {
        return Err(ContractError::InvalidArgument(format!(
            "Incorrect number of arguments. Expected {min} to {max}"
        )));
    }
    Ok(())
}

pub fn parse_loan_id(raw: &str) -> Result<LoanId, ContractError> {
    LoanId::new(raw).map_err(ContractError::from)
}

pub fn parse_party_id(raw: &str) -> Result<PartyId, ContractError> {
    PartyId::new(raw).map_err(ContractError::from)
}

/// Parses a monetary value or rate
///
/// Accepts any finite decimal or exponent notation; the sign is left to the
/// caller. `what` names the value in the error message.
pub fn parse_number(raw: &str, what: &str) -> Result<f64, ContractError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ContractError::InvalidArgument(format!("Invalid {what}: {raw:?}"))),
    }
}

/// Parses a loan term
pub fn parse_duration(raw: &str) -> Result<u32, ContractError> {
    raw.parse::<u32>()
        .map_err(|_| ContractError::InvalidArgument(format!("Invalid loan duration: {raw:?}")))
}
