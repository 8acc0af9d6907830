//! Audit trail recorder
//!
//! Every successful lifecycle transition appends one human-readable entry to
//! the loan's history. Entries are rendered from an [`AuditEvent`] so the
//! wording lives in one place, and the rendering is a pure function of the
//! event: no timestamps or other node-local data, because every replica must
//! produce byte-identical state.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Events that are recorded in a loan's audit trail
#[derive(Debug, Clone, PartialEq)]
pub enum AuditEvent {
    /// A lender approved the loan request
    Approved,
    /// Funds were disbursed and the loan became active
    Disbursed,
    /// A repayment was applied to the remaining balance
    Repayment {
        /// Amount paid, exactly as supplied by the caller
        amount: f64,
    },
    /// The loan was marked as defaulted
    Defaulted,
    /// Collateral was attached to the loan
    CollateralAdded {
        /// Free-form description of the collateral
        description: String,
    },
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEvent::Approved => write!(f, "Loan Approved"),
            AuditEvent::Disbursed => write!(f, "Loan Disbursed"),
            // Six fractional digits, matching records already on the ledger.
            AuditEvent::Repayment { amount } => write!(f, "Repayment of {amount:.6} made"),
            AuditEvent::Defaulted => write!(f, "Loan Defaulted"),
            AuditEvent::CollateralAdded { description } => {
                write!(f, "Collateral added: {description}")
            }
        }
    }
}

/// Append-only, ordered list of audit entries attached to a loan
///
/// The trail exposes no way to remove or reorder entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AuditTrail(Vec<String>);

impl AuditTrail {
    /// Creates an empty trail
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders `event` and pushes it onto the end of the trail
    pub fn append(&mut self, event: &AuditEvent) {
        self.0.push(event.to_string());
    }

    /// Returns the entries in chronological order
    pub fn entries(&self) -> &[String] {
        &self.0
    }

    /// Returns the most recent entry
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Returns the number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no transition has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Loans created before any transition were written with `null` here.
impl<'de> Deserialize<'de> for AuditTrail {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Option::<Vec<String>>::deserialize(deserializer)?;
        Ok(Self(entries.unwrap_or_default()))
    }
}
