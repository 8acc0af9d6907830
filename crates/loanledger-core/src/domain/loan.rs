//! Loan domain entity
//!
//! This module defines the Loan entity, the only record this system persists,
//! together with the lifecycle state machine that guards every mutation.
//!
//! ## State Machine
//!
//! ```text
//!  ┌─────────┐ approve ┌──────────┐ disburse ┌────────┐  repay (balance ≤ 0)  ┌────────┐
//!  │ Pending │ ──────► │ Approved │ ───────► │ Active │ ────────────────────► │ Repaid │
//!  └─────────┘         └──────────┘          └────────┘                       └────────┘
//!                                                 │
//!                                                 │ mark defaulted        ┌───────────┐
//!                                                 └─────────────────────► │ Defaulted │
//!                                                                         └───────────┘
//! ```
//!
//! `Repaid` and `Defaulted` are terminal. Status never moves backward.
//!
//! Every transition method checks its precondition before touching any field,
//! so a rejected call leaves the loan exactly as it was.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::audit::{AuditEvent, AuditTrail};
use super::errors::DomainError;
use super::newtypes::{LoanId, PartyId};

// ============================================================================
// LoanStatus
// ============================================================================

/// Lifecycle state of a loan
///
/// Serialized as the bare variant name (`"Pending"`, `"Approved"`, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    /// Requested by a borrower, awaiting a lender
    #[default]
    Pending,
    /// Approved by a lender, awaiting disbursement
    Approved,
    /// Funds disbursed, repayments accepted
    Active,
    /// Balance fully repaid (terminal)
    Repaid,
    /// Marked as defaulted (terminal)
    Defaulted,
}

impl LoanStatus {
    /// Returns the state name
    pub fn name(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "Pending",
            LoanStatus::Approved => "Approved",
            LoanStatus::Active => "Active",
            LoanStatus::Repaid => "Repaid",
            LoanStatus::Defaulted => "Defaulted",
        }
    }

    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Repaid | LoanStatus::Defaulted)
    }

    /// Returns true if collateral may still be attached
    pub fn accepts_collateral(&self) -> bool {
        matches!(self, LoanStatus::Pending | LoanStatus::Approved)
    }

    /// Checks if a state transition is valid
    ///
    /// Valid transitions:
    /// - Pending -> Approved
    /// - Approved -> Active
    /// - Active -> Repaid, Defaulted
    pub fn can_transition_to(&self, target: LoanStatus) -> bool {
        matches!(
            (self, target),
            (LoanStatus::Pending, LoanStatus::Approved)
                | (LoanStatus::Approved, LoanStatus::Active)
                | (LoanStatus::Active, LoanStatus::Repaid)
                | (LoanStatus::Active, LoanStatus::Defaulted)
        )
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Loan
// ============================================================================

/// A lending agreement recorded in the world state
///
/// Field names on the wire are camelCase (`loanId`, `remainingBalance`, ...);
/// that encoding is the compatibility contract with already-stored records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    /// Caller-assigned identifier, also the store key
    loan_id: LoanId,
    /// Borrower that requested the loan
    borrower_id: PartyId,
    /// Lender, set exactly once at approval (stored as `""` before that)
    #[serde(with = "lender_field")]
    lender_id: Option<PartyId>,
    /// Principal requested
    amount: f64,
    /// Informational rate; not used in any balance computation
    interest_rate: f64,
    /// Opaque term length
    duration: u32,
    /// Lifecycle state
    status: LoanStatus,
    /// Set at disbursement, empty before
    disbursement_date: String,
    /// Reserved for interest accrual; never computed
    repayment_due: f64,
    /// Outstanding principal, floored at zero by repayment
    remaining_balance: f64,
    /// Collateral description, empty if none
    collateral: String,
    /// True only once the loan is marked as defaulted
    defaulted: bool,
    /// One entry per successful transition
    audit_history: AuditTrail,
}

impl Loan {
    /// Creates a new loan request in `Pending` state
    ///
    /// `remaining_balance` starts equal to `amount`. No audit entry is
    /// recorded: creation is not a transition.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidValue` if `amount` or `interest_rate` is
    /// negative or not finite, or if `duration` is zero.
    pub fn request(
        loan_id: LoanId,
        borrower_id: PartyId,
        amount: f64,
        duration: u32,
        interest_rate: f64,
    ) -> Result<Self, DomainError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(DomainError::InvalidValue(format!(
                "loan amount must be a non-negative number, got {amount}"
            )));
        }
        if !interest_rate.is_finite() || interest_rate < 0.0 {
            return Err(DomainError::InvalidValue(format!(
                "interest rate must be a non-negative number, got {interest_rate}"
            )));
        }
        if duration == 0 {
            return Err(DomainError::InvalidValue(
                "loan duration must be positive".to_string(),
            ));
        }

        Ok(Self {
            loan_id,
            borrower_id,
            lender_id: None,
            amount,
            interest_rate,
            duration,
            status: LoanStatus::Pending,
            disbursement_date: String::new(),
            repayment_due: 0.0,
            remaining_balance: amount,
            collateral: String::new(),
            defaulted: false,
            audit_history: AuditTrail::new(),
        })
    }

    // --- Getters ---

    /// Returns the loan identifier
    pub fn loan_id(&self) -> &LoanId {
        &self.loan_id
    }

    /// Returns the borrower identifier
    pub fn borrower_id(&self) -> &PartyId {
        &self.borrower_id
    }

    /// Returns the lender identifier, if the loan has been approved
    pub fn lender_id(&self) -> Option<&PartyId> {
        self.lender_id.as_ref()
    }

    /// Returns the principal
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Returns the interest rate
    pub fn interest_rate(&self) -> f64 {
        self.interest_rate
    }

    /// Returns the term length
    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Returns the current status
    pub fn status(&self) -> LoanStatus {
        self.status
    }

    /// Returns the disbursement date (empty until disbursed)
    pub fn disbursement_date(&self) -> &str {
        &self.disbursement_date
    }

    /// Returns the reserved repayment-due value
    pub fn repayment_due(&self) -> f64 {
        self.repayment_due
    }

    /// Returns the outstanding balance
    pub fn remaining_balance(&self) -> f64 {
        self.remaining_balance
    }

    /// Returns the collateral description (empty if none)
    pub fn collateral(&self) -> &str {
        &self.collateral
    }

    /// Returns true if the loan has been marked as defaulted
    pub fn is_defaulted(&self) -> bool {
        self.defaulted
    }

    /// Returns the audit trail
    pub fn audit_history(&self) -> &AuditTrail {
        &self.audit_history
    }
}

// ============================================================================
// Lifecycle transitions
// ============================================================================

impl Loan {
    fn check_transition(&self, target: LoanStatus) -> Result<(), DomainError> {
        if self.status.can_transition_to(target) {
            Ok(())
        } else {
            Err(DomainError::InvalidState {
                from: self.status.name().to_string(),
                to: target.name().to_string(),
            })
        }
    }

    fn record(&mut self, event: AuditEvent) {
        self.audit_history.append(&event);
    }

    /// Approves a pending loan on behalf of `lender_id`
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` unless the loan is `Pending`.
    pub fn approve(&mut self, lender_id: PartyId) -> Result<(), DomainError> {
        self.check_transition(LoanStatus::Approved)?;

        self.lender_id = Some(lender_id);
        self.status = LoanStatus::Approved;
        self.record(AuditEvent::Approved);
        Ok(())
    }

    /// Disburses an approved loan, making it active
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` unless the loan is `Approved`.
    pub fn disburse(&mut self, disbursement_date: impl Into<String>) -> Result<(), DomainError> {
        self.check_transition(LoanStatus::Active)?;

        self.disbursement_date = disbursement_date.into();
        self.status = LoanStatus::Active;
        self.record(AuditEvent::Disbursed);
        Ok(())
    }

    /// Applies a repayment to an active loan
    ///
    /// The amount is taken at face value: zero leaves the balance unchanged
    /// and a negative amount increases it. When the balance reaches zero or
    /// below it is clamped to zero and the loan becomes `Repaid`; any excess
    /// is simply absorbed.
    ///
    /// Returns the resulting status.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidValue` if `amount` or the resulting
    /// balance is not finite, or `DomainError::InvalidState` unless the loan
    /// is `Active`.
    pub fn repay(&mut self, amount: f64) -> Result<LoanStatus, DomainError> {
        if !amount.is_finite() {
            return Err(DomainError::InvalidValue(format!(
                "repayment amount must be a finite number, got {amount}"
            )));
        }
        if self.status != LoanStatus::Active {
            return Err(DomainError::NotAllowed {
                operation: "Repayment".to_string(),
                status: self.status.name().to_string(),
            });
        }

        let balance = self.remaining_balance - amount;
        if !balance.is_finite() {
            return Err(DomainError::InvalidValue(format!(
                "repayment of {amount} leaves a balance out of range"
            )));
        }
        if balance <= 0.0 {
            self.remaining_balance = 0.0;
            self.status = LoanStatus::Repaid;
        } else {
            self.remaining_balance = balance;
        }
        self.record(AuditEvent::Repayment { amount });
        Ok(self.status)
    }

    /// Marks an active loan as defaulted
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` unless the loan is `Active`.
    pub fn mark_defaulted(&mut self) -> Result<(), DomainError> {
        self.check_transition(LoanStatus::Defaulted)?;

        self.defaulted = true;
        self.status = LoanStatus::Defaulted;
        self.record(AuditEvent::Defaulted);
        Ok(())
    }

    /// Attaches (or replaces) the collateral description
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotAllowed` once the loan has been disbursed.
    pub fn add_collateral(&mut self, description: impl Into<String>) -> Result<(), DomainError> {
        if !self.status.accepts_collateral() {
            return Err(DomainError::NotAllowed {
                operation: "AddCollateral".to_string(),
                status: self.status.name().to_string(),
            });
        }

        let description = description.into();
        self.collateral = description.clone();
        self.record(AuditEvent::CollateralAdded { description });
        Ok(())
    }
}

/// Wire mapping for the lender: `""` means "not approved yet"
mod lender_field {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::domain::newtypes::PartyId;

    pub fn serialize<S>(value: &Option<PartyId>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value.as_ref().map(PartyId::as_str).unwrap_or(""))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<PartyId>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            Ok(None)
        } else {
            PartyId::new(raw).map(Some).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_loan(amount: f64) -> Loan {
        Loan::request(
            LoanId::new("L1").unwrap(),
            PartyId::new("B1").unwrap(),
            amount,
            12,
            0.0,
        )
        .unwrap()
    }

    fn active_loan(amount: f64) -> Loan {
        let mut loan = pending_loan(amount);
        loan.approve(PartyId::new("LEN1").unwrap()).unwrap();
        loan.disburse("2024-01-01").unwrap();
        loan
    }

    // --- Creation ---

    #[test]
    fn test_request_starts_pending_with_full_balance() {
        let loan = pending_loan(5000.0);
        assert_eq!(loan.status(), LoanStatus::Pending);
        assert_eq!(loan.remaining_balance(), 5000.0);
        assert!(loan.lender_id().is_none());
        assert!(loan.audit_history().is_empty());
        assert!(!loan.is_defaulted());
        assert_eq!(loan.repayment_due(), 0.0);
    }

    #[test]
    fn test_request_rejects_bad_values() {
        let id = || LoanId::new("L1").unwrap();
        let borrower = || PartyId::new("B1").unwrap();

        assert!(Loan::request(id(), borrower(), -1.0, 12, 0.0).is_err());
        assert!(Loan::request(id(), borrower(), f64::NAN, 12, 0.0).is_err());
        assert!(Loan::request(id(), borrower(), f64::INFINITY, 12, 0.0).is_err());
        assert!(Loan::request(id(), borrower(), 100.0, 0, 0.0).is_err());
        assert!(Loan::request(id(), borrower(), 100.0, 12, -0.5).is_err());
        assert!(Loan::request(id(), borrower(), 0.0, 1, 0.0).is_ok());
    }

    // --- Transition table ---

    #[test]
    fn test_can_transition_to() {
        use LoanStatus::*;
        let all = [Pending, Approved, Active, Repaid, Defaulted];
        let allowed = [
            (Pending, Approved),
            (Approved, Active),
            (Active, Repaid),
            (Active, Defaulted),
        ];

        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(LoanStatus::Repaid.is_terminal());
        assert!(LoanStatus::Defaulted.is_terminal());
        assert!(!LoanStatus::Active.is_terminal());
        assert!(!LoanStatus::Pending.is_terminal());
    }

    // --- Approve / disburse ---

    #[test]
    fn test_approve_sets_lender_once() {
        let mut loan = pending_loan(1000.0);
        loan.approve(PartyId::new("LEN1").unwrap()).unwrap();

        assert_eq!(loan.status(), LoanStatus::Approved);
        assert_eq!(loan.lender_id().map(PartyId::as_str), Some("LEN1"));
        assert_eq!(loan.audit_history().entries(), &["Loan Approved"]);

        let err = loan.approve(PartyId::new("LEN2").unwrap()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
        assert_eq!(loan.lender_id().map(PartyId::as_str), Some("LEN1"));
        assert_eq!(loan.audit_history().len(), 1);
    }

    #[test]
    fn test_disburse_requires_approval() {
        let mut loan = pending_loan(1000.0);
        let before = loan.clone();

        assert!(loan.disburse("2024-01-01").is_err());
        assert_eq!(loan, before);

        loan.approve(PartyId::new("LEN1").unwrap()).unwrap();
        loan.disburse("2024-01-01").unwrap();
        assert_eq!(loan.status(), LoanStatus::Active);
        assert_eq!(loan.disbursement_date(), "2024-01-01");
    }

    // --- Repayment ---

    #[test]
    fn test_partial_then_over_repayment_clamps_to_zero() {
        let mut loan = active_loan(1000.0);

        assert_eq!(loan.repay(400.0).unwrap(), LoanStatus::Active);
        assert_eq!(loan.remaining_balance(), 600.0);

        assert_eq!(loan.repay(700.0).unwrap(), LoanStatus::Repaid);
        assert_eq!(loan.remaining_balance(), 0.0);
    }

    #[test]
    fn test_zero_repayment_is_recorded_without_effect() {
        let mut loan = active_loan(1000.0);
        assert_eq!(loan.repay(0.0).unwrap(), LoanStatus::Active);
        assert_eq!(loan.remaining_balance(), 1000.0);
        assert_eq!(loan.audit_history().last(), Some("Repayment of 0.000000 made"));
    }

    #[test]
    fn test_negative_repayment_raises_balance() {
        let mut loan = active_loan(1000.0);
        assert_eq!(loan.repay(-50.0).unwrap(), LoanStatus::Active);
        assert_eq!(loan.remaining_balance(), 1050.0);
        assert_eq!(
            loan.audit_history().last(),
            Some("Repayment of -50.000000 made")
        );
    }

    #[test]
    fn test_repay_rejected_outside_active() {
        let mut loan = pending_loan(1000.0);
        assert!(matches!(
            loan.repay(10.0),
            Err(DomainError::NotAllowed { .. })
        ));

        let mut loan = active_loan(100.0);
        loan.repay(100.0).unwrap();
        assert!(loan.repay(1.0).is_err());
        assert_eq!(loan.audit_history().len(), 3);
    }

    #[test]
    fn test_repay_rejects_non_finite_amount() {
        let mut loan = active_loan(100.0);
        assert!(matches!(
            loan.repay(f64::NAN),
            Err(DomainError::InvalidValue(_))
        ));
        assert_eq!(loan.remaining_balance(), 100.0);
    }

    #[test]
    fn test_repay_rejects_overflowing_balance() {
        let mut loan = active_loan(1e308);
        let before = loan.clone();

        assert!(matches!(
            loan.repay(-1e308),
            Err(DomainError::InvalidValue(_))
        ));
        assert_eq!(loan, before);
        assert_eq!(loan.status(), LoanStatus::Active);
    }

    #[test]
    fn test_non_finite_balance_is_never_encoded() {
        let mut loan = active_loan(100.0);
        loan.remaining_balance = f64::INFINITY;

        let err = crate::store::encode(&loan).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::CorruptRecord);
        assert!(err.to_string().contains("remainingBalance"));
    }

    // --- Default ---

    #[test]
    fn test_mark_defaulted() {
        let mut loan = active_loan(1000.0);
        loan.mark_defaulted().unwrap();

        assert_eq!(loan.status(), LoanStatus::Defaulted);
        assert!(loan.is_defaulted());
        assert_eq!(loan.audit_history().last(), Some("Loan Defaulted"));

        assert!(loan.mark_defaulted().is_err());
        assert!(loan.repay(10.0).is_err());
    }

    #[test]
    fn test_mark_defaulted_requires_active() {
        let mut loan = pending_loan(1000.0);
        assert!(loan.mark_defaulted().is_err());
        assert!(!loan.is_defaulted());
    }

    // --- Collateral ---

    #[test]
    fn test_collateral_allowed_until_disbursed() {
        let mut loan = pending_loan(1000.0);
        loan.add_collateral("Car title").unwrap();
        loan.approve(PartyId::new("LEN1").unwrap()).unwrap();
        loan.add_collateral("House deed").unwrap();
        assert_eq!(loan.collateral(), "House deed");

        loan.disburse("2024-01-01").unwrap();
        let err = loan.add_collateral("Boat").unwrap_err();
        assert!(matches!(err, DomainError::NotAllowed { .. }));
        assert_eq!(loan.collateral(), "House deed");
        assert_eq!(
            loan.audit_history().entries(),
            &[
                "Collateral added: Car title",
                "Loan Approved",
                "Collateral added: House deed",
                "Loan Disbursed",
            ]
        );
    }

    // --- Serialization ---

    #[test]
    fn test_wire_field_names() {
        let loan = pending_loan(5000.0);
        let value = serde_json::to_value(&loan).unwrap();

        for field in [
            "loanId",
            "borrowerId",
            "lenderId",
            "amount",
            "interestRate",
            "duration",
            "status",
            "disbursementDate",
            "repaymentDue",
            "remainingBalance",
            "collateral",
            "defaulted",
            "auditHistory",
        ] {
            assert!(value.get(field).is_some(), "missing field {field}");
        }
        assert_eq!(value["status"], "Pending");
        assert_eq!(value["lenderId"], "");
        assert_eq!(value["auditHistory"], serde_json::json!([]));
    }

    #[test]
    fn test_lender_round_trips_through_wire_form() {
        let mut loan = pending_loan(5000.0);
        loan.approve(PartyId::new("LEN1").unwrap()).unwrap();

        let json = serde_json::to_string(&loan).unwrap();
        let back: Loan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, loan);
        assert_eq!(back.lender_id().map(PartyId::as_str), Some("LEN1"));
    }
}
