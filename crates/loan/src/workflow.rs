//! Loan approval workflow logic
//!
//! Enforces the monotonic lifecycle: `pending -> {approved, rejected}`,
//! `approved -> disbursed`. Terminal states stay terminal.

use crate::error::{LoanError, LoanResult};
use crate::record::{LoanRecord, LoanStatus};
use crate::store::LoanStore;
use chrono::Utc;
use payvault_core::Amount;

/// Loan approval workflow over a store
pub struct LoanWorkflow {
    store: LoanStore,
}

impl LoanWorkflow {
    pub fn new(store: LoanStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &LoanStore {
        &self.store
    }

    /// Submit a new loan application
    pub fn submit(
        &self,
        applicant: &str,
        amount: Amount,
        reason: &str,
    ) -> LoanResult<LoanRecord> {
        if applicant.trim().is_empty() {
            return Err(LoanError::Validation("applicant is required".to_string()));
        }
        if !amount.is_positive() {
            return Err(LoanError::Validation(format!(
                "amount must be positive, got {amount}"
            )));
        }

        let loan = LoanRecord::new(applicant, amount, reason);
        self.store.save(&loan)?;

        tracing::info!(loan_id = %loan.id, applicant, amount = %amount, "loan submitted");
        Ok(loan)
    }

    /// Approve or reject a pending application.
    ///
    /// Stamps `approved_at` on approval. Fails with `InvalidState` when
    /// the loan has already been decided.
    pub fn decide(
        &self,
        loan_id: &str,
        reviewer: &str,
        approve: bool,
        reason: Option<&str>,
    ) -> LoanResult<LoanRecord> {
        let mut loan = self.store.get(loan_id)?;

        if loan.status != LoanStatus::Pending {
            return Err(LoanError::InvalidState {
                id: loan_id.to_string(),
                status: loan.status,
            });
        }

        if approve {
            loan.status = LoanStatus::Approved;
            loan.approved_at = Some(Utc::now());
        } else {
            loan.status = LoanStatus::Rejected;
        }
        loan.reviewer = Some(reviewer.to_string());
        loan.decision_reason = reason.map(str::to_string);
        self.store.save(&loan)?;

        tracing::info!(loan_id, reviewer, status = loan.status.as_str(), "loan decided");
        Ok(loan)
    }

    /// Disburse an approved loan, stamping `disbursed_at`
    pub fn disburse(&self, loan_id: &str) -> LoanResult<LoanRecord> {
        let mut loan = self.store.get(loan_id)?;

        if loan.status != LoanStatus::Approved {
            return Err(LoanError::InvalidState {
                id: loan_id.to_string(),
                status: loan.status,
            });
        }

        loan.status = LoanStatus::Disbursed;
        loan.disbursed_at = Some(Utc::now());
        self.store.save(&loan)?;

        tracing::info!(loan_id, "loan disbursed");
        Ok(loan)
    }

    /// List pending applications
    pub fn list_pending(&self) -> LoanResult<Vec<LoanRecord>> {
        self.store.list_by_status(LoanStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn workflow() -> LoanWorkflow {
        LoanWorkflow::new(LoanStore::in_memory().unwrap())
    }

    fn amount(v: Decimal) -> Amount {
        Amount::new(v).unwrap()
    }

    #[test]
    fn test_submit_creates_pending_loan() {
        let wf = workflow();
        let loan = wf.submit("USER-001", amount(dec!(50000)), "car repair").unwrap();

        assert_eq!(loan.status, LoanStatus::Pending);
        assert_eq!(wf.list_pending().unwrap().len(), 1);
    }

    #[test]
    fn test_submit_validation() {
        let wf = workflow();

        assert!(matches!(
            wf.submit("", amount(dec!(1000)), "x"),
            Err(LoanError::Validation(_))
        ));
        assert!(matches!(
            wf.submit("USER-001", Amount::ZERO, "x"),
            Err(LoanError::Validation(_))
        ));
    }

    #[test]
    fn test_approve_stamps_timestamp() {
        let wf = workflow();
        let loan = wf.submit("USER-001", amount(dec!(50000)), "car repair").unwrap();

        let loan = wf.decide(&loan.id, "admin-7", true, Some("income verified")).unwrap();

        assert_eq!(loan.status, LoanStatus::Approved);
        assert_eq!(loan.reviewer.as_deref(), Some("admin-7"));
        assert_eq!(loan.decision_reason.as_deref(), Some("income verified"));
        assert!(loan.approved_at.is_some());
        assert!(loan.disbursed_at.is_none());
    }

    #[test]
    fn test_reject_has_no_approved_timestamp() {
        let wf = workflow();
        let loan = wf.submit("USER-001", amount(dec!(50000)), "car repair").unwrap();

        let loan = wf.decide(&loan.id, "admin-7", false, Some("insufficient income")).unwrap();

        assert_eq!(loan.status, LoanStatus::Rejected);
        assert!(loan.approved_at.is_none());
    }

    #[test]
    fn test_decide_twice_rejected() {
        let wf = workflow();
        let loan = wf.submit("USER-001", amount(dec!(50000)), "car repair").unwrap();
        wf.decide(&loan.id, "admin-7", true, None).unwrap();

        let result = wf.decide(&loan.id, "admin-8", false, None);
        assert!(matches!(
            result,
            Err(LoanError::InvalidState {
                status: LoanStatus::Approved,
                ..
            })
        ));
    }

    #[test]
    fn test_disburse_requires_approval() {
        let wf = workflow();
        let loan = wf.submit("USER-001", amount(dec!(50000)), "car repair").unwrap();

        // Pending loans cannot be disbursed
        assert!(matches!(
            wf.disburse(&loan.id),
            Err(LoanError::InvalidState {
                status: LoanStatus::Pending,
                ..
            })
        ));

        // Rejected loans cannot be disbursed either
        wf.decide(&loan.id, "admin-7", false, None).unwrap();
        assert!(matches!(
            wf.disburse(&loan.id),
            Err(LoanError::InvalidState {
                status: LoanStatus::Rejected,
                ..
            })
        ));
    }

    #[test]
    fn test_disburse_approved_loan() {
        let wf = workflow();
        let loan = wf.submit("USER-001", amount(dec!(50000)), "car repair").unwrap();
        wf.decide(&loan.id, "admin-7", true, None).unwrap();

        let loan = wf.disburse(&loan.id).unwrap();
        assert_eq!(loan.status, LoanStatus::Disbursed);
        assert!(loan.disbursed_at.is_some());

        // Terminal: cannot disburse again
        assert!(matches!(
            wf.disburse(&loan.id),
            Err(LoanError::InvalidState {
                status: LoanStatus::Disbursed,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_loan() {
        let wf = workflow();
        assert!(matches!(
            wf.decide("LOAN-MISSING", "admin-7", true, None),
            Err(LoanError::NotFound(_))
        ));
    }
}
