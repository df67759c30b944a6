//! Loan record data structures

use chrono::{DateTime, Utc};
use payvault_core::Amount;
use serde::{Deserialize, Serialize};

/// Status of a loan application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// Submitted, awaiting an admin decision
    Pending,
    /// Approved by an admin, awaiting disbursal
    Approved,
    /// Rejected by an admin (terminal)
    Rejected,
    /// Funds disbursed (terminal)
    Disbursed,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Rejected => "rejected",
            LoanStatus::Disbursed => "disbursed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(LoanStatus::Pending),
            "approved" => Some(LoanStatus::Approved),
            "rejected" => Some(LoanStatus::Rejected),
            "disbursed" => Some(LoanStatus::Disbursed),
            _ => None,
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A loan application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRecord {
    /// Unique identifier (`LOAN-` prefixed)
    pub id: String,
    pub applicant: String,
    pub amount: Amount,
    /// Applicant's stated purpose
    pub reason: String,
    pub status: LoanStatus,
    /// Admin who actioned the application
    pub reviewer: Option<String>,
    /// Reviewer's note attached at decision time
    pub decision_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub disbursed_at: Option<DateTime<Utc>>,
}

impl LoanRecord {
    /// Create a new pending application
    pub fn new(applicant: impl Into<String>, amount: Amount, reason: impl Into<String>) -> Self {
        let id = format!(
            "LOAN-{}",
            uuid::Uuid::new_v4().to_string()[..8].to_uppercase()
        );
        Self {
            id,
            applicant: applicant.into(),
            amount,
            reason: reason.into(),
            status: LoanStatus::Pending,
            reviewer: None,
            decision_reason: None,
            created_at: Utc::now(),
            approved_at: None,
            disbursed_at: None,
        }
    }
}
