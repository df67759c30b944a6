//! # PayVault Loan Module
//!
//! Loan applications and their approval workflow.
//!
//! ## Lifecycle
//! Transitions are monotonic: `pending -> {approved, rejected}` and
//! `approved -> disbursed`. No transition skips a state and none
//! reverses; anything else is an `InvalidState` error.

mod error;
mod record;
mod store;
mod workflow;

pub use error::{LoanError, LoanResult};
pub use record::{LoanRecord, LoanStatus};
pub use store::LoanStore;
pub use workflow::LoanWorkflow;
