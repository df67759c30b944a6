//! Application context - wires everything together

use payvault_loan::{LoanStore, LoanWorkflow};
use payvault_purchase::PurchaseStore;
use std::path::Path;

/// Application context - wires together the stores under one data
/// directory
pub struct AppContext {
    pub purchases: PurchaseStore,
    pub loans: LoanWorkflow,
}

impl AppContext {
    /// Open (or create) the stores under the data directory
    pub fn new(data_path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let data_path = data_path.as_ref();
        std::fs::create_dir_all(data_path)?;

        let purchases = PurchaseStore::new(data_path.join("purchases.db"))?;
        let loans = LoanWorkflow::new(LoanStore::new(data_path.join("loans.db"))?);

        Ok(Self { purchases, loans })
    }

    /// Fully in-memory context (for testing)
    pub fn in_memory() -> Result<Self, anyhow::Error> {
        Ok(Self {
            purchases: PurchaseStore::in_memory()?,
            loans: LoanWorkflow::new(LoanStore::in_memory()?),
        })
    }
}
