//! SQLite storage for loan records

use crate::error::{LoanError, LoanResult};
use crate::record::{LoanRecord, LoanStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use payvault_core::Amount;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

/// SQLite storage for loan records
pub struct LoanStore {
    conn: Mutex<Connection>,
}

fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> LoanResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LoanError::Validation(format!("corrupt timestamp {s}: {e}")))
}

impl LoanStore {
    /// Create a new store with the given database path
    pub fn new<P: AsRef<Path>>(path: P) -> LoanResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> LoanResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> LoanResult<()> {
        let conn = self.lock();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS loans (
                id TEXT PRIMARY KEY,
                applicant TEXT NOT NULL,
                amount TEXT NOT NULL,
                reason TEXT NOT NULL,
                status TEXT NOT NULL,
                reviewer TEXT,
                decision_reason TEXT,
                created_at TEXT NOT NULL,
                approved_at TEXT,
                disbursed_at TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_loans_status ON loans(status)",
            [],
        )?;

        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("loan store mutex poisoned")
    }

    /// Insert or update a loan record
    pub fn save(&self, loan: &LoanRecord) -> LoanResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR REPLACE INTO loans
             (id, applicant, amount, reason, status, reviewer, decision_reason,
              created_at, approved_at, disbursed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                loan.id,
                loan.applicant,
                loan.amount.value().to_string(),
                loan.reason,
                loan.status.as_str(),
                loan.reviewer,
                loan.decision_reason,
                fmt_ts(loan.created_at),
                loan.approved_at.map(fmt_ts),
                loan.disbursed_at.map(fmt_ts),
            ],
        )?;
        Ok(())
    }

    /// Get a loan record by ID
    pub fn get(&self, id: &str) -> LoanResult<LoanRecord> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, applicant, amount, reason, status, reviewer, decision_reason,
                    created_at, approved_at, disbursed_at
             FROM loans WHERE id = ?1",
        )?;

        let raw = stmt
            .query_row(params![id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, Option<String>>(9)?,
                ))
            })
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => LoanError::NotFound(id.to_string()),
                other => LoanError::Database(other),
            })?;

        let amount = Decimal::from_str(&raw.2)
            .ok()
            .and_then(|d| Amount::new(d).ok())
            .ok_or_else(|| LoanError::Validation(format!("corrupt amount in loan {}", raw.0)))?;
        let status = LoanStatus::from_str(&raw.4)
            .ok_or_else(|| LoanError::Validation(format!("corrupt status in loan {}", raw.0)))?;

        Ok(LoanRecord {
            id: raw.0,
            applicant: raw.1,
            amount,
            reason: raw.3,
            status,
            reviewer: raw.5,
            decision_reason: raw.6,
            created_at: parse_ts(&raw.7)?,
            approved_at: raw.8.as_deref().map(parse_ts).transpose()?,
            disbursed_at: raw.9.as_deref().map(parse_ts).transpose()?,
        })
    }

    /// List loans with a specific status, newest first
    pub fn list_by_status(&self, status: LoanStatus) -> LoanResult<Vec<LoanRecord>> {
        let ids: Vec<String> = {
            let conn = self.lock();
            let mut stmt = conn.prepare(
                "SELECT id FROM loans WHERE status = ?1 ORDER BY created_at DESC",
            )?;
            let ids = stmt
                .query_map(params![status.as_str()], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };

        let mut loans = Vec::with_capacity(ids.len());
        for id in ids {
            loans.push(self.get(&id)?);
        }
        Ok(loans)
    }

    /// Count loans by status
    pub fn count_by_status(&self, status: LoanStatus) -> LoanResult<usize> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM loans WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_loan() -> LoanRecord {
        LoanRecord::new("USER-001", Amount::new(dec!(50000)).unwrap(), "car repair")
    }

    #[test]
    fn test_save_and_get() {
        let store = LoanStore::in_memory().unwrap();
        let loan = test_loan();

        store.save(&loan).unwrap();
        let retrieved = store.get(&loan.id).unwrap();

        assert_eq!(retrieved.id, loan.id);
        assert_eq!(retrieved.applicant, "USER-001");
        assert_eq!(retrieved.amount.value(), dec!(50000));
        assert_eq!(retrieved.status, LoanStatus::Pending);
    }

    #[test]
    fn test_get_not_found() {
        let store = LoanStore::in_memory().unwrap();
        let result = store.get("LOAN-MISSING");
        assert!(matches!(result, Err(LoanError::NotFound(_))));
    }

    #[test]
    fn test_list_by_status() {
        let store = LoanStore::in_memory().unwrap();
        for _ in 0..3 {
            store.save(&test_loan()).unwrap();
        }

        assert_eq!(store.list_by_status(LoanStatus::Pending).unwrap().len(), 3);
        assert_eq!(store.list_by_status(LoanStatus::Approved).unwrap().len(), 0);
        assert_eq!(store.count_by_status(LoanStatus::Pending).unwrap(), 3);
    }

    #[test]
    fn test_on_disk_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loans.db");
        let loan = test_loan();

        {
            let store = LoanStore::new(&path).unwrap();
            store.save(&loan).unwrap();
        }

        let store = LoanStore::new(&path).unwrap();
        assert_eq!(store.get(&loan.id).unwrap().applicant, "USER-001");
    }
}
