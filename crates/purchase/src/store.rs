//! SQLite storage for purchase records
//!
//! One row per purchase; download events, refund details and the
//! product metadata snapshot are persisted as JSON side columns.
//!
//! The connection sits behind a `Mutex`, and the download increment is
//! a single conditional `UPDATE`, so the entitlement check and the
//! counter bump are one atomic step per record. Records are never
//! deleted.

use crate::entitlement::{deny_reason, DenyReason};
use crate::error::{PurchaseError, PurchaseResult};
use crate::record::{
    DownloadEvent, NewPurchase, PaymentGateway, PaymentMethod, PaymentStatus, PurchaseRecord,
    RefundDetails,
};
use chrono::{DateTime, SecondsFormat, Utc};
use payvault_core::Amount;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

/// SQLite storage for purchase records
pub struct PurchaseStore {
    conn: Mutex<Connection>,
}

/// Fixed-width UTC timestamp so string comparison in SQL matches
/// chronological order
fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> PurchaseResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PurchaseError::Validation(format!("corrupt timestamp {s}: {e}")))
}

impl PurchaseStore {
    /// Create a new store backed by the database at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> PurchaseResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> PurchaseResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> PurchaseResult<()> {
        let conn = self.lock();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS purchases (
                transaction_id TEXT PRIMARY KEY,
                buyer TEXT NOT NULL,
                product TEXT NOT NULL,
                amount TEXT NOT NULL,
                payment_method TEXT NOT NULL,
                payment_status TEXT NOT NULL,
                payment_gateway TEXT NOT NULL,
                gateway_transaction_id TEXT,
                gateway_order_id TEXT,
                download_attempts INTEGER NOT NULL,
                max_downloads INTEGER NOT NULL,
                downloads_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                refund_json TEXT,
                metadata_json TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_purchases_status
             ON purchases(payment_status)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_purchases_buyer
             ON purchases(buyer, product)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_purchases_expires
             ON purchases(expires_at)",
            [],
        )?;

        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("purchase store mutex poisoned")
    }

    /// Create a purchase record with `payment_status = pending`.
    ///
    /// The caller supplies (or generates) the unique transaction id
    /// before this call; a collision is a validation error.
    pub fn create(&self, new: NewPurchase) -> PurchaseResult<PurchaseRecord> {
        if new.buyer.trim().is_empty() {
            return Err(PurchaseError::Validation("buyer is required".to_string()));
        }
        if new.product.trim().is_empty() {
            return Err(PurchaseError::Validation("product is required".to_string()));
        }
        if new.transaction_id.trim().is_empty() {
            return Err(PurchaseError::Validation(
                "transaction id is required".to_string(),
            ));
        }
        if !new.amount.is_positive() {
            return Err(PurchaseError::Validation(format!(
                "amount must be positive, got {}",
                new.amount
            )));
        }
        if new.max_downloads == 0 {
            return Err(PurchaseError::Validation(
                "max downloads must be positive".to_string(),
            ));
        }

        let record = new.build(Utc::now());

        let conn = self.lock();
        let inserted = conn.execute(
            "INSERT INTO purchases
             (transaction_id, buyer, product, amount, payment_method, payment_status,
              payment_gateway, gateway_transaction_id, gateway_order_id,
              download_attempts, max_downloads, downloads_json,
              created_at, expires_at, refund_json, metadata_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                record.transaction_id,
                record.buyer,
                record.product,
                record.amount.value().to_string(),
                record.payment_method.as_str(),
                record.payment_status.as_str(),
                record.payment_gateway.as_str(),
                record.gateway_transaction_id,
                record.gateway_order_id,
                record.download_attempts,
                record.max_downloads,
                serde_json::to_string(&record.downloads)?,
                fmt_ts(record.created_at),
                fmt_ts(record.expires_at),
                None::<String>,
                serde_json::to_string(&record.metadata)?,
            ],
        );

        match inserted {
            Ok(_) => {
                tracing::info!(
                    transaction_id = %record.transaction_id,
                    buyer = %record.buyer,
                    product = %record.product,
                    amount = %record.amount,
                    "purchase created"
                );
                Ok(record)
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(PurchaseError::Validation(format!(
                    "transaction id already exists: {}",
                    record.transaction_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Record the gateway callback for a pending purchase.
    ///
    /// Fails with `InvalidState` once the record is refunded.
    pub fn record_gateway_result(
        &self,
        transaction_id: &str,
        gateway_transaction_id: Option<&str>,
        gateway_order_id: Option<&str>,
        success: bool,
    ) -> PurchaseResult<PurchaseRecord> {
        let conn = self.lock();
        let record = get_in(&conn, transaction_id)?;

        if record.payment_status == PaymentStatus::Refunded {
            return Err(PurchaseError::InvalidState {
                transaction_id: transaction_id.to_string(),
                status: record.payment_status,
            });
        }

        let status = if success {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Failed
        };
        let gateway_txn = gateway_transaction_id
            .map(str::to_string)
            .or(record.gateway_transaction_id);
        let gateway_order = gateway_order_id
            .map(str::to_string)
            .or(record.gateway_order_id);

        conn.execute(
            "UPDATE purchases
             SET payment_status = ?1, gateway_transaction_id = ?2, gateway_order_id = ?3
             WHERE transaction_id = ?4",
            params![status.as_str(), gateway_txn, gateway_order, transaction_id],
        )?;

        tracing::info!(
            transaction_id,
            status = status.as_str(),
            "gateway result recorded"
        );
        get_in(&conn, transaction_id)
    }

    /// Register a fulfilled download at the current time
    pub fn register_download(
        &self,
        transaction_id: &str,
        ip_address: &str,
        user_agent: &str,
    ) -> PurchaseResult<PurchaseRecord> {
        self.register_download_at(transaction_id, ip_address, user_agent, Utc::now())
    }

    /// Register a fulfilled download at a specific time (for tests and
    /// replay).
    ///
    /// The entitlement check and the counter bump are one conditional
    /// `UPDATE`: two concurrent calls with a single remaining download
    /// can never both pass.
    pub fn register_download_at(
        &self,
        transaction_id: &str,
        ip_address: &str,
        user_agent: &str,
        now: DateTime<Utc>,
    ) -> PurchaseResult<PurchaseRecord> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE purchases SET download_attempts = download_attempts + 1
             WHERE transaction_id = ?1
               AND payment_status = 'completed'
               AND download_attempts < max_downloads
               AND expires_at > ?2",
            params![transaction_id, fmt_ts(now)],
        )?;

        if rows == 0 {
            // Nothing incremented; classify why. The transaction rolls
            // back on drop.
            let record = get_in(&tx, transaction_id)?;
            let reason = deny_reason(&record, now).unwrap_or(DenyReason::Expired);
            tracing::debug!(transaction_id, reason = reason.as_str(), "download denied");
            return Err(PurchaseError::EntitlementDenied(reason));
        }

        let downloads_json: String = tx.query_row(
            "SELECT downloads_json FROM purchases WHERE transaction_id = ?1",
            params![transaction_id],
            |row| row.get(0),
        )?;
        let mut downloads: Vec<DownloadEvent> = serde_json::from_str(&downloads_json)?;
        downloads.push(DownloadEvent {
            downloaded_at: now,
            ip_address: ip_address.to_string(),
            user_agent: user_agent.to_string(),
        });
        tx.execute(
            "UPDATE purchases SET downloads_json = ?1 WHERE transaction_id = ?2",
            params![serde_json::to_string(&downloads)?, transaction_id],
        )?;

        let record = get_in(&tx, transaction_id)?;
        tx.commit()?;

        tracing::debug!(
            transaction_id,
            attempts = record.download_attempts,
            "download registered"
        );
        Ok(record)
    }

    /// Refund a completed purchase, attaching the refund sub-record.
    ///
    /// Any starting state other than `completed` yields `InvalidState`
    /// and leaves the record unchanged.
    pub fn refund(
        &self,
        transaction_id: &str,
        amount: Amount,
        reason: &str,
        refund_transaction_id: Option<&str>,
    ) -> PurchaseResult<PurchaseRecord> {
        if !amount.is_positive() {
            return Err(PurchaseError::Validation(format!(
                "refund amount must be positive, got {amount}"
            )));
        }

        let conn = self.lock();
        let record = get_in(&conn, transaction_id)?;

        if record.payment_status != PaymentStatus::Completed {
            return Err(PurchaseError::InvalidState {
                transaction_id: transaction_id.to_string(),
                status: record.payment_status,
            });
        }

        let details = RefundDetails {
            refund_amount: amount,
            refund_date: Utc::now(),
            refund_reason: reason.to_string(),
            refund_transaction_id: refund_transaction_id.map(str::to_string),
        };

        conn.execute(
            "UPDATE purchases SET payment_status = 'refunded', refund_json = ?1
             WHERE transaction_id = ?2",
            params![serde_json::to_string(&details)?, transaction_id],
        )?;

        tracing::info!(transaction_id, amount = %amount, "purchase refunded");
        get_in(&conn, transaction_id)
    }

    /// Fetch a record by transaction id
    pub fn get(&self, transaction_id: &str) -> PurchaseResult<PurchaseRecord> {
        let conn = self.lock();
        get_in(&conn, transaction_id)
    }

    /// List records with a given payment status, newest first
    pub fn list_by_status(&self, status: PaymentStatus) -> PurchaseResult<Vec<PurchaseRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT transaction_id FROM purchases
             WHERE payment_status = ?1 ORDER BY created_at DESC",
        )?;
        let ids: Vec<String> = stmt
            .query_map(params![status.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            records.push(get_in(&conn, &id)?);
        }
        Ok(records)
    }

    /// Count records with a given payment status
    pub fn count_by_status(&self, status: PaymentStatus) -> PurchaseResult<usize> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM purchases WHERE payment_status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// Fetch and decode one record under an already-held connection
fn get_in(conn: &Connection, transaction_id: &str) -> PurchaseResult<PurchaseRecord> {
    let mut stmt = conn.prepare(
        "SELECT transaction_id, buyer, product, amount, payment_method, payment_status,
                payment_gateway, gateway_transaction_id, gateway_order_id,
                download_attempts, max_downloads, downloads_json,
                created_at, expires_at, refund_json, metadata_json
         FROM purchases WHERE transaction_id = ?1",
    )?;

    type RawRow = (
        String,
        String,
        String,
        String,
        String,
        String,
        String,
        Option<String>,
        Option<String>,
        u32,
        u32,
        String,
        String,
        String,
        Option<String>,
        String,
    );

    let raw: RawRow = stmt
        .query_row(params![transaction_id], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
                row.get(9)?,
                row.get(10)?,
                row.get(11)?,
                row.get(12)?,
                row.get(13)?,
                row.get(14)?,
                row.get(15)?,
            ))
        })
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                PurchaseError::NotFound(transaction_id.to_string())
            }
            other => PurchaseError::Database(other),
        })?;

    let corrupt = |what: &str| PurchaseError::Validation(format!("corrupt {what} in row {}", raw.0));

    Ok(PurchaseRecord {
        transaction_id: raw.0.clone(),
        buyer: raw.1,
        product: raw.2,
        amount: Decimal::from_str(&raw.3)
            .ok()
            .and_then(|d| Amount::new(d).ok())
            .ok_or_else(|| corrupt("amount"))?,
        payment_method: PaymentMethod::from_str(&raw.4).ok_or_else(|| corrupt("payment method"))?,
        payment_status: PaymentStatus::from_str(&raw.5).ok_or_else(|| corrupt("payment status"))?,
        payment_gateway: PaymentGateway::from_str(&raw.6)
            .ok_or_else(|| corrupt("payment gateway"))?,
        gateway_transaction_id: raw.7,
        gateway_order_id: raw.8,
        download_attempts: raw.9,
        max_downloads: raw.10,
        downloads: serde_json::from_str(&raw.11)?,
        created_at: parse_ts(&raw.12)?,
        expires_at: parse_ts(&raw.13)?,
        refund_details: raw.14.as_deref().map(serde_json::from_str).transpose()?,
        metadata: serde_json::from_str(&raw.15)?,
    })
}
