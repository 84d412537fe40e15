//! Billing ledger: itemized, immutable bills with a total fixed at insertion.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info, instrument, warn};

use crate::db::{self, Database};
use crate::error::{ClinicError, Result};
use crate::models::bill::MONEY_SCALE;
use crate::models::{Bill, BillCharges, BillStatement};

const BILL_COLUMNS: &str = "id, pid, consultation, medicine, room, other, total, created_at";

/// Permissive conversion of a typed charge amount.
///
/// Blank, unparsable or negative input is treated as zero instead of being
/// rejected. Plain and scientific notation are both accepted, and amounts are
/// rounded half away from zero to [`MONEY_SCALE`] decimal places.
///
/// Numbers that do not fit a `Decimal` (magnitude of about 7.9e28 or more,
/// e.g. `1e30`) are unusable here and also become zero.
pub fn coerce_charge(raw: &str) -> Decimal {
    let raw = raw.trim();
    if raw.is_empty() {
        return Decimal::ZERO;
    }
    match Decimal::from_str(raw).or_else(|_| Decimal::from_scientific(raw)) {
        Ok(amount) if amount >= Decimal::ZERO => {
            amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
        }
        _ => Decimal::ZERO,
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    db: Database,
}

impl Ledger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a bill for an existing patient and return it with its total.
    #[instrument(skip(self, charges))]
    pub async fn add(&self, pid: &str, charges: BillCharges) -> Result<Bill> {
        let pid = pid.trim();
        if pid.is_empty() {
            return Err(ClinicError::validation("Select a patient"));
        }
        // Coercion already guarantees this for raw input; typed callers may not.
        if [charges.consultation, charges.medicine, charges.room, charges.other]
            .iter()
            .any(|amount| amount.is_sign_negative() && !amount.is_zero())
        {
            return Err(ClinicError::validation("Charges cannot be negative"));
        }
        let total = charges.total()?;
        let created_at = db::now_micros();

        let mut tx = self.db.pool().begin().await?;

        if !db::patient_exists(&mut tx, pid).await? {
            warn!("bill for unknown patient");
            return Err(ClinicError::ForeignKeyViolation(pid.to_string()));
        }

        let id = sqlx::query(
            "INSERT INTO bills (
                pid, consultation, medicine, room, other, total, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(pid)
        .bind(charges.consultation.to_string())
        .bind(charges.medicine.to_string())
        .bind(charges.room.to_string())
        .bind(charges.other.to_string())
        .bind(total.to_string())
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db::classify(e, pid))?
        .last_insert_rowid();

        tx.commit().await?;

        info!(bill_id = id, total = %total, "Bill recorded");
        Ok(Bill {
            id,
            pid: pid.to_string(),
            charges,
            total,
            created_at: db::from_micros(created_at)?,
        })
    }

    /// Bills, newest first, optionally for one patient.
    #[instrument(skip(self))]
    pub async fn list(&self, pid_filter: &str) -> Result<Vec<Bill>> {
        let pid = pid_filter.trim();
        let bills = if pid.is_empty() {
            sqlx::query_as::<_, Bill>(&format!(
                "SELECT {BILL_COLUMNS} FROM bills ORDER BY created_at DESC, id DESC"
            ))
            .fetch_all(self.db.pool())
            .await?
        } else {
            sqlx::query_as::<_, Bill>(&format!(
                "SELECT {BILL_COLUMNS} FROM bills WHERE pid = ? ORDER BY created_at DESC, id DESC"
            ))
            .bind(pid)
            .fetch_all(self.db.pool())
            .await?
        };

        debug!(count = bills.len(), "bills listed");
        Ok(bills)
    }

    /// One bill with its patient's name, as needed for export.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<BillStatement> {
        sqlx::query_as::<_, BillStatement>(
            "SELECT b.id, b.pid, b.consultation, b.medicine, b.room, b.other, b.total,
                    b.created_at, p.name AS patient_name
             FROM bills b
             JOIN patients p ON p.pid = b.pid
             WHERE b.id = ?",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| ClinicError::NotFound(format!("bill {}", id)))
    }
}
