use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::db;
use crate::error::{ClinicError, Result};
use crate::ledger::coerce_charge;

/// The four itemized charge components of a visit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillCharges {
    pub consultation: Decimal,
    pub medicine: Decimal,
    pub room: Decimal,
    pub other: Decimal,
}

impl BillCharges {
    pub fn new(consultation: Decimal, medicine: Decimal, room: Decimal, other: Decimal) -> Self {
        Self {
            consultation,
            medicine,
            room,
            other,
        }
    }

    /// Build charges from raw entry text; absent or unusable amounts become zero.
    pub fn from_raw(
        consultation: Option<&str>,
        medicine: Option<&str>,
        room: Option<&str>,
        other: Option<&str>,
    ) -> Self {
        let amount = |raw: Option<&str>| raw.map(coerce_charge).unwrap_or(Decimal::ZERO);
        Self::new(amount(consultation), amount(medicine), amount(room), amount(other))
    }

    /// Exact sum of the four components.
    ///
    /// The sum is taken in whole cents, so a total that cannot be stored
    /// exactly is an error rather than a rounded value.
    pub fn total(&self) -> Result<Decimal> {
        let cents = [self.consultation, self.medicine, self.room, self.other]
            .into_iter()
            .map(cents)
            .sum::<Result<i128>>()?;
        Decimal::try_from_i128_with_scale(cents, MONEY_SCALE)
            .map_err(|_| ClinicError::validation("Bill total exceeds the supported range"))
    }
}

/// Decimal places kept for every charge and total.
pub const MONEY_SCALE: u32 = 2;

// Cannot overflow: a mantissa is at most 96 bits and the factor at most 100.
fn cents(amount: Decimal) -> Result<i128> {
    let amount = amount.normalize();
    if amount.scale() > MONEY_SCALE {
        return Err(ClinicError::validation(format!(
            "Charge {} has more than {} decimal places",
            amount, MONEY_SCALE
        )));
    }
    Ok(amount.mantissa() * 10_i128.pow(MONEY_SCALE - amount.scale()))
}

/// A stored bill. `total` is fixed at insertion and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub id: i64,
    pub pid: String,
    #[serde(flatten)]
    pub charges: BillCharges,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

fn decimal_column(row: &SqliteRow, column: &str) -> std::result::Result<Decimal, sqlx::Error> {
    let text: String = row.try_get(column)?;
    Decimal::from_str(&text).map_err(|e| db::decode_error(column, e))
}

impl<'r> FromRow<'r, SqliteRow> for Bill {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            pid: row.try_get("pid")?,
            charges: BillCharges {
                consultation: decimal_column(row, "consultation")?,
                medicine: decimal_column(row, "medicine")?,
                room: decimal_column(row, "room")?,
                other: decimal_column(row, "other")?,
            },
            total: decimal_column(row, "total")?,
            created_at: db::from_micros(row.try_get("created_at")?)?,
        })
    }
}

/// A bill joined with the name of the patient it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillStatement {
    #[serde(flatten)]
    pub bill: Bill,
    pub patient_name: String,
}

impl<'r> FromRow<'r, SqliteRow> for BillStatement {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            bill: Bill::from_row(row)?,
            patient_name: row.try_get("patient_name")?,
        })
    }
}

/// Raw charge entry as typed by the operator: amounts may be text or numbers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillRequest {
    pub pid: String,
    #[serde(default, deserialize_with = "raw_amount")]
    pub consultation: Option<String>,
    #[serde(default, deserialize_with = "raw_amount")]
    pub medicine: Option<String>,
    #[serde(default, deserialize_with = "raw_amount")]
    pub room: Option<String>,
    #[serde(default, deserialize_with = "raw_amount")]
    pub other: Option<String>,
}

impl BillRequest {
    pub fn charges(&self) -> BillCharges {
        BillCharges::from_raw(
            self.consultation.as_deref(),
            self.medicine.as_deref(),
            self.room.as_deref(),
            self.other.as_deref(),
        )
    }
}

fn raw_amount<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
        Other(IgnoredAny),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => Some(text),
        Some(Raw::Number(number)) => Some(number.to_string()),
        // Anything else is unusable input and coerces to zero like bad text.
        Some(Raw::Other(_)) | None => None,
    })
}
