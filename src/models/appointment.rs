use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::db;

/// A booked visit. Never updated in place; removed by id or with its patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub pid: String,
    pub doctor: String,
    pub department: Option<String>,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`, 24-hour
    pub time: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for Appointment {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            pid: row.try_get("pid")?,
            doctor: row.try_get("doctor")?,
            department: row.try_get("department")?,
            date: row.try_get("appt_date")?,
            time: row.try_get("appt_time")?,
            notes: row.try_get("notes")?,
            created_at: db::from_micros(row.try_get("created_at")?)?,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentRequest {
    pub pid: String,
    pub doctor: String,
    #[serde(default)]
    pub department: Option<String>,
    pub date: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}
