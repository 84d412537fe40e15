//! Appointment scheduler: books visits with clinicians from a caller-supplied roster.

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info, instrument, warn};

use crate::db::{self, Database, WriteOutcome};
use crate::error::{ClinicError, Result};
use crate::models::non_blank;
use crate::models::{Appointment, AppointmentRequest};
use crate::roster::Roster;

const APPOINTMENT_COLUMNS: &str =
    "id, pid, doctor, department, appt_date, appt_time, notes, created_at";

// Empty times sort after every timed appointment on the same day.
const APPOINTMENT_ORDER: &str =
    "ORDER BY appt_date DESC, appt_time IS NULL, appt_time DESC, id DESC";

/// Validate a `YYYY-MM-DD` calendar date and return it in canonical form.
pub fn parse_date(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ClinicError::validation("Date is required (YYYY-MM-DD)"));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.format("%Y-%m-%d").to_string())
        .map_err(|_| ClinicError::validation(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))
}

/// Validate an optional `HH:MM` 24-hour time; blank means no time was given.
pub fn parse_time(raw: Option<&str>) -> Result<Option<String>> {
    let Some(raw) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map(|time| Some(time.format("%H:%M").to_string()))
        .map_err(|_| ClinicError::validation(format!("Invalid time '{}', expected HH:MM", raw)))
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    db: Database,
    roster: Roster,
}

impl Scheduler {
    pub fn new(db: Database, roster: Roster) -> Self {
        Self { db, roster }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Book an appointment for an existing patient.
    ///
    /// `department` is recorded as given; it is not checked against the
    /// doctor's specialty.
    #[instrument(skip(self, request), fields(pid = %request.pid.trim(), doctor = %request.doctor.trim()))]
    pub async fn book(&self, request: AppointmentRequest) -> Result<Appointment> {
        let pid = request.pid.trim().to_string();
        let doctor = request.doctor.trim().to_string();

        let validated = self.validate(&pid, &doctor, &request);
        let (date, time) = validated.map_err(|e| {
            warn!(error = %e, "appointment rejected");
            e
        })?;
        let department = non_blank(request.department);
        let notes = non_blank(request.notes);
        let created_at = db::now_micros();

        let mut tx = self.db.pool().begin().await?;

        if !db::patient_exists(&mut tx, &pid).await? {
            warn!("appointment for unknown patient");
            return Err(ClinicError::ForeignKeyViolation(pid));
        }

        let id = sqlx::query(
            "INSERT INTO appointments (
                pid, doctor, department, appt_date, appt_time, notes, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&pid)
        .bind(&doctor)
        .bind(&department)
        .bind(&date)
        .bind(&time)
        .bind(&notes)
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db::classify(e, &pid))?
        .last_insert_rowid();

        tx.commit().await?;

        info!(appointment_id = id, date = %date, "Appointment booked");
        Ok(Appointment {
            id,
            pid,
            doctor,
            department,
            date,
            time,
            notes,
            created_at: db::from_micros(created_at)?,
        })
    }

    fn validate(
        &self,
        pid: &str,
        doctor: &str,
        request: &AppointmentRequest,
    ) -> Result<(String, Option<String>)> {
        if pid.is_empty() {
            return Err(ClinicError::validation("Select a patient"));
        }
        if doctor.is_empty() {
            return Err(ClinicError::validation("Select a doctor"));
        }
        if !self.roster.contains(doctor) {
            return Err(ClinicError::validation(format!(
                "{} is not on the clinic roster",
                doctor
            )));
        }
        let date = parse_date(&request.date)?;
        let time = parse_time(request.time.as_deref())?;
        Ok((date, time))
    }

    /// Remove one appointment; an unknown id is a no-op.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<WriteOutcome> {
        let mut tx = self.db.pool().begin().await?;
        let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let outcome = WriteOutcome::from_rows(result.rows_affected());
        if outcome.is_noop() {
            warn!("delete matched no appointment");
        } else {
            info!("Appointment deleted: {}", id);
        }
        Ok(outcome)
    }

    /// Appointments, latest date and time first, optionally for one patient.
    #[instrument(skip(self))]
    pub async fn list(&self, pid_filter: &str) -> Result<Vec<Appointment>> {
        let pid = pid_filter.trim();
        let appointments = if pid.is_empty() {
            sqlx::query_as::<_, Appointment>(&format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments {APPOINTMENT_ORDER}"
            ))
            .fetch_all(self.db.pool())
            .await?
        } else {
            sqlx::query_as::<_, Appointment>(&format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE pid = ? {APPOINTMENT_ORDER}"
            ))
            .bind(pid)
            .fetch_all(self.db.pool())
            .await?
        };

        debug!(count = appointments.len(), "appointments listed");
        Ok(appointments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatientInput;
    use crate::registry::Registry;
    use crate::roster::Clinician;
    use test_case::test_case;

    async fn setup() -> (Registry, Scheduler) {
        let db = Database::in_memory().await.unwrap();
        let roster: Roster = [
            Clinician::new("Dr. Roy", "General Medicine"),
            Clinician::new("Dr. Gupta", "Cardiologist"),
        ]
        .into_iter()
        .collect();
        let registry = Registry::new(db.clone());
        registry
            .add(PatientInput {
                pid: "P1".into(),
                name: "Asha".into(),
                age: Some(30),
                gender: "F".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        (registry, Scheduler::new(db, roster))
    }

    fn request(date: &str, time: Option<&str>) -> AppointmentRequest {
        AppointmentRequest {
            pid: "P1".into(),
            doctor: "Dr. Roy".into(),
            department: Some("General Medicine".into()),
            date: date.into(),
            time: time.map(Into::into),
            notes: None,
        }
    }

    #[test_case("2025-01-10", "2025-01-10")]
    #[test_case(" 2024-02-29 ", "2024-02-29")]
    #[test_case("2025-1-5", "2025-01-05")]
    fn parse_date_accepts(raw: &str, expected: &str) {
        assert_eq!(parse_date(raw).unwrap(), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("2024-02-30" ; "not a calendar date")]
    #[test_case("2023-02-29" ; "not a leap year")]
    #[test_case("10/01/2025" ; "wrong layout")]
    #[test_case("2025-01-10T09:30" ; "trailing text")]
    fn parse_date_rejects(raw: &str) {
        assert!(matches!(parse_date(raw), Err(ClinicError::Validation(_))));
    }

    #[test_case(None, None ; "absent")]
    #[test_case(Some(""), None ; "blank")]
    #[test_case(Some("09:30"), Some("09:30") ; "morning")]
    #[test_case(Some("9:05"), Some("09:05") ; "single digit hour")]
    #[test_case(Some("23:59"), Some("23:59") ; "last minute")]
    fn parse_time_accepts(raw: Option<&str>, expected: Option<&str>) {
        assert_eq!(parse_time(raw).unwrap().as_deref(), expected);
    }

    #[test_case("24:00")]
    #[test_case("12:60")]
    #[test_case("noon")]
    #[test_case("09:30:15")]
    fn parse_time_rejects(raw: &str) {
        assert!(matches!(parse_time(Some(raw)), Err(ClinicError::Validation(_))));
    }

    #[tokio::test]
    async fn book_stores_normalized_fields() -> Result<()> {
        let (_, scheduler) = setup().await;
        let booked = scheduler
            .book(AppointmentRequest {
                notes: Some("  follow-up ".into()),
                ..request("2025-01-10", Some("09:30"))
            })
            .await?;

        let listed = scheduler.list("P1").await?;
        assert_eq!(listed, vec![booked.clone()]);
        assert_eq!(booked.doctor, "Dr. Roy");
        assert_eq!(booked.time.as_deref(), Some("09:30"));
        assert_eq!(booked.notes.as_deref(), Some("follow-up"));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_patient_is_a_foreign_key_violation() -> Result<()> {
        let (_, scheduler) = setup().await;
        let err = scheduler
            .book(AppointmentRequest {
                pid: "P404".into(),
                ..request("2025-01-10", None)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::ForeignKeyViolation(pid) if pid == "P404"));
        assert!(scheduler.list("").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn invalid_calendar_date_is_rejected() -> Result<()> {
        let (_, scheduler) = setup().await;
        let err = scheduler.book(request("2024-02-30", None)).await.unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));
        assert!(scheduler.list("P1").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn doctor_must_be_on_the_roster() -> Result<()> {
        let (_, scheduler) = setup().await;
        let err = scheduler
            .book(AppointmentRequest {
                doctor: "Dr. Strange".into(),
                ..request("2025-01-10", None)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));
        Ok(())
    }

    #[tokio::test]
    async fn department_is_not_cross_checked() -> Result<()> {
        let (_, scheduler) = setup().await;
        let booked = scheduler
            .book(AppointmentRequest {
                department: Some("Cardiologist".into()),
                ..request("2025-01-10", None)
            })
            .await?;
        assert_eq!(booked.department.as_deref(), Some("Cardiologist"));
        Ok(())
    }

    #[tokio::test]
    async fn list_orders_by_date_then_time_with_untimed_last() -> Result<()> {
        let (registry, scheduler) = setup().await;
        registry
            .add(PatientInput {
                pid: "P2".into(),
                name: "Vikram".into(),
                gender: "M".into(),
                ..Default::default()
            })
            .await?;

        let a = scheduler.book(request("2025-01-10", Some("09:30"))).await?;
        let b = scheduler.book(request("2025-01-10", None)).await?;
        let c = scheduler.book(request("2025-01-10", Some("14:00"))).await?;
        let d = scheduler.book(request("2024-12-31", Some("23:00"))).await?;
        let e = scheduler
            .book(AppointmentRequest {
                pid: "P2".into(),
                ..request("2025-03-01", None)
            })
            .await?;

        let order: Vec<i64> = scheduler.list("").await?.iter().map(|a| a.id).collect();
        assert_eq!(order, vec![e.id, c.id, a.id, b.id, d.id]);

        let only_p1: Vec<i64> = scheduler.list("P1").await?.iter().map(|a| a.id).collect();
        assert_eq!(only_p1, vec![c.id, a.id, b.id, d.id]);
        Ok(())
    }

    #[tokio::test]
    async fn delete_by_id() -> Result<()> {
        let (_, scheduler) = setup().await;
        let booked = scheduler.book(request("2025-01-10", None)).await?;
        assert_eq!(scheduler.delete(booked.id).await?, WriteOutcome::Applied(1));
        assert_eq!(scheduler.delete(booked.id).await?, WriteOutcome::NoMatch);
        assert!(scheduler.list("").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() -> Result<()> {
        let (_, scheduler) = setup().await;
        let first = scheduler.book(request("2025-01-10", None)).await?;
        scheduler.delete(first.id).await?;
        let second = scheduler.book(request("2025-01-10", None)).await?;
        assert!(second.id > first.id);
        Ok(())
    }
}
