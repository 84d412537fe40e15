//! Patient registry: registration, update, removal and search of patients.

use tracing::{debug, info, instrument, warn};

use crate::db::{self, Database, WriteOutcome};
use crate::error::{ClinicError, Result};
use crate::models::{Patient, PatientInput};

const PATIENT_COLUMNS: &str = "pid, name, age, gender, phone, disease, address, created_at";

/// Parse the free-text age entry: blank means unknown, anything else must be a whole number.
pub fn parse_age(raw: &str) -> Result<Option<i64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| ClinicError::validation("Age must be a number"))
}

#[derive(Debug, Clone)]
pub struct Registry {
    db: Database,
}

impl Registry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Register a new patient. Fails with `DuplicateKey` if the id is taken.
    #[instrument(skip(self, input), fields(pid = %input.pid.trim()))]
    pub async fn add(&self, input: PatientInput) -> Result<()> {
        let patient = input.normalize().map_err(|e| {
            warn!(error = %e, "patient rejected");
            e
        })?;

        let mut tx = self.db.pool().begin().await?;

        if db::patient_exists(&mut tx, &patient.pid).await? {
            warn!("patient id already registered");
            return Err(ClinicError::DuplicateKey(patient.pid));
        }

        sqlx::query(
            "INSERT INTO patients (
                pid, name, age, gender, phone, disease, address, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&patient.pid)
        .bind(&patient.name)
        .bind(patient.age)
        .bind(patient.gender.as_str())
        .bind(&patient.phone)
        .bind(&patient.disease)
        .bind(&patient.address)
        .bind(db::now_micros())
        .execute(&mut *tx)
        .await
        .map_err(|e| db::classify(e, &patient.pid))?;

        tx.commit().await?;

        info!("Patient registered: {}", patient.pid);
        Ok(())
    }

    /// Overwrite every mutable field of an existing patient.
    ///
    /// An unknown id matches nothing and yields `WriteOutcome::NoMatch`.
    #[instrument(skip(self, input), fields(pid = %input.pid.trim()))]
    pub async fn update(&self, input: PatientInput) -> Result<WriteOutcome> {
        let patient = input.normalize().map_err(|e| {
            warn!(error = %e, "patient update rejected");
            e
        })?;

        let mut tx = self.db.pool().begin().await?;

        let result = sqlx::query(
            "UPDATE patients
             SET name = ?, age = ?, gender = ?, phone = ?, disease = ?, address = ?
             WHERE pid = ?",
        )
        .bind(&patient.name)
        .bind(patient.age)
        .bind(patient.gender.as_str())
        .bind(&patient.phone)
        .bind(&patient.disease)
        .bind(&patient.address)
        .bind(&patient.pid)
        .execute(&mut *tx)
        .await
        .map_err(|e| db::classify(e, &patient.pid))?;

        tx.commit().await?;

        let outcome = WriteOutcome::from_rows(result.rows_affected());
        if outcome.is_noop() {
            warn!("update matched no patient");
        } else {
            info!("Patient updated: {}", patient.pid);
        }
        Ok(outcome)
    }

    /// Remove a patient together with all of their appointments and bills.
    #[instrument(skip(self))]
    pub async fn delete(&self, pid: &str) -> Result<WriteOutcome> {
        let pid = pid.trim();
        let mut tx = self.db.pool().begin().await?;

        // The schema cascades as well; deleting dependents here lets us report counts.
        let appointments = sqlx::query("DELETE FROM appointments WHERE pid = ?")
            .bind(pid)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let bills = sqlx::query("DELETE FROM bills WHERE pid = ?")
            .bind(pid)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let patients = sqlx::query("DELETE FROM patients WHERE pid = ?")
            .bind(pid)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        let outcome = WriteOutcome::from_rows(patients);
        if outcome.is_noop() {
            warn!("delete matched no patient");
        } else {
            info!(appointments, bills, "Patient deleted: {}", pid);
        }
        Ok(outcome)
    }

    /// All patients, newest first, optionally narrowed to those whose id,
    /// name or phone contains `search` (case-sensitive).
    #[instrument(skip(self))]
    pub async fn list(&self, search: &str) -> Result<Vec<Patient>> {
        let search = search.trim();
        let patients = if search.is_empty() {
            sqlx::query_as::<_, Patient>(&format!(
                "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY created_at DESC, rowid DESC"
            ))
            .fetch_all(self.db.pool())
            .await?
        } else {
            sqlx::query_as::<_, Patient>(&format!(
                "SELECT {PATIENT_COLUMNS} FROM patients
                 WHERE instr(pid, ?1) > 0 OR instr(name, ?1) > 0 OR instr(phone, ?1) > 0
                 ORDER BY created_at DESC, rowid DESC"
            ))
            .bind(search)
            .fetch_all(self.db.pool())
            .await?
        };

        debug!(count = patients.len(), "patients listed");
        Ok(patients)
    }

    /// Exact lookup by id.
    #[instrument(skip(self))]
    pub async fn get(&self, pid: &str) -> Result<Option<Patient>> {
        let patient = sqlx::query_as::<_, Patient>(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE pid = ?"
        ))
        .bind(pid.trim())
        .fetch_optional(self.db.pool())
        .await?;
        Ok(patient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    async fn registry() -> Registry {
        Registry::new(Database::in_memory().await.unwrap())
    }

    fn asha() -> PatientInput {
        PatientInput {
            pid: "P1".into(),
            name: "Asha".into(),
            age: Some(30),
            gender: "F".into(),
            phone: Some("555-0101".into()),
            disease: Some("Migraine".into()),
            address: Some("12 Lake Road".into()),
        }
    }

    fn patient(pid: &str, name: &str, phone: &str) -> PatientInput {
        PatientInput {
            pid: pid.into(),
            name: name.into(),
            gender: "M".into(),
            phone: Some(phone.into()),
            ..Default::default()
        }
    }

    #[test_case("", None ; "empty")]
    #[test_case("  ", None ; "blank")]
    #[test_case("42", Some(42) ; "number")]
    #[test_case(" 7 ", Some(7) ; "padded number")]
    fn parse_age_accepts(raw: &str, expected: Option<i64>) {
        assert_eq!(parse_age(raw).unwrap(), expected);
    }

    #[test_case("forty")]
    #[test_case("4.5")]
    fn parse_age_rejects(raw: &str) {
        assert!(matches!(parse_age(raw), Err(ClinicError::Validation(_))));
    }

    #[tokio::test]
    async fn add_then_find_by_pid() -> Result<()> {
        let registry = registry().await;
        registry.add(asha()).await?;

        let found = registry.list("P1").await?;
        assert_eq!(found.len(), 1);
        let patient = &found[0];
        assert_eq!(patient.name, "Asha");
        assert_eq!(patient.age, Some(30));
        assert_eq!(patient.gender.as_str(), "F");
        assert_eq!(patient.phone.as_deref(), Some("555-0101"));
        assert_eq!(patient.disease.as_deref(), Some("Migraine"));
        assert_eq!(patient.address.as_deref(), Some("12 Lake Road"));
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_pid_is_rejected_and_original_kept() -> Result<()> {
        let registry = registry().await;
        registry.add(asha()).await?;

        let err = registry
            .add(PatientInput {
                name: "Impostor".into(),
                ..asha()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::DuplicateKey(pid) if pid == "P1"));

        let kept = registry.get("P1").await?.unwrap();
        assert_eq!(kept.name, "Asha");
        Ok(())
    }

    #[tokio::test]
    async fn invalid_input_writes_nothing() -> Result<()> {
        let registry = registry().await;
        let err = registry
            .add(PatientInput {
                gender: "Z".into(),
                ..asha()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));
        assert!(registry.list("").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn update_changes_fields_but_not_creation_time() -> Result<()> {
        let registry = registry().await;
        registry.add(asha()).await?;
        let before = registry.get("P1").await?.unwrap();

        let outcome = registry
            .update(PatientInput {
                name: "Asha Iyer".into(),
                age: None,
                phone: None,
                ..asha()
            })
            .await?;
        assert_eq!(outcome, WriteOutcome::Applied(1));

        let after = registry.get("P1").await?.unwrap();
        assert_eq!(after.name, "Asha Iyer");
        assert_eq!(after.age, None);
        assert_eq!(after.phone, None);
        assert_eq!(after.created_at, before.created_at);
        Ok(())
    }

    #[tokio::test]
    async fn update_of_unknown_pid_is_a_noop() -> Result<()> {
        let registry = registry().await;
        let outcome = registry.update(patient("ghost", "Nobody", "000")).await?;
        assert_eq!(outcome, WriteOutcome::NoMatch);
        assert!(registry.list("").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn delete_of_unknown_pid_is_a_noop() -> Result<()> {
        let registry = registry().await;
        registry.add(asha()).await?;
        assert!(registry.delete("ghost").await?.is_noop());
        assert_eq!(registry.delete("P1").await?, WriteOutcome::Applied(1));
        assert!(registry.get("P1").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn list_is_newest_first_and_search_is_case_sensitive() -> Result<()> {
        let registry = registry().await;
        registry.add(patient("A1", "Ravi Kumar", "98450")).await?;
        registry.add(patient("B2", "Meena", "99001")).await?;
        registry.add(patient("C3", "kumar Das", "77000")).await?;

        let all: Vec<String> = registry.list("").await?.into_iter().map(|p| p.pid).collect();
        assert_eq!(all, vec!["C3", "B2", "A1"]);

        let by_name: Vec<String> = registry.list("Kumar").await?.into_iter().map(|p| p.pid).collect();
        assert_eq!(by_name, vec!["A1"]);

        let by_phone: Vec<String> = registry.list("990").await?.into_iter().map(|p| p.pid).collect();
        assert_eq!(by_phone, vec!["B2"]);

        assert!(registry.list("zzz").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn pid_with_separator_is_its_own_patient() -> Result<()> {
        let registry = registry().await;
        registry.add(patient("A", "Anil", "111")).await?;
        registry.add(patient("A - B", "Bela", "222")).await?;

        assert_eq!(registry.get("A - B").await?.map(|p| p.name), Some("Bela".into()));
        assert_eq!(registry.delete("A - B").await?, WriteOutcome::Applied(1));
        assert_eq!(registry.get("A").await?.map(|p| p.name), Some("Anil".into()));
        Ok(())
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() -> Result<()> {
        let registry = registry().await;
        registry.add(patient("A1", "Ravi", "98450")).await?;
        assert!(registry.list("%").await?.is_empty());
        assert!(registry.list("_").await?.is_empty());
        Ok(())
    }
}
