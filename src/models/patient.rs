use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use validator::Validate;

use crate::db;
use crate::error::{ClinicError, Result};
use crate::models::non_blank;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "O")]
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Other => "O",
        }
    }
}

impl FromStr for Gender {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "M" => Ok(Gender::Male),
            "F" => Ok(Gender::Female),
            "O" => Ok(Gender::Other),
            other => Err(ClinicError::validation(format!(
                "Invalid gender '{}', expected one of M, F, O",
                other
            ))),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered patient. `pid` and `created_at` never change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub pid: String,
    pub name: String,
    pub age: Option<i64>,
    pub gender: Gender,
    pub phone: Option<String>,
    pub disease: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    /// Picker entry, e.g. `"P1 - Asha"`.
    pub fn label(&self) -> String {
        format!("{} - {}", self.pid, self.name)
    }
}

/// Recover the patient id from a picker entry produced by [`Patient::label`].
pub fn parse_label_pid(label: &str) -> &str {
    label.split(" - ").next().unwrap_or(label).trim()
}

impl<'r> FromRow<'r, SqliteRow> for Patient {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let gender: String = row.try_get("gender")?;
        let gender = gender
            .parse::<Gender>()
            .map_err(|e| db::decode_error("gender", e))?;

        Ok(Self {
            pid: row.try_get("pid")?,
            name: row.try_get("name")?,
            age: row.try_get("age")?,
            gender,
            phone: row.try_get("phone")?,
            disease: row.try_get("disease")?,
            address: row.try_get("address")?,
            created_at: db::from_micros(row.try_get("created_at")?)?,
        })
    }
}

/// Fields submitted to register or update a patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PatientInput {
    #[serde(default)]
    #[validate(length(min = 1, message = "Patient ID is required"))]
    pub pid: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub age: Option<i64>,
    pub gender: String,
    pub phone: Option<String>,
    pub disease: Option<String>,
    pub address: Option<String>,
}

/// A validated patient ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PatientRecord {
    pub pid: String,
    pub name: String,
    pub age: Option<i64>,
    pub gender: Gender,
    pub phone: Option<String>,
    pub disease: Option<String>,
    pub address: Option<String>,
}

impl PatientInput {
    pub(crate) fn normalize(self) -> Result<PatientRecord> {
        let input = PatientInput {
            pid: self.pid.trim().to_string(),
            name: self.name.trim().to_string(),
            age: self.age,
            gender: self.gender.trim().to_string(),
            phone: non_blank(self.phone),
            disease: non_blank(self.disease),
            address: non_blank(self.address),
        };
        input.validate()?;
        if matches!(input.age, Some(age) if age < 0) {
            return Err(ClinicError::validation("Age must be zero or greater"));
        }
        let gender = input.gender.parse::<Gender>()?;

        Ok(PatientRecord {
            pid: input.pid,
            name: input.name,
            age: input.age,
            gender,
            phone: input.phone,
            disease: input.disease,
            address: input.address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn input() -> PatientInput {
        PatientInput {
            pid: " P1 ".into(),
            name: "Asha ".into(),
            age: Some(30),
            gender: "F".into(),
            phone: Some("  ".into()),
            disease: Some("fever".into()),
            address: None,
        }
    }

    #[test]
    fn normalize_trims_and_drops_blank_text() {
        let record = input().normalize().unwrap();
        assert_eq!(record.pid, "P1");
        assert_eq!(record.name, "Asha");
        assert_eq!(record.gender, Gender::Female);
        assert_eq!(record.phone, None);
        assert_eq!(record.disease.as_deref(), Some("fever"));
    }

    #[test_case(PatientInput { pid: "".into(), ..input() } ; "missing pid")]
    #[test_case(PatientInput { name: "   ".into(), ..input() } ; "blank name")]
    #[test_case(PatientInput { age: Some(-1), ..input() } ; "negative age")]
    #[test_case(PatientInput { gender: "X".into(), ..input() } ; "unknown gender")]
    #[test_case(PatientInput { gender: "".into(), ..input() } ; "missing gender")]
    fn normalize_rejects(bad: PatientInput) {
        assert!(matches!(bad.normalize(), Err(ClinicError::Validation(_))));
    }

    #[test_case("M", Gender::Male)]
    #[test_case("F", Gender::Female)]
    #[test_case(" O ", Gender::Other)]
    fn gender_parses(raw: &str, expected: Gender) {
        assert_eq!(raw.parse::<Gender>().unwrap(), expected);
    }

    #[test]
    fn gender_is_case_sensitive() {
        assert!("m".parse::<Gender>().is_err());
    }

    #[test]
    fn label_round_trips_pid() {
        let patient = Patient {
            pid: "P1".into(),
            name: "Asha Rao".into(),
            age: None,
            gender: Gender::Female,
            phone: None,
            disease: None,
            address: None,
            created_at: Utc::now(),
        };
        assert_eq!(patient.label(), "P1 - Asha Rao");
        assert_eq!(parse_label_pid(&patient.label()), "P1");
        assert_eq!(parse_label_pid(""), "");
    }
}
