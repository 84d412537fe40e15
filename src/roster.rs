//! Clinician roster.
//!
//! The roster is static lookup data owned by whoever drives the scheduler
//! (the config file for the binary). The core only reads it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clinician {
    pub name: String,
    pub specialty: String,
}

impl Clinician {
    pub fn new(name: impl Into<String>, specialty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            specialty: specialty.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    clinicians: Vec<Clinician>,
}

impl Roster {
    pub fn new(clinicians: Vec<Clinician>) -> Self {
        Self { clinicians }
    }

    pub fn clinicians(&self) -> &[Clinician] {
        &self.clinicians
    }

    pub fn is_empty(&self) -> bool {
        self.clinicians.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clinicians.iter().any(|c| c.name == name)
    }

    pub fn specialty_of(&self, name: &str) -> Option<&str> {
        self.clinicians
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.specialty.as_str())
    }

    /// Distinct specialties in sorted order.
    pub fn departments(&self) -> Vec<&str> {
        self.clinicians
            .iter()
            .map(|c| c.specialty.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl FromIterator<Clinician> for Roster {
    fn from_iter<I: IntoIterator<Item = Clinician>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        [
            Clinician::new("Dr. Roy", "General Medicine"),
            Clinician::new("Dr. Gupta", "Cardiologist"),
            Clinician::new("Dr. Bose", "Cardiologist"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn departments_are_sorted_and_unique() {
        assert_eq!(roster().departments(), vec!["Cardiologist", "General Medicine"]);
    }

    #[test]
    fn lookup_by_name() {
        let roster = roster();
        assert!(roster.contains("Dr. Gupta"));
        assert!(!roster.contains("dr. gupta"));
        assert_eq!(roster.specialty_of("Dr. Roy"), Some("General Medicine"));
        assert_eq!(roster.specialty_of("Dr. Who"), None);
    }

    #[test]
    fn deserializes_from_a_plain_list() {
        let roster: Roster =
            serde_json::from_str(r#"[{"name": "Dr. Rao", "specialty": "Oncologist"}]"#).unwrap();
        assert_eq!(roster.clinicians(), &[Clinician::new("Dr. Rao", "Oncologist")]);
    }
}
