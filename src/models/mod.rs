//! Row types and write inputs for the three clinic tables.

pub mod appointment;
pub mod bill;
pub mod patient;

pub use appointment::{Appointment, AppointmentRequest};
pub use bill::{Bill, BillCharges, BillRequest, BillStatement};
pub use patient::{Gender, Patient, PatientInput};

/// Trim an optional free-text field, treating blank text as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
