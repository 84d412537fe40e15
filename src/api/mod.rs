//! API module for the Medicare clinic service
//!
//! This module contains the HTTP request/response boundary over the
//! registry, scheduler and ledger.

pub mod handlers;
pub mod routes;

pub use routes::configure;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use tokio::sync::Mutex;

use crate::db::Database;
use crate::error::ClinicError;
use crate::ledger::Ledger;
use crate::registry::Registry;
use crate::roster::Roster;
use crate::scheduler::Scheduler;

/// Application state
pub struct AppState {
    pub registry: Registry,
    pub scheduler: Scheduler,
    pub ledger: Ledger,
    /// Held by every mutating handler so writes reach the store one at a time.
    pub writes: Mutex<()>,
}

impl AppState {
    pub fn new(db: Database, roster: Roster) -> Self {
        Self {
            registry: Registry::new(db.clone()),
            scheduler: Scheduler::new(db.clone(), roster),
            ledger: Ledger::new(db),
            writes: Mutex::new(()),
        }
    }
}

impl ResponseError for ClinicError {
    fn status_code(&self) -> StatusCode {
        match self {
            ClinicError::Validation(_) => StatusCode::BAD_REQUEST,
            ClinicError::NotFound(_) => StatusCode::NOT_FOUND,
            ClinicError::DuplicateKey(_) => StatusCode::CONFLICT,
            ClinicError::ForeignKeyViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ClinicError::Database(_) | ClinicError::Migration(_) | ClinicError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }))
    }
}
