//! Error types returned by every registry, scheduler and ledger operation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClinicError>;

#[derive(Debug, Error)]
pub enum ClinicError {
    /// A required field is missing or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("patient {0} already exists")]
    DuplicateKey(String),

    /// An appointment or bill referenced a patient that does not exist.
    #[error("no patient with id {0}")]
    ForeignKeyViolation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClinicError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::DuplicateKey(_) => "duplicate_key",
            Self::ForeignKeyViolation(_) => "foreign_key_violation",
            Self::NotFound(_) => "not_found",
            Self::Database(_) | Self::Migration(_) | Self::Io(_) => "storage_error",
        }
    }
}

impl From<validator::ValidationErrors> for ClinicError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);

        let message = fields
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| match &error.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid ({})", field, error.code),
                })
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::Validation(message)
    }
}
