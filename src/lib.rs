//! Medicare clinic records core library
//!
//! This module exports the patient registry, appointment scheduler and
//! billing ledger, all operating over a single embedded SQLite store.

pub mod api;
pub mod db;
pub mod error;
pub mod export;
pub mod ledger;
pub mod models;
pub mod registry;
pub mod roster;
pub mod scheduler;

pub use db::{Database, WriteOutcome};
pub use error::{ClinicError, Result};
pub use ledger::Ledger;
pub use registry::Registry;
pub use roster::{Clinician, Roster};
pub use scheduler::Scheduler;

/// Application configuration
pub mod config {
    use std::path::Path;

    use serde::Deserialize;

    use crate::roster::{Clinician, Roster};

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(default)]
    pub struct Config {
        pub server: ServerConfig,
        pub database: DatabaseConfig,
        pub logging: LoggingConfig,
        pub export: ExportConfig,
        pub roster: Option<Roster>,
    }

    impl Config {
        /// The configured roster, falling back to the clinic's standing ten clinicians.
        pub fn roster(&self) -> Roster {
            self.roster.clone().unwrap_or_else(default_roster)
        }
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct ServerConfig {
        pub host: String,
        pub port: u16,
        pub cors_permissive: bool,
    }

    impl Default for ServerConfig {
        fn default() -> Self {
            Self {
                host: "127.0.0.1".into(),
                port: 8080,
                cors_permissive: false,
            }
        }
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct DatabaseConfig {
        pub url: String,
        pub max_connections: u32,
    }

    impl Default for DatabaseConfig {
        fn default() -> Self {
            Self {
                url: "sqlite://medicare.db".into(),
                max_connections: 5,
            }
        }
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct LoggingConfig {
        /// Filter directive used when `RUST_LOG` is unset.
        pub level: String,
        pub json: bool,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: "info".into(),
                json: false,
            }
        }
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct ExportConfig {
        pub dir: String,
    }

    impl Default for ExportConfig {
        fn default() -> Self {
            Self { dir: ".".into() }
        }
    }

    pub fn default_roster() -> Roster {
        [
            ("Dr. Roy", "General Medicine"),
            ("Dr. Gupta", "Cardiologist"),
            ("Dr. Singh", "Neurologist"),
            ("Dr. Patel", "Orthopedic"),
            ("Dr. Mehta", "Pediatrician"),
            ("Dr. Sharma", "Dermatologist"),
            ("Dr. Anushka", "Gynecologist"),
            ("Dr. Iyer", "ENT Specialist"),
            ("Dr. Das", "Psychiatrist"),
            ("Dr. Rao", "Oncologist"),
        ]
        .into_iter()
        .map(|(name, specialty)| Clinician::new(name, specialty))
        .collect()
    }

    /// Load configuration from file
    ///
    /// `path` replaces `config/default` as the base file and must exist when given.
    pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
        // Override with environment-specific settings
        let env = std::env::var("MEDICARE_ENV").unwrap_or_else(|_| "development".into());
        load_layered(path, Path::new("config"), &env)
    }

    fn load_layered(
        path: Option<&Path>,
        dir: &Path,
        env: &str,
    ) -> Result<Config, config::ConfigError> {
        let base = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::from(dir.join("default")).required(false),
        };

        config::Config::builder()
            .add_source(base)
            .add_source(config::File::from(dir.join(env)).required(false))
            // Override with environment variables, e.g. MEDICARE__DATABASE__URL
            .add_source(
                config::Environment::with_prefix("MEDICARE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

}
