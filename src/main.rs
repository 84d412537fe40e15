//! Medicare clinic records
//!
//! Command line entry point: manage patients, appointments and bills
//! directly, or serve the same operations over HTTP.

use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

use medicare::api::{self, AppState};
use medicare::config::{self, Config, LoggingConfig};
use medicare::models::patient::parse_label_pid;
use medicare::models::{AppointmentRequest, BillCharges, PatientInput};
use medicare::registry::parse_age;
use medicare::{export, Database, Ledger, Registry, Scheduler, WriteOutcome};

#[derive(Parser)]
#[command(name = "medicare", about = "Clinic records: patients, appointments and billing")]
struct Cli {
    /// Configuration file replacing config/default.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Overrides database.url from the configuration
    #[arg(long, global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register, update, delete and search patients
    #[command(subcommand)]
    Patient(PatientCommand),
    /// Book, delete and list appointments
    #[command(subcommand)]
    Appointment(AppointmentCommand),
    /// Record, list and export bills
    #[command(subcommand)]
    Bill(BillCommand),
    /// Show the clinician roster and departments
    Roster,
    /// Serve the HTTP API
    Serve,
}

#[derive(Subcommand)]
enum PatientCommand {
    Add(PatientArgs),
    Update(PatientArgs),
    Delete {
        #[command(flatten)]
        patient: PatientRef,
    },
    List {
        /// Substring of patient id, name or phone
        #[arg(default_value = "")]
        search: String,
    },
}

/// A patient id as typed, or a picker entry when `--from-label` is given.
#[derive(Args)]
struct PatientRef {
    pid: String,
    /// Read the id from a picker entry such as "P1 - Asha"
    #[arg(long)]
    from_label: bool,
}

impl PatientRef {
    fn pid(&self) -> &str {
        if self.from_label {
            parse_label_pid(&self.pid)
        } else {
            &self.pid
        }
    }
}

#[derive(Args)]
struct PatientArgs {
    pid: String,
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    age: String,
    #[arg(long, default_value = "M")]
    gender: String,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    disease: Option<String>,
    #[arg(long)]
    address: Option<String>,
}

impl PatientArgs {
    fn into_input(self) -> medicare::Result<PatientInput> {
        Ok(PatientInput {
            pid: self.pid,
            name: self.name,
            age: parse_age(&self.age)?,
            gender: self.gender,
            phone: self.phone,
            disease: self.disease,
            address: self.address,
        })
    }
}

#[derive(Subcommand)]
enum AppointmentCommand {
    Book {
        #[command(flatten)]
        patient: PatientRef,
        #[arg(long)]
        doctor: String,
        /// Defaults to the doctor's specialty
        #[arg(long)]
        department: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// HH:MM
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Delete { id: i64 },
    List {
        #[arg(long, default_value = "")]
        pid: String,
    },
}

#[derive(Args)]
struct ChargeArgs {
    #[arg(long)]
    consultation: Option<String>,
    #[arg(long)]
    medicine: Option<String>,
    #[arg(long)]
    room: Option<String>,
    #[arg(long)]
    other: Option<String>,
}

impl ChargeArgs {
    fn charges(&self) -> BillCharges {
        BillCharges::from_raw(
            self.consultation.as_deref(),
            self.medicine.as_deref(),
            self.room.as_deref(),
            self.other.as_deref(),
        )
    }
}

#[derive(Subcommand)]
enum BillCommand {
    Add {
        #[command(flatten)]
        patient: PatientRef,
        #[command(flatten)]
        charges: ChargeArgs,
    },
    /// Show the total for the given charges without saving
    Preview {
        #[command(flatten)]
        charges: ChargeArgs,
    },
    List {
        #[arg(long, default_value = "")]
        pid: String,
    },
    Show { id: i64 },
    Export {
        id: i64,
        /// Defaults to export.dir from the configuration
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn describe(outcome: WriteOutcome, what: &str) {
    match outcome {
        WriteOutcome::Applied(_) => println!("{} done", what),
        WriteOutcome::NoMatch => println!("{}: nothing matched", what),
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    init_tracing(&config.logging);

    // Connect to database
    let database = Database::connect(&config.database)
        .await
        .context("Failed to connect to database")?;

    // Run migrations
    database
        .run_migrations()
        .await
        .context("Failed to run database migrations")?;

    let result = run(cli.command, &config, database.clone()).await;
    database.close().await;
    result
}

async fn run(command: Commands, config: &Config, database: Database) -> Result<()> {
    let roster = config.roster();
    match command {
        Commands::Patient(command) => {
            let registry = Registry::new(database);
            match command {
                PatientCommand::Add(args) => {
                    registry.add(args.into_input()?).await?;
                    println!("Patient added");
                }
                PatientCommand::Update(args) => {
                    describe(registry.update(args.into_input()?).await?, "Patient update");
                }
                PatientCommand::Delete { patient } => {
                    describe(registry.delete(patient.pid()).await?, "Patient delete");
                }
                PatientCommand::List { search } => {
                    for p in registry.list(&search).await? {
                        println!(
                            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                            p.pid,
                            p.name,
                            p.age.map(|a| a.to_string()).unwrap_or_default(),
                            p.gender,
                            p.phone.unwrap_or_default(),
                            p.disease.unwrap_or_default(),
                            p.address.unwrap_or_default(),
                            p.created_at.format("%Y-%m-%dT%H:%M:%S"),
                        );
                    }
                }
            }
        }
        Commands::Appointment(command) => {
            let scheduler = Scheduler::new(database, roster);
            match command {
                AppointmentCommand::Book {
                    patient,
                    doctor,
                    department,
                    date,
                    time,
                    notes,
                } => {
                    let department = department
                        .or_else(|| scheduler.roster().specialty_of(&doctor).map(str::to_string));
                    let appointment = scheduler
                        .book(AppointmentRequest {
                            pid: patient.pid().to_string(),
                            doctor,
                            department,
                            date,
                            time,
                            notes,
                        })
                        .await?;
                    println!("Appointment booked (#{})", appointment.id);
                }
                AppointmentCommand::Delete { id } => {
                    describe(scheduler.delete(id).await?, "Appointment delete");
                }
                AppointmentCommand::List { pid } => {
                    for a in scheduler.list(&pid).await? {
                        println!(
                            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                            a.id,
                            a.pid,
                            a.doctor,
                            a.department.unwrap_or_default(),
                            a.date,
                            a.time.unwrap_or_default(),
                            a.notes.unwrap_or_default(),
                        );
                    }
                }
            }
        }
        Commands::Bill(command) => {
            let ledger = Ledger::new(database);
            match command {
                BillCommand::Add { patient, charges } => {
                    let bill = ledger.add(patient.pid(), charges.charges()).await?;
                    println!("Bill saved (#{}). Total = {:.2}", bill.id, bill.total);
                }
                BillCommand::Preview { charges } => {
                    println!("Total: {:.2}", charges.charges().total()?);
                }
                BillCommand::List { pid } => {
                    for b in ledger.list(&pid).await? {
                        println!(
                            "{}\t{}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{}",
                            b.id,
                            b.pid,
                            b.charges.consultation,
                            b.charges.medicine,
                            b.charges.room,
                            b.charges.other,
                            b.total,
                            b.created_at.format("%Y-%m-%dT%H:%M:%S"),
                        );
                    }
                }
                BillCommand::Show { id } => {
                    print!("{}", export::render(&ledger.get(id).await?));
                }
                BillCommand::Export { id, dir } => {
                    let dir = dir.unwrap_or_else(|| PathBuf::from(&config.export.dir));
                    let path = export::write_to_dir(&dir, &ledger.get(id).await?).await?;
                    println!("Saved {}", path.display());
                }
            }
        }
        Commands::Roster => {
            for clinician in roster.clinicians() {
                println!("{}\t{}", clinician.name, clinician.specialty);
            }
            println!("Departments: {}", roster.departments().join(", "));
        }
        Commands::Serve => serve(config, database, roster).await?,
    }
    Ok(())
}

async fn serve(config: &Config, database: Database, roster: medicare::Roster) -> Result<()> {
    // Create app state
    let app_state = web::Data::new(AppState::new(database, roster));
    let cors_permissive = config.server.cors_permissive;

    tracing::info!(host = %config.server.host, port = config.server.port, "starting HTTP server");

    // Start HTTP server
    HttpServer::new(move || {
        let cors = if cors_permissive {
            Cors::permissive()
        } else {
            Cors::default()
        };
        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(TracingLogger::default())
            .configure(api::configure)
    })
    .bind((config.server.host.as_str(), config.server.port))
    .context("Failed to bind HTTP listener")?
    .run()
    .await?;

    Ok(())
}
