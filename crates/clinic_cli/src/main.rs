//! Operator CLI for the clinic core.
//!
//! # Responsibility
//! - Verify `clinic_core` wiring from a configuration file.
//! - Print organization analytics as JSON for quick local checks.

use clap::{Parser, Subcommand};
use clinic_core::repo::consultation_repo::SqliteConsultationRepository;
use clinic_core::repo::patient_repo::SqlitePatientRepository;
use clinic_core::repo::program_repo::SqliteProgramRepository;
use clinic_core::{AnalyticsService, CoreConfig, Database, DateRange};
use log::error;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "clinic", version, about = "Clinic core operator tool")]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Overrides `database.path` from the configuration.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Prints core linkage and version.
    Ping,
    /// Prints organization analytics as JSON.
    Analytics {
        #[arg(long)]
        org: Uuid,
        /// Window start, Unix epoch milliseconds. Requires `--to`.
        #[arg(long, requires = "to")]
        from: Option<i64>,
        /// Window end, Unix epoch milliseconds. Requires `--from`.
        #[arg(long, requires = "from")]
        to: Option<i64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => CoreConfig::default(),
    };
    if let Some(path) = cli.db {
        config.database.path = path;
    }
    clinic_core::init_logging(&config.logging)?;

    match cli.command {
        Command::Ping => {
            println!("clinic_core ping={}", clinic_core::ping());
            println!("clinic_core version={}", clinic_core::core_version());
        }
        Command::Analytics { org, from, to } => {
            let range = match (from, to) {
                (Some(start), Some(end)) => Some(DateRange::new(start, end)),
                _ => None,
            };
            let db = Database::open(&config.database)?;
            let service = AnalyticsService::new(
                SqlitePatientRepository::new(db.clone()),
                SqliteConsultationRepository::new(db.clone()),
                SqliteProgramRepository::new(db),
            );
            let analytics = service.organization_analytics(org, range)?;
            println!("{}", serde_json::to_string_pretty(&analytics)?);
        }
    }
    Ok(())
}
