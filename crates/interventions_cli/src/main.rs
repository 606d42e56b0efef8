//! Interventions CLI
//!
//! Command-line front end over `interventions_core`. Each invocation opens
//! one engine against the configured backend, runs a single command and
//! tears the push subscription down before exiting.
//!
//! Backend, session, search and export defaults come from `INTERVENTIONS_*`
//! environment variables.

use clap::{Parser, Subcommand};
use interventions_core::{
    init_logging, open_backend, write_csv_file, AppConfig, Field, Intervention, InterventionDraft,
    SearchIndex, SearchProjection, Store, SyncEngine, DEFAULT_EXPORT_FILE_NAME,
};
use log::info;
use std::path::PathBuf;

/// Field intervention log.
#[derive(Parser)]
#[command(name = "interventions")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every intervention, newest first
    List,

    /// Record a new intervention
    Add {
        /// Intervention date (YYYY-MM-DD)
        #[arg(long, default_value = "")]
        date: String,

        #[arg(long, default_value = "")]
        brand: String,

        #[arg(long, default_value = "")]
        model: String,

        /// Serial number
        #[arg(long, default_value = "")]
        serial: String,

        /// Meter reading in hours
        #[arg(long, default_value = "")]
        meter: String,

        #[arg(long, default_value = "")]
        fault: String,

        #[arg(long, default_value = "")]
        resolution: String,

        #[arg(long, default_value = "")]
        comment: String,
    },

    /// Delete an intervention by id
    Delete { id: String },

    /// Filter interventions by a case-insensitive substring
    Search {
        query: String,

        /// Also match serial number, meter reading and comment
        #[arg(short, long)]
        extended: bool,
    },

    /// Export the list as CSV
    Export {
        /// Output file
        #[arg(short, long, default_value = DEFAULT_EXPORT_FILE_NAME)]
        out: PathBuf,

        /// Column delimiter (`;` or `,`)
        #[arg(short, long)]
        delimiter: Option<char>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("interventions CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("interventions core v{}", interventions_core::core_version());
        return Ok(());
    }

    let config = AppConfig::from_env()?;
    if let Some(log_dir) = &config.logging.log_dir {
        init_logging(&config.logging.level, log_dir)?;
    }

    let store = open_backend(&config.backend)?;
    let mut engine = SyncEngine::open(store, config.engine.clone())?;

    let result = run(&mut engine, cli.command, &config);

    engine.drain_push_events();
    engine.unsubscribe();
    result
}

fn run<S: Store>(
    engine: &mut SyncEngine<S>,
    command: Commands,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::List => print_rows(engine.list().iter()),
        Commands::Add {
            date,
            brand,
            model,
            serial,
            meter,
            fault,
            resolution,
            comment,
        } => {
            let draft = InterventionDraft::new()
                .with_field(Field::Date, date)
                .with_field(Field::Brand, brand)
                .with_field(Field::Model, model)
                .with_field(Field::SerialNumber, serial)
                .with_field(Field::MeterReading, meter)
                .with_field(Field::Fault, fault)
                .with_field(Field::Resolution, resolution)
                .with_field(Field::Comment, comment);
            let created = engine.create(draft)?;
            println!("{}", created.id);
        }
        Commands::Delete { id } => {
            engine.delete(&id)?;
        }
        Commands::Search { query, extended } => {
            let projection = if extended {
                SearchProjection::extended()
            } else {
                config.search.clone()
            };
            print_rows(engine.search(&query, &SearchIndex::new(projection)).into_iter());
        }
        Commands::Export { out, delimiter } => {
            let options = match delimiter {
                Some(delimiter) => config.csv.clone().with_delimiter(delimiter)?,
                None => config.csv.clone(),
            };
            let written = write_csv_file(&out, engine.list(), &options)?;
            info!(
                "event=cli_export module=cli status=ok rows={written} path={}",
                out.display()
            );
            println!("{written} rows -> {}", out.display());
        }
        Commands::Version => {}
    }
    Ok(())
}

fn print_rows<'a>(rows: impl Iterator<Item = &'a Intervention>) {
    for row in rows {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            row.id, row.date, row.brand, row.model, row.fault
        );
    }
}
