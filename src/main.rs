// Daily OHLCV extract-transform-load into the financial_data table.
mod marketdata {
    // Client for fetching market data.
    pub mod api_caller;
    // Response structures for market data.
    pub mod response;
    #[cfg(test)]
    pub mod fake;
}
// HTTP client module.
mod http {
    // HTTP client implementation.
    pub mod client;
}
// Data storage module.
mod store {
    /// financial_data table on SQLite.
    pub mod financial_data;
    /// financial_data table on PostgreSQL.
    pub mod postgres;
    /// SQLite database interaction.
    pub mod sqlite;
}
mod config;
// module storing defaults
mod constants;
mod export;
mod extract;
mod load;
// Data models.
mod model;
mod pipeline;
mod report;
mod schedule;
mod symbols;
mod transform;

use std::{env, path::PathBuf, process::ExitCode};

use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;

use config::{Config, ConfigError, Destination, LoadStrategy, PgParams};
use load::LoadError;
use marketdata::api_caller::MarketDataApp;
use pipeline::RunOutcome;

// Command-line argument parser.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Destination database.
    #[arg(long, value_enum, default_value_t = Backend::Sqlite, global = true)]
    backend: Backend,
    /// SQLite file, falls back to the `sqlite_file` environment variable.
    #[arg(long, global = true)]
    sqlite_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Backend {
    Sqlite,
    /// Connection from DB_HOST, DB_PORT, DB_NAME, DB_USER and DB_PASSWORD.
    Postgres,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// File with one ticker per line. Defaults to the built-in list.
    #[arg(long)]
    symbols_file: Option<PathBuf>,
    #[arg(long, default_value_t = constants::LOOKBACK_DAYS)]
    lookback_days: u32,
    #[arg(long, value_enum, default_value_t = LoadStrategy::Upsert)]
    strategy: LoadStrategy,
    /// Also write the transformed rows to this CSV file.
    #[arg(long)]
    preview_csv: Option<PathBuf>,
}

// Subcommands for the application.
#[derive(Subcommand, Debug)]
enum Commands {
    // Run the pipeline once.
    Run(RunArgs),
    // Run the pipeline now and then every day.
    Schedule {
        #[command(flatten)]
        run: RunArgs,
        /// Stop after this many runs.
        #[arg(long)]
        runs: Option<u64>,
    },
    // Print the latest rows of the table.
    Show {
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long, default_value_t = constants::SHOW_LIMIT)]
        limit: usize,
    },
}

fn destination(args: &Args) -> Result<Destination, ConfigError> {
    match args.backend {
        Backend::Sqlite => {
            let path = args
                .sqlite_file
                .clone()
                .or_else(|| env::var("sqlite_file").ok().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_SQLITE_FILE));
            Ok(Destination::Sqlite { path })
        }
        Backend::Postgres => Ok(Destination::Postgres(PgParams::from_env()?)),
    }
}

fn build_config(run: RunArgs, destination: Destination) -> Result<Config, ConfigError> {
    let tickers = match &run.symbols_file {
        Some(path) => symbols::read_symbols_from_file(path)?,
        None => config::default_tickers(),
    };
    Config::new(
        tickers,
        run.lookback_days,
        Local::now().date_naive(),
        destination,
        run.strategy,
        run.preview_csv,
    )
}

#[tokio::main(flavor = "current_thread")]
// Main function entry point.
async fn main() -> ExitCode {
    dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let destination = match destination(&args) {
        Ok(destination) => destination,
        Err(err) => {
            log::error!("Invalid configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match args.command {
        Commands::Run(run) => {
            let (source, config) = match prepare(run, destination) {
                Some(prepared) => prepared,
                None => return ExitCode::FAILURE,
            };
            let result = pipeline::run(&source, &config).await;
            ExitCode::from(run_status(&result))
        }

        Commands::Schedule { run, runs } => {
            let (source, config) = match prepare(run, destination) {
                Some(prepared) => prepared,
                None => return ExitCode::FAILURE,
            };
            let result = schedule::run_daily(&source, config, runs).await;
            if let Err(err) = &result {
                log::error!("Load failed, stopping schedule: {}", err);
            }
            ExitCode::from(exit_status(&result))
        }

        Commands::Show { symbol, limit } => {
            match load::read_latest(&destination, symbol.as_deref(), limit).await {
                Ok(rows) if rows.is_empty() => {
                    log::warn!("No data found in the database. Run the ETL first.");
                    ExitCode::SUCCESS
                }
                Ok(rows) => {
                    print!("{}", report::render(&rows));
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    log::error!("Error reading financial_data: {}", err);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

// Logs how a single run ended and returns its process status.
fn run_status(result: &Result<RunOutcome, LoadError>) -> u8 {
    match result {
        Ok(RunOutcome::Loaded(report)) => {
            log::info!("Successfully loaded {} rows", report.written);
        }
        Ok(RunOutcome::Skipped(stage)) => {
            log::info!("Nothing to load after {}, exiting cleanly", stage);
        }
        Err(err) => {
            log::error!("Load failed: {}", err);
        }
    }
    exit_status(result)
}

// 0 once the pipeline stopped cleanly (loaded or skipped), 1 when loading failed.
fn exit_status<T>(result: &Result<T, LoadError>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

// Validated config plus provider client, or None after logging why not.
fn prepare(run: RunArgs, destination: Destination) -> Option<(MarketDataApp, Config)> {
    let config = match build_config(run, destination) {
        Ok(config) => config,
        Err(err) => {
            log::error!("Invalid configuration: {}", err);
            return None;
        }
    };
    match MarketDataApp::from_env() {
        Ok(source) => Some((source, config)),
        Err(err) => {
            log::error!("Error initializing market data client: {}", err);
            None
        }
    }
}
