use std::{env, fmt, path::PathBuf};

use chrono::{Days, NaiveDate};
use thiserror::Error;

use crate::constants;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' not set")]
    MissingVar(&'static str),
    #[error("Environment variable '{0}' is invalid: {1}")]
    InvalidVar(&'static str, String),
    #[error("No tickers configured")]
    NoTickers,
    #[error("Lookback window must be at least one day")]
    EmptyWindow,
    #[error("Lookback of {0} days reaches past the earliest representable date")]
    WindowOutOfRange(u32),
    #[error("Symbols file not found: {0}")]
    FileNotFound(String),
    #[error("Could not read symbols file: {0}")]
    CouldNotReadFile(#[from] std::io::Error),
}

/// Connection parameters for the PostgreSQL destination.
#[derive(Clone, PartialEq)]
pub struct PgParams {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for PgParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

impl PgParams {
    /// Reads `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER` and `DB_PASSWORD`. All are required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &'static str| -> Result<String, ConfigError> {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(ConfigError::MissingVar(key)),
            }
        };

        let port = var("DB_PORT")?;
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidVar("DB_PORT", e.to_string()))?;

        Ok(Self {
            host: var("DB_HOST")?,
            port,
            dbname: var("DB_NAME")?,
            user: var("DB_USER")?,
            password: var("DB_PASSWORD")?,
        })
    }

    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.dbname)
            .user(&self.user)
            .password(&self.password);
        config
    }
}

/// Where the transformed rows are persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    Sqlite { path: PathBuf },
    Postgres(PgParams),
}

/// How prior contents of the table are superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LoadStrategy {
    /// Insert new rows, update rows whose (symbol, date) already exists.
    #[default]
    Upsert,
    /// Delete every row of the loaded tickers, then insert.
    Replace,
}

/// Everything a pipeline run needs, validated up front.
#[derive(Debug, Clone)]
pub struct Config {
    pub tickers: Vec<String>,
    pub lookback_days: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub destination: Destination,
    pub strategy: LoadStrategy,
    pub preview_csv: Option<PathBuf>,
}

impl Config {
    pub fn new(
        tickers: Vec<String>,
        lookback_days: u32,
        today: NaiveDate,
        destination: Destination,
        strategy: LoadStrategy,
        preview_csv: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let tickers = normalize_tickers(tickers);
        if tickers.is_empty() {
            return Err(ConfigError::NoTickers);
        }
        let (start, end) = window(today, lookback_days)?;
        Ok(Self {
            tickers,
            lookback_days,
            start,
            end,
            destination,
            strategy,
            preview_csv,
        })
    }

    /// Moves the date window so it ends on `today`. Used between scheduled runs.
    pub fn roll_to(&mut self, today: NaiveDate) -> Result<(), ConfigError> {
        let (start, end) = window(today, self.lookback_days)?;
        self.start = start;
        self.end = end;
        Ok(())
    }
}

/// Trailing window ending on `today`.
pub fn window(today: NaiveDate, lookback_days: u32) -> Result<(NaiveDate, NaiveDate), ConfigError> {
    if lookback_days == 0 {
        return Err(ConfigError::EmptyWindow);
    }
    let start = today
        .checked_sub_days(Days::new(lookback_days as u64))
        .ok_or(ConfigError::WindowOutOfRange(lookback_days))?;
    Ok((start, today))
}

pub fn default_tickers() -> Vec<String> {
    constants::DEFAULT_TICKERS.iter().map(|s| s.to_string()).collect()
}

// Trims, uppercases and de-duplicates while keeping the first occurrence order.
fn normalize_tickers(tickers: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() || out.contains(&ticker) {
            continue;
        }
        out.push(ticker);
    }
    out
}
