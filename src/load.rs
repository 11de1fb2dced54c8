use std::{fs, path::Path};

use thiserror::Error;

use crate::{
    config::{Destination, LoadStrategy},
    model::FinancialRow,
    store::{financial_data, postgres, sqlite},
};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("Could not prepare database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// What a successful load wrote, and how large the table is afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub written: usize,
    pub table_count: i64,
}

/// Creates the table if needed, writes `rows` in one transaction and verifies with a count.
/// The connection is released before returning, on success and on failure.
pub async fn load(
    rows: &[FinancialRow],
    destination: &Destination,
    strategy: LoadStrategy,
) -> Result<LoadReport, LoadError> {
    log::info!(
        "Loading {} rows into financial_data ({:?})",
        rows.len(),
        strategy
    );

    let report = match destination {
        Destination::Sqlite { path } => {
            let mut conn = open_sqlite(path)?;
            financial_data::create_table(&conn)?;
            let written = financial_data::save_rows(&mut conn, rows, strategy)?;
            let table_count = financial_data::count_rows(&conn)?;
            LoadReport {
                written,
                table_count,
            }
        }
        Destination::Postgres(params) => {
            let mut client = postgres::connect(params).await?;
            postgres::create_table(&client).await?;
            let written = postgres::save_rows(&mut client, rows, strategy).await?;
            let table_count = postgres::count_rows(&client).await?;
            LoadReport {
                written,
                table_count,
            }
        }
    };

    log::info!(
        "Load finished: {} rows written, financial_data now holds {} rows",
        report.written,
        report.table_count
    );
    Ok(report)
}

/// `SELECT * FROM financial_data ORDER BY date DESC`, capped at `limit` rows.
/// Read only: a missing database file or table reads as empty and is not created.
pub async fn read_latest(
    destination: &Destination,
    symbol: Option<&str>,
    limit: usize,
) -> Result<Vec<FinancialRow>, LoadError> {
    match destination {
        Destination::Sqlite { path } => {
            if !path.is_file() {
                log::warn!("{} does not exist", path.display());
                return Ok(Vec::new());
            }
            let conn = sqlite::open_read_only(path)?;
            if !financial_data::table_exists(&conn)? {
                return Ok(Vec::new());
            }
            Ok(financial_data::latest_rows(&conn, symbol, limit)?)
        }
        Destination::Postgres(params) => {
            let client = postgres::connect(params).await?;
            if !postgres::table_exists(&client).await? {
                return Ok(Vec::new());
            }
            Ok(postgres::latest_rows(&client, symbol, limit).await?)
        }
    }
}

fn open_sqlite(path: &Path) -> Result<rusqlite::Connection, LoadError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(sqlite::init_connection(path)?)
}
