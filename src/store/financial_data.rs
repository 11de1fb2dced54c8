use std::collections::BTreeSet;

use crate::{config::LoadStrategy, model};
use rusqlite::{Connection, Result, Row, Transaction, params};

/// Creates the financial_data table if it does not exist yet.
pub fn create_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS financial_data (
            symbol TEXT NOT NULL,
            date DATE NOT NULL,
            open REAL,
            high REAL,
            low REAL,
            close REAL,
            volume INTEGER,
            average_price REAL,
            daily_gain REAL,
            PRIMARY KEY (symbol, date)
        );",
        [],
    )?;
    Ok(())
}

/// Writes all rows in one transaction. On any error the transaction is rolled back
/// and nothing from this call is visible.
pub fn save_rows(
    conn: &mut Connection,
    rows: &[model::FinancialRow],
    strategy: LoadStrategy,
) -> Result<usize> {
    let transaction = conn.transaction()?;
    match write_rows(&transaction, rows, strategy) {
        Ok(written) => {
            transaction.commit()?;
            Ok(written)
        }
        Err(e) => {
            log::error!("Write to financial_data failed, rolling back: {}", e);
            if let Err(rollback_err) = transaction.rollback() {
                log::error!("Rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

fn write_rows(
    transaction: &Transaction,
    rows: &[model::FinancialRow],
    strategy: LoadStrategy,
) -> Result<usize> {
    if strategy == LoadStrategy::Replace {
        let symbols: BTreeSet<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
        let mut delete = transaction.prepare("DELETE FROM financial_data WHERE symbol = ?1")?;
        for symbol in symbols {
            let deleted = delete.execute(params![symbol])?;
            log::debug!("{}: deleted {} rows", symbol, deleted);
        }
    }

    let mut stmt = transaction.prepare(
        "INSERT INTO financial_data
            (symbol, date, open, high, low, close, volume, average_price, daily_gain)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT (symbol, date) DO UPDATE SET
            open = excluded.open,
            high = excluded.high,
            low = excluded.low,
            close = excluded.close,
            volume = excluded.volume,
            average_price = excluded.average_price,
            daily_gain = excluded.daily_gain",
    )?;
    for row in rows {
        stmt.execute(params![
            row.symbol,
            row.date,
            row.open,
            row.high,
            row.low,
            row.close,
            row.volume,
            row.average_price,
            row.daily_gain,
        ])?;
    }
    Ok(rows.len())
}

pub fn table_exists(conn: &Connection) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'financial_data')",
        [],
        |row| row.get(0),
    )
}

pub fn count_rows(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM financial_data", [], |row| row.get(0))
}

/// Most recent rows first, optionally for one symbol.
pub fn latest_rows(
    conn: &Connection,
    symbol: Option<&str>,
    limit: usize,
) -> Result<Vec<model::FinancialRow>> {
    let mut stmt = conn.prepare(
        "SELECT symbol, date, open, high, low, close, volume, average_price, daily_gain
         FROM financial_data
         WHERE (?1 IS NULL OR symbol = ?1)
         ORDER BY date DESC, symbol
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![symbol, limit as i64], from_row)?;
    rows.collect()
}

fn from_row(row: &Row) -> Result<model::FinancialRow> {
    Ok(model::FinancialRow {
        symbol: row.get(0)?,
        date: row.get(1)?,
        open: row.get(2)?,
        high: row.get(3)?,
        low: row.get(4)?,
        close: row.get(5)?,
        volume: row.get(6)?,
        average_price: row.get(7)?,
        daily_gain: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(symbol: &str, date: &str, close: f64) -> model::FinancialRow {
        model::FinancialRow {
            symbol: symbol.into(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: Some(100.0),
            high: Some(close + 1.0),
            low: Some(99.0),
            close: Some(close),
            volume: Some(1000),
            average_price: Some((close + 1.0 + 99.0) / 2.0),
            daily_gain: Some(close - 100.0),
        }
    }

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_table(&conn).unwrap();
        conn
    }

    #[test]
    fn create_table_is_idempotent() {
        let conn = conn();
        create_table(&conn).unwrap();
        assert_eq!(count_rows(&conn).unwrap(), 0);
        assert!(latest_rows(&conn, None, 10).unwrap().is_empty());
    }

    #[test]
    fn table_exists_only_after_create() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(!table_exists(&conn).unwrap());
        create_table(&conn).unwrap();
        assert!(table_exists(&conn).unwrap());
    }

    #[test]
    fn upsert_updates_existing_keys() {
        let mut conn = conn();
        let first = vec![row("AAPL", "2024-01-02", 101.0), row("AAPL", "2024-01-03", 102.0)];
        assert_eq!(save_rows(&mut conn, &first, LoadStrategy::Upsert).unwrap(), 2);

        let second = vec![row("AAPL", "2024-01-03", 110.0), row("AAPL", "2024-01-04", 103.0)];
        save_rows(&mut conn, &second, LoadStrategy::Upsert).unwrap();

        assert_eq!(count_rows(&conn).unwrap(), 3);
        let latest = latest_rows(&conn, Some("AAPL"), 1).unwrap();
        assert_eq!(latest[0].date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
        let updated = latest_rows(&conn, None, 10).unwrap();
        assert_eq!(updated[1].close, Some(110.0));
    }

    #[test]
    fn replace_supersedes_only_loaded_symbols() {
        let mut conn = conn();
        let first = vec![
            row("AAPL", "2024-01-02", 101.0),
            row("AAPL", "2024-01-03", 102.0),
            row("MSFT", "2024-01-02", 370.0),
        ];
        save_rows(&mut conn, &first, LoadStrategy::Upsert).unwrap();

        save_rows(&mut conn, &[row("AAPL", "2024-01-04", 103.0)], LoadStrategy::Replace).unwrap();

        assert_eq!(count_rows(&conn).unwrap(), 2);
        let aapl = latest_rows(&conn, Some("AAPL"), 10).unwrap();
        assert_eq!(aapl.len(), 1);
        assert_eq!(latest_rows(&conn, Some("MSFT"), 10).unwrap().len(), 1);
    }

    #[test]
    fn failed_insert_rolls_back_everything() {
        let mut conn = conn();
        save_rows(&mut conn, &[row("AAPL", "2024-01-02", 101.0)], LoadStrategy::Upsert).unwrap();
        conn.execute(
            "CREATE TRIGGER reject_tsla BEFORE INSERT ON financial_data
             WHEN NEW.symbol = 'TSLA' BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            [],
        )
        .unwrap();

        let batch = vec![row("AAPL", "2024-01-03", 102.0), row("TSLA", "2024-01-03", 250.0)];
        assert!(save_rows(&mut conn, &batch, LoadStrategy::Replace).is_err());

        assert!(conn.is_autocommit());
        assert_eq!(count_rows(&conn).unwrap(), 1);
        let kept = latest_rows(&conn, None, 10).unwrap();
        assert_eq!(kept[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn null_columns_round_trip() {
        let mut conn = conn();
        let mut sparse = row("AAPL", "2024-01-02", 101.0);
        sparse.volume = None;
        sparse.daily_gain = None;
        save_rows(&mut conn, &[sparse.clone()], LoadStrategy::Upsert).unwrap();
        assert_eq!(latest_rows(&conn, None, 1).unwrap(), vec![sparse]);
    }
}
