use tokio_postgres::{Client, NoTls, Row, Transaction};

use crate::{
    config::{LoadStrategy, PgParams},
    model,
};

/// Connects and drives the connection on a background task.
pub async fn connect(params: &PgParams) -> Result<Client, tokio_postgres::Error> {
    let (client, connection) = params.to_pg_config().connect(NoTls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            log::error!("PostgreSQL connection error: {}", e);
        }
    });
    log::info!(
        "Connected to PostgreSQL at {}:{}/{}",
        params.host,
        params.port,
        params.dbname
    );
    Ok(client)
}

pub async fn create_table(client: &Client) -> Result<(), tokio_postgres::Error> {
    client
        .batch_execute(
            r#"
            CREATE TABLE IF NOT EXISTS financial_data (
                symbol VARCHAR(16) NOT NULL,
                date DATE NOT NULL,
                open DOUBLE PRECISION,
                high DOUBLE PRECISION,
                low DOUBLE PRECISION,
                close DOUBLE PRECISION,
                volume BIGINT,
                average_price DOUBLE PRECISION,
                daily_gain DOUBLE PRECISION,
                PRIMARY KEY (symbol, date)
            )
            "#,
        )
        .await
}

/// Writes all rows in one transaction, rolled back on the first error.
pub async fn save_rows(
    client: &mut Client,
    rows: &[model::FinancialRow],
    strategy: LoadStrategy,
) -> Result<usize, tokio_postgres::Error> {
    let transaction = client.transaction().await?;
    match write_rows(&transaction, rows, strategy).await {
        Ok(written) => {
            transaction.commit().await?;
            Ok(written)
        }
        Err(e) => {
            log::error!("Write to financial_data failed, rolling back: {}", e);
            if let Err(rollback_err) = transaction.rollback().await {
                log::error!("Rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

async fn write_rows(
    transaction: &Transaction<'_>,
    rows: &[model::FinancialRow],
    strategy: LoadStrategy,
) -> Result<usize, tokio_postgres::Error> {
    if strategy == LoadStrategy::Replace {
        let mut symbols: Vec<String> = rows.iter().map(|r| r.symbol.clone()).collect();
        symbols.sort();
        symbols.dedup();
        let deleted = transaction
            .execute(
                "DELETE FROM financial_data WHERE symbol = ANY($1)",
                &[&symbols],
            )
            .await?;
        log::debug!("Deleted {} rows for {:?}", deleted, symbols);
    }

    let stmt = transaction
        .prepare(
            r#"
            INSERT INTO financial_data
                (symbol, date, open, high, low, close, volume, average_price, daily_gain)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (symbol, date) DO UPDATE SET
                open = EXCLUDED.open,
                high = EXCLUDED.high,
                low = EXCLUDED.low,
                close = EXCLUDED.close,
                volume = EXCLUDED.volume,
                average_price = EXCLUDED.average_price,
                daily_gain = EXCLUDED.daily_gain
            "#,
        )
        .await?;
    for row in rows {
        transaction
            .execute(
                &stmt,
                &[
                    &row.symbol,
                    &row.date,
                    &row.open,
                    &row.high,
                    &row.low,
                    &row.close,
                    &row.volume,
                    &row.average_price,
                    &row.daily_gain,
                ],
            )
            .await?;
    }
    Ok(rows.len())
}

pub async fn table_exists(client: &Client) -> Result<bool, tokio_postgres::Error> {
    let row = client
        .query_one("SELECT to_regclass('financial_data') IS NOT NULL", &[])
        .await?;
    Ok(row.get(0))
}

pub async fn count_rows(client: &Client) -> Result<i64, tokio_postgres::Error> {
    let row = client
        .query_one("SELECT COUNT(*) FROM financial_data", &[])
        .await?;
    Ok(row.get(0))
}

/// Most recent rows first, optionally for one symbol.
pub async fn latest_rows(
    client: &Client,
    symbol: Option<&str>,
    limit: usize,
) -> Result<Vec<model::FinancialRow>, tokio_postgres::Error> {
    let rows = client
        .query(
            r#"
            SELECT symbol, date, open, high, low, close, volume, average_price, daily_gain
            FROM financial_data
            WHERE ($1::TEXT IS NULL OR symbol = $1)
            ORDER BY date DESC, symbol
            LIMIT $2
            "#,
            &[&symbol, &(limit as i64)],
        )
        .await?;
    Ok(rows.iter().map(from_row).collect())
}

fn from_row(row: &Row) -> model::FinancialRow {
    model::FinancialRow {
        symbol: row.get("symbol"),
        date: row.get("date"),
        open: row.get("open"),
        high: row.get("high"),
        low: row.get("low"),
        close: row.get("close"),
        volume: row.get("volume"),
        average_price: row.get("average_price"),
        daily_gain: row.get("daily_gain"),
    }
}
