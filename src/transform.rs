use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{FinancialRow, StageOutcome, StockBar};

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Non-finite {column} for {symbol} on {date}: {value}")]
    NonFinitePrice {
        symbol: String,
        date: NaiveDate,
        column: &'static str,
        value: f64,
    },
}

/// Adds `average_price` and `daily_gain` to every bar, keeping the input order.
/// A failure on any row is logged and turns the whole stage into `Failed`.
pub fn transform(bars: Vec<StockBar>) -> StageOutcome<FinancialRow> {
    log::info!("Transforming {} rows", bars.len());

    let rows: Result<Vec<_>, _> = bars.into_iter().map(transform_bar).collect();
    match rows {
        Ok(rows) => {
            log::info!("Transformation finished, {} rows ready to load", rows.len());
            StageOutcome::from_rows(rows)
        }
        Err(e) => {
            log::error!("Transformation failed: {}", e);
            StageOutcome::Failed(e.to_string())
        }
    }
}

fn transform_bar(bar: StockBar) -> Result<FinancialRow, TransformError> {
    for (column, value) in [
        ("open", bar.open),
        ("high", bar.high),
        ("low", bar.low),
        ("close", bar.close),
    ] {
        if let Some(value) = value.filter(|v| !v.is_finite()) {
            return Err(TransformError::NonFinitePrice {
                symbol: bar.symbol,
                date: bar.date,
                column,
                value,
            });
        }
    }

    let average = average_price(bar.high, bar.low);
    if average.is_none() && bar.high.is_some() && bar.low.is_some() {
        log::warn!(
            "{} on {}: average_price overflows, left empty",
            bar.symbol,
            bar.date
        );
    }

    let gain = daily_gain(bar.open, bar.close);
    if gain.is_none() && bar.open.is_some() && bar.close.is_some() {
        log::warn!(
            "{} on {}: daily_gain undefined for open {:?}, left empty",
            bar.symbol,
            bar.date,
            bar.open
        );
    }

    Ok(FinancialRow {
        average_price: average,
        daily_gain: gain,
        symbol: bar.symbol,
        date: bar.date,
        open: bar.open,
        high: bar.high,
        low: bar.low,
        close: bar.close,
        volume: bar.volume,
    })
}

/// Midpoint of the session range. `None` when a price is missing or the sum overflows.
pub fn average_price(high: Option<f64>, low: Option<f64>) -> Option<f64> {
    Some((high? + low?) / 2.0).filter(|v| v.is_finite())
}

/// Percentage move from open to close. `None` when either price is missing, open is zero,
/// or the ratio is not finite (an open so small the division overflows).
pub fn daily_gain(open: Option<f64>, close: Option<f64>) -> Option<f64> {
    let open = open?;
    if open == 0.0 {
        return None;
    }
    Some((close? - open) / open * 100.0).filter(|v| v.is_finite())
}
