use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::{
    config::Config,
    constants::EXCHANGE_TZ,
    http::client::RequestError,
    marketdata::{
        api_caller::{CandleSource, WideCandles},
        response::DailyCandles,
    },
    model::{StageOutcome, StockBar},
};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Provider request failed: {0}")]
    Request(#[from] RequestError),
    #[error("Malformed series for {symbol}: column '{column}' has {len} values, expected {expected}")]
    Malformed {
        symbol: String,
        column: &'static str,
        len: usize,
        expected: usize,
    },
    #[error("Invalid timestamp {1} for {0}")]
    InvalidTimestamp(String, i64),
}

/// Fetches every configured ticker in one batched call and reshapes the result into bars.
/// Failures are logged and reported as `StageOutcome::Failed`, never propagated.
pub async fn extract<S: CandleSource>(source: &S, config: &Config) -> StageOutcome<StockBar> {
    log::info!(
        "Extracting data for {:?} from {} to {}",
        config.tickers,
        config.start,
        config.end
    );

    let result = match source
        .daily_candles(&config.tickers, config.start, config.end)
        .await
    {
        Ok(wide) => reshape(&config.tickers, &wide, config.start, config.end),
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(bars) => {
            log::info!("Extraction finished, {} raw rows", bars.len());
            StageOutcome::from_rows(bars)
        }
        Err(e) => {
            log::error!("Extraction failed: {}", e);
            StageOutcome::Failed(e.to_string())
        }
    }
}

/// Turns the per-symbol response into one bar per (symbol, date).
/// Symbols come out in `tickers` order, rows in source order within a symbol.
pub fn reshape(
    tickers: &[String],
    wide: &WideCandles,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<StockBar>, ExtractError> {
    let mut bars = Vec::new();
    for symbol in tickers {
        let Some(series) = wide.get(symbol) else {
            log::warn!("No data for {}", symbol);
            continue;
        };
        check_lengths(symbol, series)?;

        // later observations for the same date replace earlier ones
        let mut seen: HashMap<NaiveDate, usize> = HashMap::new();
        let before = bars.len();
        for i in 0..series.t.len() {
            let bar = StockBar {
                symbol: symbol.clone(),
                date: trading_date(symbol, series.t[i])?,
                open: series.o[i],
                high: series.h[i],
                low: series.l[i],
                close: series.c[i],
                volume: series.v[i],
            };
            if bar.date < start || bar.date > end || is_empty(&bar) {
                continue;
            }
            let existing = seen.get(&bar.date).copied();
            match existing {
                Some(pos) => bars[pos] = bar,
                None => {
                    seen.insert(bar.date, bars.len());
                    bars.push(bar);
                }
            }
        }
        log::info!("{}: {} rows", symbol, bars.len() - before);
    }
    Ok(bars)
}

fn check_lengths(symbol: &str, series: &DailyCandles) -> Result<(), ExtractError> {
    let expected = series.t.len();
    let columns = [
        ("open", series.o.len()),
        ("high", series.h.len()),
        ("low", series.l.len()),
        ("close", series.c.len()),
        ("volume", series.v.len()),
    ];
    for (column, len) in columns {
        if len != expected {
            return Err(ExtractError::Malformed {
                symbol: symbol.into(),
                column,
                len,
                expected,
            });
        }
    }
    Ok(())
}

// Calendar date of a candle timestamp, in the exchange time zone.
fn trading_date(symbol: &str, timestamp: i64) -> Result<NaiveDate, ExtractError> {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|utc| utc.with_timezone(&EXCHANGE_TZ).date_naive())
        .ok_or_else(|| ExtractError::InvalidTimestamp(symbol.into(), timestamp))
}

fn is_empty(bar: &StockBar) -> bool {
    bar.open.is_none()
        && bar.high.is_none()
        && bar.low.is_none()
        && bar.close.is_none()
        && bar.volume.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Destination, LoadStrategy};
    use crate::marketdata::fake::{FakeSource, candles, timestamp};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn config(tickers: &[&str]) -> Config {
        Config::new(
            tickers.iter().map(|s| s.to_string()).collect(),
            30,
            date("2024-01-31"),
            Destination::Sqlite {
                path: "unused.db".into(),
            },
            LoadStrategy::Upsert,
            None,
        )
        .unwrap()
    }

    fn tickers(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reshape_keeps_ticker_order_and_source_order() {
        let mut wide = WideCandles::new();
        wide.insert(
            "MSFT".into(),
            candles(&[
                ("2024-01-02", 370.0, 375.0, 366.0, 370.9, 25_000_000),
                ("2024-01-03", 369.0, 373.0, 368.0, 370.6, 23_000_000),
            ]),
        );
        wide.insert(
            "AAPL".into(),
            candles(&[("2024-01-02", 187.1, 188.4, 183.8, 185.6, 82_000_000)]),
        );

        let bars = reshape(
            &tickers(&["AAPL", "MSFT"]),
            &wide,
            date("2024-01-01"),
            date("2024-01-31"),
        )
        .unwrap();

        let keys: Vec<(&str, NaiveDate)> = bars.iter().map(|b| (b.symbol.as_str(), b.date)).collect();
        assert_eq!(
            keys,
            vec![
                ("AAPL", date("2024-01-02")),
                ("MSFT", date("2024-01-02")),
                ("MSFT", date("2024-01-03")),
            ]
        );
        assert_eq!(bars[0].open, Some(187.1));
        assert_eq!(bars[0].volume, Some(82_000_000));
    }

    #[test]
    fn reshape_drops_fully_empty_rows_and_keeps_partial_ones() {
        let mut series = candles(&[
            ("2024-01-02", 150.0, 152.0, 149.0, 151.0, 1000),
            ("2024-01-03", 0.0, 0.0, 0.0, 0.0, 0),
            ("2024-01-04", 151.0, 153.0, 150.0, 152.0, 1200),
        ]);
        series.o[1] = None;
        series.h[1] = None;
        series.l[1] = None;
        series.c[1] = None;
        series.v[1] = None;
        series.v[2] = None;

        let mut wide = WideCandles::new();
        wide.insert("AAPL".into(), series);
        let bars = reshape(&tickers(&["AAPL"]), &wide, date("2024-01-01"), date("2024-01-31")).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].date, date("2024-01-04"));
        assert_eq!(bars[1].volume, None);
        assert_eq!(bars[1].close, Some(152.0));
    }

    #[test]
    fn reshape_discards_dates_outside_window() {
        let mut wide = WideCandles::new();
        wide.insert(
            "AAPL".into(),
            candles(&[
                ("2023-12-29", 1.0, 1.0, 1.0, 1.0, 1),
                ("2024-01-02", 1.0, 1.0, 1.0, 1.0, 1),
                ("2024-02-01", 1.0, 1.0, 1.0, 1.0, 1),
            ]),
        );
        let start = date("2024-01-01");
        let end = date("2024-01-31");
        let bars = reshape(&tickers(&["AAPL"]), &wide, start, end).unwrap();

        assert_eq!(bars.len(), 1);
        assert!(bars.iter().all(|b| b.date >= start && b.date <= end));
    }

    #[test]
    fn reshape_keeps_last_observation_for_duplicate_dates() {
        let mut wide = WideCandles::new();
        wide.insert(
            "AAPL".into(),
            candles(&[
                ("2024-01-02", 1.0, 1.0, 1.0, 1.0, 1),
                ("2024-01-02", 2.0, 2.0, 2.0, 2.0, 2),
            ]),
        );
        let bars = reshape(&tickers(&["AAPL"]), &wide, date("2024-01-01"), date("2024-01-31")).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].open, Some(2.0));
    }

    #[test]
    fn reshape_rejects_ragged_columns() {
        let mut series = candles(&[("2024-01-02", 1.0, 1.0, 1.0, 1.0, 1)]);
        series.t.push(timestamp("2024-01-03"));
        let mut wide = WideCandles::new();
        wide.insert("AAPL".into(), series);

        let err = reshape(&tickers(&["AAPL"]), &wide, date("2024-01-01"), date("2024-01-31")).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Malformed {
                column: "open",
                len: 1,
                expected: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn extract_only_returns_symbols_with_data() {
        let mut wide = WideCandles::new();
        wide.insert(
            "AAPL".into(),
            candles(&[("2024-01-02", 150.0, 152.0, 149.0, 151.0, 1000)]),
        );
        let source = FakeSource::new(wide);

        let outcome = extract(&source, &config(&["AAPL", "MSFT"])).await;
        let bars = outcome.rows();
        assert_eq!(bars.len(), 1);
        assert!(bars.iter().all(|b| b.symbol == "AAPL"));
        assert_eq!(source.calls.get(), 1);
    }

    #[tokio::test]
    async fn extract_single_symbol_has_same_shape() {
        let mut wide = WideCandles::new();
        wide.insert(
            "AAPL".into(),
            candles(&[("2024-01-02", 150.0, 152.0, 149.0, 151.0, 1000)]),
        );
        let outcome = extract(&FakeSource::new(wide), &config(&["AAPL"])).await;
        assert_eq!(
            outcome,
            StageOutcome::Rows(vec![StockBar {
                symbol: "AAPL".into(),
                date: date("2024-01-02"),
                open: Some(150.0),
                high: Some(152.0),
                low: Some(149.0),
                close: Some(151.0),
                volume: Some(1000),
            }])
        );
    }

    #[tokio::test]
    async fn extract_reports_empty_and_failed() {
        let outcome = extract(&FakeSource::new(WideCandles::new()), &config(&["AAPL"])).await;
        assert_eq!(outcome, StageOutcome::Empty);

        let outcome = extract(&FakeSource::failing(), &config(&["AAPL"])).await;
        assert!(matches!(outcome, StageOutcome::Failed(_)));
        assert!(outcome.rows().is_empty());
    }
}
