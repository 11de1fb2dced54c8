use super::api_caller::{CandleSource, WideCandles};
use super::response::DailyCandles;
use crate::constants::EXCHANGE_TZ;
use crate::http::client::RequestError;
use chrono::{NaiveDate, TimeZone};
use std::cell::Cell;

/// In-memory candle source for tests.
pub struct FakeSource {
    wide: Option<WideCandles>,
    pub calls: Cell<u32>,
}

impl FakeSource {
    pub fn new(wide: WideCandles) -> Self {
        Self {
            wide: Some(wide),
            calls: Cell::new(0),
        }
    }

    /// A source whose every call fails like an unreachable provider.
    pub fn failing() -> Self {
        Self {
            wide: None,
            calls: Cell::new(0),
        }
    }
}

impl CandleSource for FakeSource {
    async fn daily_candles(
        &self,
        symbols: &[String],
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<WideCandles, RequestError> {
        self.calls.set(self.calls.get() + 1);
        match &self.wide {
            Some(wide) => Ok(wide
                .iter()
                .filter(|(symbol, _)| symbols.contains(*symbol))
                .map(|(symbol, candles)| (symbol.clone(), candles.clone()))
                .collect()),
            None => Err(RequestError::Other("connection refused".into())),
        }
    }
}

/// Midnight of `date` in the exchange time zone, as the provider stamps daily candles.
pub fn timestamp(date: &str) -> i64 {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
    EXCHANGE_TZ
        .from_local_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
        .single()
        .unwrap()
        .timestamp()
}

/// One complete candle per (date, open, high, low, close, volume) tuple.
pub fn candles(rows: &[(&str, f64, f64, f64, f64, i64)]) -> DailyCandles {
    DailyCandles {
        s: "ok".into(),
        t: rows.iter().map(|r| timestamp(r.0)).collect(),
        o: rows.iter().map(|r| Some(r.1)).collect(),
        h: rows.iter().map(|r| Some(r.2)).collect(),
        l: rows.iter().map(|r| Some(r.3)).collect(),
        c: rows.iter().map(|r| Some(r.4)).collect(),
        v: rows.iter().map(|r| Some(r.5)).collect(),
        errmsg: None,
    }
}
