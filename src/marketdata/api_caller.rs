use super::response;
use crate::http::client::{self, RequestError};
use chrono::NaiveDate;
use std::{collections::HashMap, env};

// Base URL for the market data API.
const BASE_URL: &str = "https://api.marketdata.app/";

/// Provider response keyed per symbol. Symbols without data have no entry.
pub type WideCandles = HashMap<String, response::DailyCandles>;

/// A source of daily candles for a batch of symbols.
pub trait CandleSource {
    /// Fetches the daily series of every symbol between `from` and `to`, inclusive.
    async fn daily_candles(
        &self,
        symbols: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<WideCandles, RequestError>;
}

/// Client for the marketdata.app REST API.
pub struct MarketDataApp {
    base_url: String,
    token: String,
}

impl MarketDataApp {
    /// Builds a client with the token from the `marketdata_token` environment variable.
    pub fn from_env() -> Result<Self, RequestError> {
        let token = env::var("marketdata_token").map_err(|_| RequestError::TokenNotSet)?;
        Ok(Self {
            base_url: BASE_URL.into(),
            token,
        })
    }

    async fn stock_candles(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<response::DailyCandles>, RequestError> {
        let url = client::build_url(
            &self.base_url,
            &format!("v1/stocks/candles/daily/{}/", symbol),
            &[
                ("from", from.format("%Y-%m-%d").to_string()),
                ("to", to.format("%Y-%m-%d").to_string()),
            ],
        )?;
        let resp = client::get::<response::DailyCandles>(url, Some(&self.token)).await?;

        if has_data(&resp.s, &resp.errmsg)? {
            Ok(Some(resp))
        } else {
            Ok(None)
        }
    }
}

impl CandleSource for MarketDataApp {
    async fn daily_candles(
        &self,
        symbols: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<WideCandles, RequestError> {
        let mut wide = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            match self.stock_candles(symbol, from, to).await? {
                Some(candles) => {
                    log::debug!("{}: {} candles received", symbol, candles.t.len());
                    wide.insert(symbol.clone(), candles);
                }
                None => log::warn!("{}: provider returned no data", symbol),
            }
        }
        Ok(wide)
    }
}

// Checks the status returned from the API. "no_data" is not an error, it just yields nothing.
fn has_data(s: &str, err: &Option<String>) -> Result<bool, RequestError> {
    match s {
        "ok" => Ok(true),
        "no_data" => Ok(false),
        "error" => Err(RequestError::Provider(
            err.clone().unwrap_or_else(|| "Unknown error".into()),
        )),
        other => Err(RequestError::Provider(format!("Unknown status {}", other))),
    }
}
