use serde::Deserialize;

/// Raw body of the daily candles endpoint. Every column is parallel to `t`.
/// A `no_data` body carries only `s`, so the columns default to empty.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct DailyCandles {
    pub s: String,
    #[serde(default)]
    pub t: Vec<i64>,
    #[serde(default)]
    pub o: Vec<Option<f64>>,
    #[serde(default)]
    pub h: Vec<Option<f64>>,
    #[serde(default)]
    pub l: Vec<Option<f64>>,
    #[serde(default)]
    pub c: Vec<Option<f64>>,
    #[serde(default)]
    pub v: Vec<Option<i64>>,
    pub errmsg: Option<String>,
}
