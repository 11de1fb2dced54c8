use chrono::NaiveDate;

/// One trading-day observation for one symbol, as extracted from the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct StockBar {
    pub symbol: String,      // Ticker symbol.
    pub date: NaiveDate,     // Trading date in the exchange time zone.
    pub open: Option<f64>,   // Opening price.
    pub high: Option<f64>,   // Highest price.
    pub low: Option<f64>,    // Lowest price.
    pub close: Option<f64>,  // Closing price.
    pub volume: Option<i64>, // Trading volume.
}

/// A row of the `financial_data` table: a bar plus its derived columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialRow {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
    pub average_price: Option<f64>, // (high + low) / 2
    pub daily_gain: Option<f64>,    // (close - open) / open * 100, null when open is zero
}

/// Column order shared by the table, the CSV preview and the `show` output.
pub const COLUMNS: [&str; 9] = [
    "symbol",
    "date",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "average_price",
    "daily_gain",
];

/// Pipeline stages, used to report where a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Transform,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Extract => write!(f, "extract"),
            Stage::Transform => write!(f, "transform"),
        }
    }
}

/// Result of a recoverable stage. Downstream stages only run on `Rows`.
#[derive(Debug, PartialEq)]
pub enum StageOutcome<T> {
    /// A non-empty set of rows.
    Rows(Vec<T>),
    /// The stage ran fine but produced nothing.
    Empty,
    /// The stage failed; the reason has already been logged.
    Failed(String),
}

impl<T> StageOutcome<T> {
    /// Wraps rows, folding an empty collection into `Empty`.
    pub fn from_rows(rows: Vec<T>) -> Self {
        if rows.is_empty() {
            StageOutcome::Empty
        } else {
            StageOutcome::Rows(rows)
        }
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[T] {
        match self {
            StageOutcome::Rows(rows) => rows,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_folds_empty() {
        let outcome: StageOutcome<u8> = StageOutcome::from_rows(vec![]);
        assert_eq!(outcome, StageOutcome::Empty);
        assert!(outcome.rows().is_empty());

        let outcome = StageOutcome::from_rows(vec![1u8, 2]);
        assert_eq!(outcome.rows(), &[1, 2]);
    }
}
