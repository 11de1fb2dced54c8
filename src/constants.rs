use chrono_tz::Tz;

/// Tickers pulled when no symbols file is given.
pub const DEFAULT_TICKERS: [&str; 5] = ["AAPL", "MSFT", "GOOGL", "AMZN", "TSLA"];

/// Trailing window of daily data, two years.
pub const LOOKBACK_DAYS: u32 = 730;

/// Default SQLite file when neither `--sqlite-file` nor `sqlite_file` is set.
pub const DEFAULT_SQLITE_FILE: &str = "data/financial_data.db";

/// Time zone candle timestamps are converted into before taking the date.
pub const EXCHANGE_TZ: Tz = chrono_tz::America::New_York;

/// Interval between scheduled runs.
pub const SCHEDULE_PERIOD_SECS: u64 = 24 * 60 * 60;

/// Rows printed by `show` when no limit is given.
pub const SHOW_LIMIT: usize = 20;
