use std::{fs, path::Path};

use csv::Writer;

use crate::model::{COLUMNS, FinancialRow};

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

/// Writes the transformed rows as CSV, header first, empty cells for nulls.
pub fn write_preview(path: &Path, rows: &[FinancialRow]) -> Result<(), csv::Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = Writer::from_path(path)?;

    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.write_record([
            row.symbol.clone(),
            row.date.format("%Y-%m-%d").to_string(),
            opt(&row.open),
            opt(&row.high),
            opt(&row.low),
            opt(&row.close),
            opt(&row.volume),
            opt(&row.average_price),
            opt(&row.daily_gain),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::env;

    #[test]
    fn preview_has_header_and_empty_cells_for_nulls() {
        let path = env::temp_dir()
            .join(format!("financial_etl_export_{}", std::process::id()))
            .join("preview.csv");
        let rows = vec![FinancialRow {
            symbol: "AAPL".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: Some(0.0),
            high: Some(1.0),
            low: Some(0.0),
            close: Some(1.0),
            volume: Some(1000),
            average_price: Some(0.5),
            daily_gain: None,
        }];

        write_preview(&path, &rows).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "symbol,date,open,high,low,close,volume,average_price,daily_gain"
        );
        assert_eq!(lines[1], "AAPL,2024-01-02,0,1,0,1,1000,0.5,");

        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }
}
