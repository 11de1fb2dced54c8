use std::collections::BTreeMap;

use crate::model::{COLUMNS, FinancialRow};

/// Per-symbol figures shown under the table.
#[derive(Debug, PartialEq)]
pub struct SymbolSummary {
    pub symbol: String,
    pub rows: usize,
    pub latest_close: Option<f64>,
    pub mean_daily_gain: Option<f64>,
}

/// Summarizes rows that arrive newest first, as `read_latest` returns them.
pub fn summarize(rows: &[FinancialRow]) -> Vec<SymbolSummary> {
    let mut by_symbol: BTreeMap<&str, Vec<&FinancialRow>> = BTreeMap::new();
    for row in rows {
        by_symbol.entry(row.symbol.as_str()).or_default().push(row);
    }

    by_symbol
        .into_iter()
        .map(|(symbol, rows)| {
            let gains: Vec<f64> = rows.iter().filter_map(|r| r.daily_gain).collect();
            SymbolSummary {
                symbol: symbol.into(),
                rows: rows.len(),
                latest_close: rows.first().and_then(|r| r.close),
                mean_daily_gain: if gains.is_empty() {
                    None
                } else {
                    Some(gains.iter().sum::<f64>() / gains.len() as f64)
                },
            }
        })
        .collect()
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{:.4}", v)).unwrap_or_default()
}

/// Renders the rows and their summary as plain text.
pub fn render(rows: &[FinancialRow]) -> String {
    let mut out = String::new();
    out.push_str(&COLUMNS.join("\t"));
    out.push('\n');
    for row in rows {
        let line = [
            row.symbol.clone(),
            row.date.to_string(),
            cell(row.open),
            cell(row.high),
            cell(row.low),
            cell(row.close),
            row.volume.map(|v| v.to_string()).unwrap_or_default(),
            cell(row.average_price),
            cell(row.daily_gain),
        ];
        out.push_str(&line.join("\t"));
        out.push('\n');
    }

    out.push_str("\nsymbol\trows\tlatest_close\tmean_daily_gain\n");
    for summary in summarize(rows) {
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\n",
            summary.symbol,
            summary.rows,
            cell(summary.latest_close),
            cell(summary.mean_daily_gain)
        ));
    }
    out
}
