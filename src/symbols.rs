use std::{
    fs::OpenOptions,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::config::ConfigError;

/// Reads one ticker per line. Blank lines are skipped with a warning.
pub fn read_symbols_from_file(symbols_file_path: &Path) -> Result<Vec<String>, ConfigError> {
    // Validate symbols file path
    if !symbols_file_path.exists() {
        return Err(ConfigError::FileNotFound(
            symbols_file_path.display().to_string(),
        ));
    }

    let file = OpenOptions::new().read(true).open(symbols_file_path)?;

    let mut symbols = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            log::warn!("line {} is empty", i + 1);
            continue;
        }
        symbols.push(line.trim().to_string());
    }
    Ok(symbols)
}
