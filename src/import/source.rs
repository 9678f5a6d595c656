//! Loading import rows from files exported out of the shop's spreadsheet.

use std::path::Path;

use serde_json::{Map, Value};

use super::ImportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Csv,
}

impl SourceFormat {
    /// Guess from the file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => SourceFormat::Csv,
            _ => SourceFormat::Json,
        }
    }
}

pub fn load_records(path: &Path, format: Option<SourceFormat>) -> Result<Vec<Value>, ImportError> {
    let content = std::fs::read(path)
        .map_err(|e| ImportError::Source(format!("{}: {}", path.display(), e)))?;

    match format.unwrap_or_else(|| SourceFormat::from_path(path)) {
        SourceFormat::Json => parse_json_records(&content),
        SourceFormat::Csv => parse_csv_records(&content),
    }
}

pub fn parse_json_records(content: &[u8]) -> Result<Vec<Value>, ImportError> {
    match serde_json::from_slice::<Value>(content) {
        Ok(Value::Array(records)) => Ok(records),
        Ok(_) => Err(ImportError::Source(
            "expected a JSON array of book records".to_string(),
        )),
        Err(e) => Err(ImportError::Source(format!("JSON parse error: {}", e))),
    }
}

/// Each CSV row becomes an object keyed by the header row.
pub fn parse_csv_records(content: &[u8]) -> Result<Vec<Value>, ImportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content);

    let headers = rdr
        .headers()
        .map_err(|e| ImportError::Source(format!("CSV parse error: {}", e)))?
        .clone();

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result.map_err(|e| ImportError::Source(format!("CSV parse error: {}", e)))?;
        let object: Map<String, Value> = headers
            .iter()
            .zip(row.iter())
            .map(|(key, value)| (key.trim().to_string(), Value::String(value.to_string())))
            .collect();
        records.push(Value::Object(object));
    }

    Ok(records)
}
