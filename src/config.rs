use std::collections::HashMap;
use thiserror::Error;

/// Settings keys recognized on the fallback query string. Host-supplied
/// settings use the same names.
pub const KEY_SPREADSHEET_ID: &str = "SpreadsheetId";
pub const KEY_SHEET_NAME: &str = "SheetName";
pub const KEY_VALUE_COLUMN: &str = "ValueColumn";
pub const KEY_LABEL_COLUMN: &str = "LabelColumn";
pub const KEY_QUESTION_LABEL: &str = "QuestionLabel";
pub const KEY_MIN_SEARCH_LENGTH: &str = "MinSearchLength";
pub const KEY_DEBOUNCE_DELAY: &str = "DebounceDelay";

const ALLOWED_KEYS: [&str; 7] = [
    KEY_SPREADSHEET_ID,
    KEY_SHEET_NAME,
    KEY_VALUE_COLUMN,
    KEY_LABEL_COLUMN,
    KEY_QUESTION_LABEL,
    KEY_MIN_SEARCH_LENGTH,
    KEY_DEBOUNCE_DELAY,
];

pub const DEFAULT_SHEET_NAME: &str = "Sheet1";
pub const DEFAULT_MIN_SEARCH_LENGTH: usize = 2;
pub const DEFAULT_DEBOUNCE_DELAY_MS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub value_column: char,
    pub label_column: char,
    pub question_label: String,
    pub min_search_length: usize,
    pub debounce_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required settings: {}", missing.join(", "))]
pub struct ConfigError {
    /// Every missing required parameter, not just the first one found.
    pub missing: Vec<String>,
}

/// Resolve operating parameters from the host's settings map, falling back
/// to a query string (standalone mode) when the host supplies nothing.
pub fn resolve(
    host_settings: &HashMap<String, String>,
    query_string: &str,
) -> Result<Config, ConfigError> {
    let settings = if host_settings.is_empty() {
        parse_query_string(query_string)
    } else {
        host_settings.clone()
    };

    let spreadsheet_id = settings
        .get(KEY_SPREADSHEET_ID)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let mut missing = Vec::new();
    if spreadsheet_id.is_empty() {
        missing.push(KEY_SPREADSHEET_ID.to_string());
    }
    if !missing.is_empty() {
        return Err(ConfigError { missing });
    }

    Ok(Config {
        spreadsheet_id,
        sheet_name: non_empty_or(&settings, KEY_SHEET_NAME, DEFAULT_SHEET_NAME),
        value_column: column_or_default(&settings, KEY_VALUE_COLUMN),
        label_column: column_or_default(&settings, KEY_LABEL_COLUMN),
        question_label: settings
            .get(KEY_QUESTION_LABEL)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        min_search_length: parse_or(&settings, KEY_MIN_SEARCH_LENGTH, DEFAULT_MIN_SEARCH_LENGTH),
        debounce_delay_ms: parse_or(&settings, KEY_DEBOUNCE_DELAY, DEFAULT_DEBOUNCE_DELAY_MS),
    })
}

fn non_empty_or(settings: &HashMap<String, String>, key: &str, default: &str) -> String {
    match settings.get(key).map(|s| s.trim()) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

/// Column settings are spreadsheet letters ("A", "B", ...). Anything that
/// does not start with an ASCII letter falls back to column A.
fn column_or_default(settings: &HashMap<String, String>, key: &str) -> char {
    settings
        .get(key)
        .and_then(|s| s.trim().chars().next())
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('A')
}

// Bad numeric settings are absorbed with the default, never surfaced.
fn parse_or<T: std::str::FromStr>(settings: &HashMap<String, String>, key: &str, default: T) -> T {
    settings
        .get(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse `Key=value&Key2=value2` pairs, keeping only recognized keys.
/// A leading `?` is tolerated; `+` and `%XX` escapes are decoded.
pub fn parse_query_string(query_string: &str) -> HashMap<String, String> {
    let raw = query_string.trim().trim_start_matches('?');
    let mut out = HashMap::new();
    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        };
        let key = percent_decode(key);
        if !ALLOWED_KEYS.contains(&key.as_str()) {
            continue;
        }
        out.insert(key, percent_decode(value));
    }
    out
}

fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                match bytes
                    .get(i + 1..i + 3)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).to_string()
}
