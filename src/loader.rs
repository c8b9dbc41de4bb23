use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

/// One selectable row. Duplicates are allowed and kept in load order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("request failed with status {status}")]
    Fetch { status: u16 },
    #[error("request failed: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Format(String),
}

const GVIZ_CALLBACK_PREFIX: &str = "google.visualization.Query.setResponse(";

pub fn build_url(config: &Config) -> String {
    format!(
        "https://docs.google.com/spreadsheets/d/{}/gviz/tq?tqx=out:json&sheet={}",
        percent_encode(&config.spreadsheet_id),
        percent_encode(&config.sheet_name)
    )
}

/// Fetch the sheet and convert its rows into choices. One-shot: retry is the
/// caller's (user's) decision, there is no backoff here.
pub fn load(config: &Config) -> Result<Vec<Choice>, LoadError> {
    let url = build_url(config);
    debug!(%url, "loading sheet");
    let body = match ureq::get(&url).call() {
        Ok(response) => response
            .into_string()
            .map_err(|e| LoadError::Network(e.to_string()))?,
        Err(ureq::Error::Status(status, _)) => return Err(LoadError::Fetch { status }),
        Err(ureq::Error::Transport(transport)) => {
            return Err(LoadError::Network(transport.to_string()))
        }
    };
    let choices = parse_response(&body, config.value_column, config.label_column)?;
    debug!(count = choices.len(), "sheet loaded");
    Ok(choices)
}

/// Strip the gviz callback envelope and map table rows to choices.
pub fn parse_response(
    body: &str,
    value_column: char,
    label_column: char,
) -> Result<Vec<Choice>, LoadError> {
    let payload: GvizPayload = serde_json::from_str(unwrap_envelope(body)?)
        .map_err(|e| LoadError::Format(format!("bad payload JSON: {e}")))?;

    if payload.status.as_deref() == Some("error") {
        let message = payload
            .errors
            .iter()
            .flatten()
            .find_map(|e| e.message.clone())
            .unwrap_or_else(|| "sheet query reported an error".to_string());
        return Err(LoadError::Format(message));
    }

    let rows = payload.table.map(|t| t.rows).unwrap_or_default();
    let value_idx = column_index(value_column);
    let label_idx = column_index(label_column);

    // The first row carries the column headers, never data.
    let mut choices = Vec::new();
    for row in rows.iter().skip(1) {
        let value = cell_text(row.c.get(value_idx));
        let mut label = cell_text(row.c.get(label_idx));
        if value.is_empty() && label.is_empty() {
            continue;
        }
        if label.is_empty() {
            label = value.clone();
        }
        choices.push(Choice { value, label });
    }
    Ok(choices)
}

fn unwrap_envelope(body: &str) -> Result<&str, LoadError> {
    let start = body
        .find(GVIZ_CALLBACK_PREFIX)
        .ok_or_else(|| LoadError::Format("response is not a gviz callback".to_string()))?
        + GVIZ_CALLBACK_PREFIX.len();
    let end = body
        .rfind(')')
        .filter(|&end| end >= start)
        .ok_or_else(|| LoadError::Format("gviz callback is not terminated".to_string()))?;
    Ok(&body[start..end])
}

/// Spreadsheet letter to zero-based column index, `A` -> 0.
pub fn column_index(column: char) -> usize {
    (column.to_ascii_uppercase() as u8).saturating_sub(b'A') as usize
}

/// A cell prefers its raw value over the formatted string; a missing cell
/// is an empty string. The original cell type is not preserved.
fn cell_text(cell: Option<&Option<GvizCell>>) -> String {
    let Some(Some(cell)) = cell else {
        return String::new();
    };
    match &cell.v {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => format_number(n),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        Some(other) if !other.is_null() => other.to_string(),
        _ => cell.f.clone().unwrap_or_default(),
    }
}

// gviz delivers every numeric cell as a float; render integral ones
// without the trailing ".0".
fn format_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9e15 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

fn percent_encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[derive(Debug, Deserialize)]
struct GvizPayload {
    status: Option<String>,
    errors: Option<Vec<GvizError>>,
    table: Option<GvizTable>,
}

#[derive(Debug, Deserialize)]
struct GvizError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GvizTable {
    #[serde(default)]
    rows: Vec<GvizRow>,
}

#[derive(Debug, Deserialize)]
struct GvizRow {
    #[serde(default)]
    c: Vec<Option<GvizCell>>,
}

#[derive(Debug, Deserialize)]
struct GvizCell {
    #[serde(default)]
    v: Option<serde_json::Value>,
    #[serde(default)]
    f: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, KEY_SPREADSHEET_ID};
    use std::collections::HashMap;

    fn wrap(json: &str) -> String {
        format!("/*O_o*/\ngoogle.visualization.Query.setResponse({json});")
    }

    fn test_config() -> Config {
        let settings: HashMap<String, String> =
            [(KEY_SPREADSHEET_ID.to_string(), "abc123".to_string())].into();
        resolve(&settings, "").expect("config")
    }

    #[test]
    fn url_templates_id_and_sheet_name() {
        let mut config = test_config();
        config.sheet_name = "My Sheet".to_string();
        assert_eq!(
            build_url(&config),
            "https://docs.google.com/spreadsheets/d/abc123/gviz/tq?tqx=out:json&sheet=My%20Sheet"
        );
    }

    #[test]
    fn header_row_is_skipped_and_rows_map_in_source_order() {
        let body = wrap(
            r#"{"status":"ok","table":{"rows":[
                {"c":[{"v":"Value"}]},
                {"c":[{"v":"banana"}]},
                {"c":[{"v":"apple"}]}
            ]}}"#,
        );
        let choices = parse_response(&body, 'A', 'A').unwrap();
        let labels: Vec<&str> = choices.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, ["banana", "apple"]);
    }

    #[test]
    fn value_and_label_come_from_configured_columns() {
        let body = wrap(
            r#"{"status":"ok","table":{"rows":[
                {"c":[{"v":"id"},{"v":"name"}]},
                {"c":[{"v":"a1"},{"v":"Apple"}]}
            ]}}"#,
        );
        let choices = parse_response(&body, 'A', 'B').unwrap();
        assert_eq!(
            choices,
            vec![Choice {
                value: "a1".to_string(),
                label: "Apple".to_string()
            }]
        );
    }

    #[test]
    fn empty_rows_are_dropped_and_empty_label_falls_back_to_value() {
        let body = wrap(
            r#"{"status":"ok","table":{"rows":[
                {"c":[{"v":"id"},{"v":"name"}]},
                {"c":[null,null]},
                {"c":[{"v":"X1"},null]}
            ]}}"#,
        );
        let choices = parse_response(&body, 'A', 'B').unwrap();
        assert_eq!(
            choices,
            vec![Choice {
                value: "X1".to_string(),
                label: "X1".to_string()
            }]
        );
    }

    #[test]
    fn cell_prefers_raw_value_then_formatted_then_empty() {
        let body = wrap(
            r#"{"status":"ok","table":{"rows":[
                {"c":[{"v":"id"}]},
                {"c":[{"v":null,"f":"Formatted"}]},
                {"c":[{"v":12.0,"f":"12.00"}]},
                {"c":[{"v":12.5}]}
            ]}}"#,
        );
        let choices = parse_response(&body, 'A', 'A').unwrap();
        let values: Vec<&str> = choices.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, ["Formatted", "12", "12.5"]);
    }

    #[test]
    fn missing_callback_prefix_is_a_format_error() {
        let err = parse_response(r#"{"status":"ok"}"#, 'A', 'A').unwrap_err();
        assert!(matches!(err, LoadError::Format(_)));
    }

    #[test]
    fn payload_error_status_uses_the_reported_message() {
        let body = wrap(r#"{"status":"error","errors":[{"message":"no such sheet"}]}"#);
        let err = parse_response(&body, 'A', 'A').unwrap_err();
        match err {
            LoadError::Format(message) => assert_eq!(message, "no such sheet"),
            other => panic!("expected Format, got {other:?}"),
        }
    }

    #[test]
    fn payload_error_without_message_gets_a_generic_one() {
        let body = wrap(r#"{"status":"error"}"#);
        match parse_response(&body, 'A', 'A').unwrap_err() {
            LoadError::Format(message) => assert!(message.contains("error")),
            other => panic!("expected Format, got {other:?}"),
        }
    }

    #[test]
    fn column_letters_map_to_zero_based_indices() {
        assert_eq!(column_index('A'), 0);
        assert_eq!(column_index('b'), 1);
        assert_eq!(column_index('Z'), 25);
    }
}
