//! Data models for the monitoring payload and the aggregated report rows.
//!
//! The payload is walked as JSON, one level at a time, so that a fault in
//! one date or record never hides the rest of a keyword's data. Only the
//! leaf position record is decoded into a typed structure.

use crate::error::json_type_name;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

/// View a payload level as a map.
///
/// The API encodes empty maps as `[]`, so an empty list is an empty map.
/// Any other shape is returned as the name of what was found.
pub fn as_map(value: &Value) -> Result<&Map<String, Value>, &'static str> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Array(list) if list.is_empty() => Ok(empty_map()),
        other => Err(json_type_name(other)),
    }
}

fn empty_map() -> &'static Map<String, Value> {
    static EMPTY: OnceLock<Map<String, Value>> = OnceLock::new();
    EMPTY.get_or_init(Map::new)
}

/// Borrowed view of one keyword block: `{ keyword: { title }, data }`.
#[derive(Debug, Clone, Copy)]
pub struct KeywordBlock<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> KeywordBlock<'a> {
    pub fn new(fields: &'a Map<String, Value>) -> Self {
        Self { fields }
    }

    /// The keyword title, or an empty string when absent.
    pub fn title(&self) -> &'a str {
        self.fields
            .get("keyword")
            .and_then(|k| k.get("title"))
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// Per-date data keyed by ISO date. Missing or `null` means no data.
    pub fn data(&self) -> Result<&'a Map<String, Value>, &'static str> {
        match self.fields.get("data") {
            None | Some(Value::Null) => Ok(empty_map()),
            Some(data) => as_map(data),
        }
    }
}

/// The most recent `window_days` entries of a date map, newest first.
///
/// Selection is by key only; the entries themselves are not inspected.
pub fn recent_dates(data: &Map<String, Value>, window_days: usize) -> Vec<(&String, &Value)> {
    let mut dates: Vec<(&String, &Value)> = data.iter().collect();
    dates.sort_by(|a, b| b.0.cmp(a.0));
    dates.truncate(window_days);
    dates
}

/// A single position measurement.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PositionRecord {
    /// Rank in the search results; absent when the keyword was not found.
    #[serde(default)]
    pub position: Option<f64>,
}

/// Average position of one keyword on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub keyword: String,
    pub date: NaiveDate,
    pub average_position: f64,
}

impl fmt::Display for AggregatedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.keyword,
            self.date,
            format_position(self.average_position)
        )
    }
}

/// Format a position the way it appears in the report: integral values keep
/// one decimal (`10.0`), others print their shortest form (`12.33`).
pub fn format_position(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Round to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
