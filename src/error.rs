//! Error types for payload traversal.
//!
//! Application-level failures use `anyhow`; these are the recoverable faults
//! found while walking a single keyword block, which are logged and skipped.

use thiserror::Error;

/// A structural fault found in one part of the monitoring payload.
#[derive(Debug, Error)]
pub enum BlockError {
    /// Expected a JSON object at this level.
    #[error("expected an object at {path}, found {found}")]
    NotAnObject { path: String, found: &'static str },

    /// A position record did not decode.
    #[error("malformed position record at {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A date key that is not `YYYY-MM-DD`.
    #[error("invalid date {date:?} for keyword {keyword:?}")]
    InvalidDate { keyword: String, date: String },
}

/// Name of a JSON value's type, for diagnostics.
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
