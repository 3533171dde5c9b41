//! HTML report generation.
//!
//! This module renders the keyword x date matrix as the HTML document that
//! is sent as the email body, and as JSON for file output.

use crate::analysis::ResultMatrix;
use crate::config::{EmailConfig, ReportConfig};
use crate::models::format_position;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Table style embedded in the document head.
const TABLE_STYLE: &str = "\
table {
    width: 100%;
    border-collapse: collapse;
}
th, td {
    padding: 5px 2px;
    text-align: center;
    border: 1px solid #ddd;
}
th {
    background-color: #f2f2f2;
}
";

/// A report ready to be mailed.
#[derive(Debug, Clone)]
pub struct ComposedReport {
    pub subject: String,
    pub html: String,
}

/// Build subject and body for a matrix. `None` when there is no data.
pub fn compose_report(
    matrix: &ResultMatrix,
    report: &ReportConfig,
    email: &EmailConfig,
    days: usize,
) -> Option<ComposedReport> {
    let html = render_html(matrix, report)?;
    Some(ComposedReport {
        subject: subject_for(&email.subject_template, days),
        html,
    })
}

/// Fill the `{days}` placeholder of a subject template.
pub fn subject_for(template: &str, days: usize) -> String {
    template.replace("{days}", &days.to_string())
}

/// Render the full HTML document. `None` when the matrix is empty.
pub fn render_html(matrix: &ResultMatrix, report: &ReportConfig) -> Option<String> {
    if matrix.is_empty() {
        return None;
    }

    let mut output = String::new();

    output.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    output.push_str("<style>\n");
    output.push_str(TABLE_STYLE);
    output.push_str("</style>\n</head>\n<body>\n");
    output.push_str(&format!("<h2>{}</h2>\n", escape_html(&report.heading)));
    output.push_str(&generate_table(matrix, &report.keyword_label));
    output.push_str("</body>\n</html>\n");

    Some(output)
}

/// Generate the position table.
fn generate_table(matrix: &ResultMatrix, keyword_label: &str) -> String {
    let mut table = String::new();

    table.push_str("<table border=\"1\" class=\"styled\">\n");

    // Header: keyword label, then one column per date
    table.push_str("<thead>\n<tr>\n");
    table.push_str(&format!("<th>{}</th>\n", escape_html(keyword_label)));
    for date in matrix.dates() {
        table.push_str(&format!("<th>{}</th>\n", date.format("%Y-%m-%d")));
    }
    table.push_str("</tr>\n</thead>\n");

    table.push_str("<tbody>\n");
    for (keyword, cells) in matrix.rows() {
        table.push_str("<tr>\n");
        table.push_str(&format!("<th>{}</th>\n", escape_html(keyword)));
        for cell in cells {
            match cell {
                Some(value) => table.push_str(&format!("<td>{}</td>\n", format_position(*value))),
                None => table.push_str("<td></td>\n"),
            }
        }
        table.push_str("</tr>\n");
    }
    table.push_str("</tbody>\n</table>\n");

    table
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// JSON export of a report run.
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    days: usize,
    matrix: &'a ResultMatrix,
}

/// Generate a JSON report.
pub fn generate_json_report(matrix: &ResultMatrix, days: usize) -> Result<String> {
    let report = JsonReport {
        generated_at: Utc::now(),
        days,
        matrix,
    };
    serde_json::to_string_pretty(&report).map_err(Into::into)
}
