//! Keyword x date pivot of aggregated rows.

use crate::models::AggregatedRow;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Average positions indexed by keyword (rows) and date (columns).
///
/// Keywords and dates are both sorted ascending. A cell is `None` when no
/// row existed for that pair; blanks are never filled with zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultMatrix {
    keywords: Vec<String>,
    dates: Vec<NaiveDate>,
    cells: Vec<Vec<Option<f64>>>,
}

impl ResultMatrix {
    /// Pivot rows into a matrix. If a (keyword, date) pair repeats, the last
    /// row wins.
    pub fn from_rows(rows: &[AggregatedRow]) -> Self {
        let keywords: BTreeSet<&str> = rows.iter().map(|r| r.keyword.as_str()).collect();
        let dates: BTreeSet<NaiveDate> = rows.iter().map(|r| r.date).collect();

        let mut values: BTreeMap<(&str, NaiveDate), f64> = BTreeMap::new();
        for row in rows {
            values.insert((row.keyword.as_str(), row.date), row.average_position);
        }

        let cells = keywords
            .iter()
            .map(|keyword| {
                dates
                    .iter()
                    .map(|date| values.get(&(*keyword, *date)).copied())
                    .collect()
            })
            .collect();

        Self {
            keywords: keywords.into_iter().map(String::from).collect(),
            dates: dates.into_iter().collect(),
            cells,
        }
    }

    /// True when there is nothing to report.
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Iterate rows as (keyword, cells), cells aligned with `dates()`.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.keywords
            .iter()
            .map(String::as_str)
            .zip(self.cells.iter().map(Vec::as_slice))
    }

    /// Value at (keyword, date), or `None` when blank or unknown.
    #[cfg(test)]
    pub fn get(&self, keyword: &str, date: NaiveDate) -> Option<f64> {
        let row = self.keywords.iter().position(|k| k == keyword)?;
        let col = self.dates.binary_search(&date).ok()?;
        self.cells[row][col]
    }
}
