//! Position aggregation.
//!
//! Walks the monitoring payload down to every keyword block, keeps the
//! monitored keywords and reduces each of their recent dates to one average
//! position. Faults are isolated to the smallest entry that holds them: a
//! bad level, date or record is logged and skipped, and everything else is
//! kept. Dates outside the window are never inspected.

use crate::analysis::matrix::ResultMatrix;
use crate::error::BlockError;
use crate::models::{as_map, recent_dates, round2, AggregatedRow, KeywordBlock, PositionRecord};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Rows collected from a payload, plus everything that had to be skipped.
#[derive(Debug, Default)]
pub struct Aggregation {
    /// Rows sorted by (keyword, date).
    pub rows: Vec<AggregatedRow>,
    /// Entries that were skipped, with the reason.
    pub skipped: Vec<BlockError>,
}

impl Aggregation {
    fn skip(&mut self, error: BlockError) {
        warn!("Skipping payload entry: {}", error);
        self.skipped.push(error);
    }

    /// View a level as a map, recording a skip when it is not one.
    fn level<'a>(&mut self, value: &'a Value, path: &str) -> Option<&'a Map<String, Value>> {
        match as_map(value) {
            Ok(map) => Some(map),
            Err(found) => {
                self.skip(BlockError::NotAnObject {
                    path: path.to_string(),
                    found,
                });
                None
            }
        }
    }
}

/// Aggregate a payload into a keyword x date matrix.
///
/// An empty matrix means there was no data to report.
pub fn aggregate(payload: &Value, allowed_keywords: &[String], window_days: usize) -> ResultMatrix {
    let aggregation = collect_rows(payload, allowed_keywords, window_days);
    ResultMatrix::from_rows(&aggregation.rows)
}

/// Collect the averaged rows for every monitored keyword in the payload.
pub fn collect_rows(
    payload: &Value,
    allowed_keywords: &[String],
    window_days: usize,
) -> Aggregation {
    let allowed: HashSet<&str> = allowed_keywords.iter().map(String::as_str).collect();
    let mut aggregation = Aggregation::default();

    let Some(results) = payload.get("results") else {
        debug!("Payload has no results");
        return aggregation;
    };

    let Some(domains) = aggregation.level(results, "results") else {
        return aggregation;
    };

    for (domain_id, domain) in domains {
        let domain_path = format!("results/{}", domain_id);
        let Some(keywords) = aggregation.level(domain, &domain_path) else {
            continue;
        };

        for (keyword_id, blocks) in keywords {
            let keyword_path = format!("{}/{}", domain_path, keyword_id);
            let Some(blocks) = aggregation.level(blocks, &keyword_path) else {
                continue;
            };

            for (block_id, block) in blocks {
                let block_path = format!("{}/{}", keyword_path, block_id);
                let Some(fields) = aggregation.level(block, &block_path) else {
                    continue;
                };

                let block = KeywordBlock::new(fields);
                if allowed.contains(block.title()) {
                    aggregate_block(block, &block_path, window_days, &mut aggregation);
                }
            }
        }
    }

    aggregation
        .rows
        .sort_by(|a, b| a.keyword.cmp(&b.keyword).then(a.date.cmp(&b.date)));

    debug!(
        "Collected {} rows, skipped {} entries",
        aggregation.rows.len(),
        aggregation.skipped.len()
    );

    aggregation
}

fn aggregate_block(
    block: KeywordBlock<'_>,
    path: &str,
    window_days: usize,
    aggregation: &mut Aggregation,
) {
    let title = block.title();

    let data = match block.data() {
        Ok(data) => data,
        Err(found) => {
            aggregation.skip(BlockError::NotAnObject {
                path: format!("{}/data", path),
                found,
            });
            return;
        }
    };

    if data.is_empty() {
        debug!("Keyword {:?} has no date data", title);
        return;
    }

    for (date_str, entry) in recent_dates(data, window_days) {
        let date_path = format!("{}/data/{}", path, date_str);
        let positions = positions_for(entry, &date_path, aggregation);
        if positions.is_empty() {
            continue;
        }

        let date = match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                aggregation.skip(BlockError::InvalidDate {
                    keyword: title.to_string(),
                    date: date_str.clone(),
                });
                continue;
            }
        };

        let average = positions.iter().sum::<f64>() / positions.len() as f64;
        aggregation.rows.push(AggregatedRow {
            keyword: title.to_string(),
            date,
            average_position: round2(average),
        });
    }
}

/// All non-null positions under one date, across engines and devices.
fn positions_for(entry: &Value, path: &str, aggregation: &mut Aggregation) -> Vec<f64> {
    let mut positions = Vec::new();

    let Some(engines) = aggregation.level(entry, path) else {
        return positions;
    };

    for (engine, devices) in engines {
        let engine_path = format!("{}/{}", path, engine);
        let Some(devices) = aggregation.level(devices, &engine_path) else {
            continue;
        };

        for (device, records) in devices {
            let device_path = format!("{}/{}", engine_path, device);
            let Some(records) = aggregation.level(records, &device_path) else {
                continue;
            };

            for (record_id, record) in records {
                match PositionRecord::deserialize(record) {
                    Ok(record) => positions.extend(record.position),
                    Err(source) => aggregation.skip(BlockError::Malformed {
                        path: format!("{}/{}", device_path, record_id),
                        source,
                    }),
                }
            }
        }
    }

    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn allowed(titles: &[&str]) -> Vec<String> {
        titles.iter().map(|t| t.to_string()).collect()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// A date entry holding the given positions under one engine/device.
    fn day(positions: &[Option<f64>]) -> Value {
        let records: Map<String, Value> = positions
            .iter()
            .enumerate()
            .map(|(i, p)| (i.to_string(), json!({ "position": p })))
            .collect();
        json!({ "google": { "desktop": records } })
    }

    fn payload_with(blocks: Vec<(&str, Value)>) -> Value {
        let mut keywords = Map::new();
        for (i, (title, data)) in blocks.into_iter().enumerate() {
            keywords.insert(
                format!("kw{}", i),
                json!({ "b": { "keyword": { "title": title }, "data": data } }),
            );
        }
        json!({ "results": { "101": keywords } })
    }

    #[test]
    fn test_no_allowed_keywords_gives_empty_matrix() {
        let payload = payload_with(vec![("other", json!({ "2024-01-01": day(&[Some(1.0)]) }))]);
        let matrix = aggregate(&payload, &allowed(&["praca it"]), 7);
        assert!(matrix.is_empty());
    }

    #[test]
    fn test_missing_results_gives_empty_matrix() {
        assert!(aggregate(&json!({}), &allowed(&["praca it"]), 7).is_empty());
        assert!(aggregate(&json!({ "results": [] }), &allowed(&["praca it"]), 7).is_empty());
    }

    #[test]
    fn test_mean_of_positions() {
        let payload = payload_with(vec![(
            "praca it",
            json!({
                "2024-01-01": day(&[Some(10.0), Some(12.0), Some(14.0)]),
                "2024-01-02": day(&[Some(11.0), Some(14.0)]),
            }),
        )]);

        let rows = collect_rows(&payload, &allowed(&["praca it"]), 7).rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].average_position, 12.0);
        assert_eq!(rows[1].average_position, 12.5);
    }

    #[test]
    fn test_mean_spans_engines_and_devices() {
        let payload = payload_with(vec![(
            "praca it",
            json!({
                "2024-01-01": {
                    "google": { "desktop": { "1": { "position": 1 } }, "mobile": { "1": { "position": 2 } } },
                    "bing": { "desktop": { "1": { "position": 4 } } }
                }
            }),
        )]);

        let rows = collect_rows(&payload, &allowed(&["praca it"]), 7).rows;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].average_position, 2.33);
    }

    #[test]
    fn test_window_keeps_most_recent_dates() {
        let data: Map<String, Value> = (1..=10)
            .map(|d| (format!("2024-01-{:02}", d), day(&[Some(d as f64)])))
            .collect();
        let payload = payload_with(vec![("praca it", Value::Object(data))]);

        let rows = collect_rows(&payload, &allowed(&["praca it"]), 3).rows;
        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![date("2024-01-08"), date("2024-01-09"), date("2024-01-10")]
        );
    }

    #[test]
    fn test_null_only_date_yields_no_row() {
        let payload = payload_with(vec![(
            "praca it",
            json!({
                "2024-01-01": day(&[None, None]),
                "2024-01-02": day(&[Some(5.0)]),
            }),
        )]);

        let rows = collect_rows(&payload, &allowed(&["praca it"]), 7).rows;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, date("2024-01-02"));
    }

    #[test]
    fn test_null_only_dates_still_count_toward_window() {
        let payload = payload_with(vec![(
            "praca it",
            json!({
                "2024-01-01": day(&[Some(3.0)]),
                "2024-01-02": day(&[None]),
            }),
        )]);

        let rows = collect_rows(&payload, &allowed(&["praca it"]), 1).rows;
        assert!(rows.is_empty());
    }

    #[test]
    fn test_rows_sorted_by_keyword_then_date() {
        let payload = payload_with(vec![
            ("praca w it", json!({ "2024-01-02": day(&[Some(1.0)]), "2024-01-01": day(&[Some(2.0)]) })),
            ("oferty pracy it", json!({ "2024-01-02": day(&[Some(3.0)]) })),
        ]);

        let rows = collect_rows(&payload, &allowed(&["praca w it", "oferty pracy it"]), 7).rows;
        let keys: Vec<(&str, NaiveDate)> = rows.iter().map(|r| (r.keyword.as_str(), r.date)).collect();
        assert_eq!(
            keys,
            vec![
                ("oferty pracy it", date("2024-01-02")),
                ("praca w it", date("2024-01-01")),
                ("praca w it", date("2024-01-02")),
            ]
        );
    }

    #[test]
    fn test_malformed_block_is_isolated() {
        let payload = json!({
            "results": {
                "101": {
                    "kw1": { "b": { "keyword": { "title": "praca it" }, "data": { "2024-01-01": day(&[Some(4.0)]) } } },
                    "kw2": { "b": { "keyword": { "title": "praca w it" }, "data": { "2024-01-01": "broken" } } },
                    "kw3": { "b": 17 },
                    "kw4": "not a map"
                },
                "102": []
            }
        });

        let aggregation = collect_rows(&payload, &allowed(&["praca it", "praca w it"]), 7);
        assert_eq!(aggregation.rows.len(), 1);
        assert_eq!(aggregation.rows[0].keyword, "praca it");
        assert_eq!(aggregation.skipped.len(), 3);
        assert!(aggregation
            .skipped
            .iter()
            .all(|e| matches!(e, BlockError::NotAnObject { .. })));
        assert!(aggregation
            .skipped
            .iter()
            .any(|e| e.to_string().contains("results/101/kw2/b/data/2024-01-01")));
    }

    #[test]
    fn test_empty_list_device_is_empty_map() {
        let payload = payload_with(vec![(
            "praca it",
            json!({
                "2024-01-02": {
                    "google": { "desktop": { "1": { "position": 4 } }, "mobile": [] }
                }
            }),
        )]);

        let aggregation = collect_rows(&payload, &allowed(&["praca it"]), 7);
        assert!(aggregation.skipped.is_empty());
        assert_eq!(aggregation.rows.len(), 1);
        assert_eq!(aggregation.rows[0].date, date("2024-01-02"));
        assert_eq!(aggregation.rows[0].average_position, 4.0);
    }

    #[test]
    fn test_empty_list_at_every_level() {
        let payload = payload_with(vec![(
            "praca it",
            json!({
                "2024-01-03": [],
                "2024-01-02": { "google": [], "bing": { "desktop": { "1": { "position": 6 } } } },
                "2024-01-01": { "google": { "desktop": [] } }
            }),
        )]);

        let aggregation = collect_rows(&payload, &allowed(&["praca it"]), 7);
        assert!(aggregation.skipped.is_empty());
        assert_eq!(aggregation.rows.len(), 1);
        assert_eq!(aggregation.rows[0].date, date("2024-01-02"));
        assert_eq!(aggregation.rows[0].average_position, 6.0);
    }

    #[test]
    fn test_bad_record_outside_window_is_not_inspected() {
        let payload = payload_with(vec![(
            "praca it",
            json!({
                "2024-01-10": day(&[Some(4.0)]),
                "2023-01-01": { "google": { "desktop": { "1": { "position": "n/a" } } } }
            }),
        )]);

        let aggregation = collect_rows(&payload, &allowed(&["praca it"]), 1);
        assert!(aggregation.skipped.is_empty());
        assert_eq!(aggregation.rows.len(), 1);
        assert_eq!(aggregation.rows[0].date, date("2024-01-10"));
        assert_eq!(aggregation.rows[0].average_position, 4.0);
    }

    #[test]
    fn test_bad_record_in_window_skips_only_that_record() {
        let payload = payload_with(vec![(
            "praca it",
            json!({
                "2024-01-10": {
                    "google": { "desktop": { "1": { "position": "n/a" }, "2": { "position": 8 } } }
                },
                "2024-01-09": day(&[Some(2.0)])
            }),
        )]);

        let aggregation = collect_rows(&payload, &allowed(&["praca it"]), 7);
        assert_eq!(aggregation.rows.len(), 2);
        assert_eq!(aggregation.rows[1].date, date("2024-01-10"));
        assert_eq!(aggregation.rows[1].average_position, 8.0);

        assert_eq!(aggregation.skipped.len(), 1);
        let message = aggregation.skipped[0].to_string();
        assert!(matches!(aggregation.skipped[0], BlockError::Malformed { .. }));
        assert!(message.contains("results/101/kw0/b/data/2024-01-10/google/desktop/1"));
        assert!(message.contains("invalid type"));
    }

    #[test]
    fn test_unmonitored_malformed_block_is_not_reported() {
        let payload = payload_with(vec![
            ("praca it", json!({ "2024-01-01": day(&[Some(1.0)]) })),
            ("other", json!({ "2024-01-01": "broken", "2024-01-02": [1, 2] })),
            ("also other", json!("not a map")),
        ]);

        let aggregation = collect_rows(&payload, &allowed(&["praca it"]), 7);
        assert_eq!(aggregation.rows.len(), 1);
        assert!(aggregation.skipped.is_empty());
    }

    #[test]
    fn test_non_map_data_is_skipped() {
        let payload = payload_with(vec![
            ("praca it", json!("not a map")),
            ("praca w it", json!({ "2024-01-01": day(&[Some(3.0)]) })),
        ]);

        let aggregation = collect_rows(&payload, &allowed(&["praca it", "praca w it"]), 7);
        assert_eq!(aggregation.rows.len(), 1);
        assert_eq!(aggregation.rows[0].keyword, "praca w it");
        assert_eq!(
            aggregation.skipped[0].to_string(),
            "expected an object at results/101/kw0/b/data, found a string"
        );
    }

    #[test]
    fn test_invalid_date_is_skipped() {
        let payload = payload_with(vec![(
            "praca it",
            json!({ "latest": day(&[Some(1.0)]), "2024-01-01": day(&[Some(2.0)]) }),
        )]);

        let aggregation = collect_rows(&payload, &allowed(&["praca it"]), 7);
        assert_eq!(aggregation.rows.len(), 1);
        assert!(matches!(
            aggregation.skipped[0],
            BlockError::InvalidDate { .. }
        ));
    }

    #[test]
    fn test_input_is_not_mutated() {
        let payload = payload_with(vec![("praca it", json!({ "2024-01-01": day(&[Some(1.0)]) }))]);
        let before = payload.clone();
        let _ = aggregate(&payload, &allowed(&["praca it"]), 7);
        assert_eq!(payload, before);
    }
}
