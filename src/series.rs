//! Price series construction from the upstream payload
//!
//! The REE "datos" response carries one entry per pricing series in its
//! `included` list. This module turns those entries into ordered,
//! deduplicated [`PriceSeries`] values and hosts the hour-based point
//! lookup used to annotate the current price.

use crate::error::{Result, VatioError};
use chrono::{DateTime, FixedOffset, Timelike};
use serde::Deserialize;
use serde_json::Value;

/// One hourly price sample
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    /// Price in €/MWh
    pub value: f64,

    /// Start of the hour the price applies to
    pub instant: DateTime<FixedOffset>,
}

/// A named, time-ordered collection of price points for one pricing series
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    /// Series title as reported upstream
    pub title: String,

    /// Upstream last-update stamp for the series
    pub last_update: DateTime<FixedOffset>,

    /// Points sorted ascending by instant
    pub points: Vec<PricePoint>,
}

#[derive(Deserialize)]
struct RawEntry {
    attributes: RawAttributes,
}

#[derive(Deserialize)]
struct RawAttributes {
    title: String,

    #[serde(rename = "last-update")]
    last_update: String,

    values: Vec<RawValue>,
}

#[derive(Deserialize)]
struct RawValue {
    value: f64,
    datetime: String,
}

/// Build one [`PriceSeries`] per entry in the payload's `included` list.
///
/// The iterator is lazy: the first series is available before later entries
/// are parsed. Any malformed entry yields an error, and the caller is
/// expected to abort the whole sequence on it rather than publish a partial
/// result.
pub fn build_series(payload: &Value) -> Result<impl Iterator<Item = Result<PriceSeries>> + '_> {
    let included = payload
        .get("included")
        .and_then(Value::as_array)
        .ok_or_else(|| VatioError::parse("payload has no `included` list"))?;

    Ok(included.iter().map(parse_entry))
}

fn parse_entry(entry: &Value) -> Result<PriceSeries> {
    let entry: RawEntry = serde_json::from_value(entry.clone())
        .map_err(|e| VatioError::parse(format!("malformed series entry: {}", e)))?;

    let last_update = DateTime::parse_from_rfc3339(&entry.attributes.last_update)?;

    let mut points = entry
        .attributes
        .values
        .into_iter()
        .map(|raw| {
            Ok(PricePoint {
                value: raw.value,
                instant: DateTime::parse_from_rfc3339(&raw.datetime)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    // Entries are not guaranteed sorted on the wire
    points.sort_by_key(|point| point.instant);

    prune_trailing_duplicate(&mut points);

    Ok(PriceSeries {
        title: entry.attributes.title,
        last_update,
        points,
    })
}

/// Drop the last point when its `(hour, minute)` collides with the first
/// point's.
///
/// The upstream feed appends a spurious point at `00:00` of the next day
/// that would render as a duplicate x-axis label next to the first point's
/// `00:00`. This deliberately removes only that one trailing element; it is
/// not a general dedup routine and does not catch repeats of other hours.
fn prune_trailing_duplicate(points: &mut Vec<PricePoint>) {
    let collides = match (points.first(), points.last()) {
        (Some(first), Some(last)) => {
            first.instant.hour() == last.instant.hour()
                && first.instant.minute() == last.instant.minute()
        }
        _ => false,
    };
    if collides {
        points.pop();
    }
}

impl PriceSeries {
    /// Find the first point whose hour matches the given instant's hour.
    ///
    /// Both sides are truncated to the top of the hour before comparing, so
    /// the query's minutes and seconds are ignored. `None` means "no
    /// annotation for this time", not an error.
    pub fn find_by_hour(&self, instant: DateTime<FixedOffset>) -> Option<&PricePoint> {
        let target = truncate_to_hour(instant);
        self.points
            .iter()
            .find(|point| truncate_to_hour(point.instant) == target)
    }
}

fn truncate_to_hour(instant: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    instant
        .with_minute(0)
        .and_then(|dt| dt.with_second(0))
        .and_then(|dt| dt.with_nanosecond(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload_with_values(values: Value) -> Value {
        json!({
            "included": [
                {
                    "attributes": {
                        "title": "PVPC",
                        "last-update": "2024-03-11T20:15:00+01:00",
                        "values": values,
                    }
                }
            ]
        })
    }

    fn build_single(payload: &Value) -> PriceSeries {
        build_series(payload)
            .unwrap()
            .next()
            .expect("one series")
            .expect("entry parses")
    }

    #[test]
    fn test_reverse_order_values_sorted_ascending() {
        let payload = payload_with_values(json!([
            { "value": 110.0, "datetime": "2024-03-11T02:00:00+01:00" },
            { "value": 105.0, "datetime": "2024-03-11T01:00:00+01:00" },
            { "value": 100.0, "datetime": "2024-03-11T00:00:00+01:00" },
        ]));
        let series = build_single(&payload);
        assert_eq!(series.title, "PVPC");
        let values: Vec<f64> = series.points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![100.0, 105.0, 110.0]);
        assert!(series.points.windows(2).all(|w| w[0].instant < w[1].instant));
    }

    #[test]
    fn test_trailing_midnight_duplicate_pruned() {
        let payload = payload_with_values(json!([
            { "value": 100.0, "datetime": "2024-03-11T00:00:00+01:00" },
            { "value": 105.0, "datetime": "2024-03-11T01:00:00+01:00" },
            { "value": 98.0, "datetime": "2024-03-12T00:00:00+01:00" },
        ]));
        let series = build_single(&payload);
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points.last().map(|p| p.value), Some(105.0));
    }

    #[test]
    fn test_no_collision_leaves_series_unchanged() {
        let payload = payload_with_values(json!([
            { "value": 100.0, "datetime": "2024-03-11T00:00:00+01:00" },
            { "value": 105.0, "datetime": "2024-03-11T01:00:00+01:00" },
            { "value": 110.0, "datetime": "2024-03-11T02:00:00+01:00" },
        ]));
        let series = build_single(&payload);
        assert_eq!(series.points.len(), 3);
    }

    #[test]
    fn test_single_point_collides_with_itself() {
        // A one-point series always matches first-vs-last and is emptied;
        // narrow behavior kept on purpose.
        let payload = payload_with_values(json!([
            { "value": 100.0, "datetime": "2024-03-11T00:00:00+01:00" },
        ]));
        let series = build_single(&payload);
        assert!(series.points.is_empty());
    }

    #[test]
    fn test_missing_included_is_parse_error() {
        let payload = json!({ "data": {} });
        let err = build_series(&payload).err().expect("must fail");
        assert!(matches!(err, VatioError::Parse { .. }));
    }

    #[test]
    fn test_value_without_datetime_is_parse_error() {
        let payload = payload_with_values(json!([
            { "value": 100.0 },
        ]));
        let result = build_series(&payload).unwrap().next().expect("one entry");
        assert!(matches!(result, Err(VatioError::Parse { .. })));
    }

    #[test]
    fn test_malformed_last_update_is_parse_error() {
        let payload = json!({
            "included": [
                {
                    "attributes": {
                        "title": "PVPC",
                        "last-update": "not-a-date",
                        "values": [],
                    }
                }
            ]
        });
        let result = build_series(&payload).unwrap().next().expect("one entry");
        assert!(matches!(result, Err(VatioError::Parse { .. })));
    }

    #[test]
    fn test_find_by_hour_ignores_query_minutes() {
        let payload = payload_with_values(json!([
            { "value": 100.0, "datetime": "2024-03-11T10:00:00+01:00" },
            { "value": 105.0, "datetime": "2024-03-11T11:00:00+01:00" },
        ]));
        let series = build_single(&payload);

        let query = DateTime::parse_from_rfc3339("2024-03-11T10:45:31+01:00").unwrap();
        let found = series.find_by_hour(query).expect("hour matches");
        assert_eq!(found.value, 100.0);
    }

    #[test]
    fn test_find_by_hour_miss_is_none() {
        let payload = payload_with_values(json!([
            { "value": 100.0, "datetime": "2024-03-11T10:00:00+01:00" },
        ]));
        let series = build_single(&payload);

        let query = DateTime::parse_from_rfc3339("2024-03-11T12:00:00+01:00").unwrap();
        assert!(series.find_by_hour(query).is_none());
    }

    #[test]
    fn test_multiple_series_streamed_in_order() {
        let payload = json!({
            "included": [
                {
                    "attributes": {
                        "title": "PVPC",
                        "last-update": "2024-03-11T20:15:00+01:00",
                        "values": [],
                    }
                },
                {
                    "attributes": {
                        "title": "Mercado spot",
                        "last-update": "2024-03-11T20:15:00+01:00",
                        "values": [],
                    }
                }
            ]
        });
        let titles: Vec<String> = build_series(&payload)
            .unwrap()
            .map(|series| series.map(|s| s.title))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(titles, vec!["PVPC", "Mercado spot"]);
    }
}
