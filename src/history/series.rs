use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use tracing::warn;

use crate::api::HistoryRecord;
use crate::catalog::AssetKey;
use crate::format::numeric_json_value;

use super::filters::DATE_FORMAT;

/// One calendar date with an optional value per asset.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    values: HashMap<AssetKey, Option<f64>>,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            values: HashMap::new(),
        }
    }

    pub fn with_value(mut self, asset: impl Into<AssetKey>, value: Option<f64>) -> Self {
        self.values.insert(asset.into(), value);
        self
    }

    /// The value for `asset`; `None` when missing, null or non-numeric.
    pub fn value(&self, asset: &AssetKey) -> Option<f64> {
        self.values.get(asset).copied().flatten()
    }
}

/// Per-date records keyed by date, so a series never holds two points for
/// the same day regardless of the order the server sent them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    points: BTreeMap<NaiveDate, SeriesPoint>,
}

impl Series {
    /// Build from points in any order. A later point for an already-seen
    /// date replaces the earlier one.
    pub fn from_points(points: impl IntoIterator<Item = SeriesPoint>) -> Self {
        let mut series = Self::default();
        for point in points {
            series.points.insert(point.date, point);
        }
        series
    }

    /// Normalize server records. Records whose date cannot be parsed are
    /// skipped with a warning rather than failing the whole response.
    pub fn from_records(records: Vec<HistoryRecord>) -> Self {
        Self::from_points(records.into_iter().filter_map(|record| {
            let Some(date) = parse_record_date(&record.data) else {
                warn!(date = %record.data, "Skipping history record with unparseable date");
                return None;
            };
            let mut point = SeriesPoint::new(date);
            for (key, value) in &record.values {
                point.values.insert(AssetKey::new(key), numeric_json_value(value));
            }
            Some(point)
        }))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Oldest first.
    pub fn ascending(&self) -> impl DoubleEndedIterator<Item = &SeriesPoint> + ExactSizeIterator {
        self.points.values()
    }

    /// Most recent first.
    pub fn descending(&self) -> impl Iterator<Item = &SeriesPoint> {
        self.points.values().rev()
    }

    /// True when at least one point carries a number for `asset`.
    pub fn has_coverage(&self, asset: &AssetKey) -> bool {
        self.points.values().any(|p| p.value(asset).is_some())
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.keys().next_back().copied()
    }
}

/// Accepts `YYYY-MM-DD` optionally followed by a time component.
fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    raw.trim()
        .get(..10)
        .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
}
