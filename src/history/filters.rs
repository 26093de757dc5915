use chrono::{Months, NaiveDate};
use thiserror::Error;

use crate::catalog::AssetKey;
use crate::notify::Level;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_MAX_SPAN_MONTHS: u32 = 24;

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `days`-long window ending on `end`.
    pub fn ending_on(end: NaiveDate, days: u32) -> Self {
        Self {
            start: end - chrono::Duration::days(i64::from(days)),
            end,
        }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Move both ends by `days` (negative moves back in time).
    pub fn shifted(&self, days: i64) -> Self {
        let delta = chrono::Duration::days(days);
        Self {
            start: self.start + delta,
            end: self.end + delta,
        }
    }

    /// Grow (positive) or shrink (negative) the window by moving its start.
    /// The window never collapses below a single day.
    pub fn widened(&self, days: i64) -> Self {
        let start = (self.start - chrono::Duration::days(days)).min(self.end);
        Self { start, end: self.end }
    }
}

/// Raw filter inputs as the user left them in the form controls.
///
/// Read afresh on every refresh; nothing downstream keeps a copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: Option<String>,
    pub end: Option<String>,
    pub assets: Vec<AssetKey>,
}

impl Selection {
    pub fn for_range(range: DateRange, assets: Vec<AssetKey>) -> Self {
        Self {
            start: Some(range.start.format(DATE_FORMAT).to_string()),
            end: Some(range.end.format(DATE_FORMAT).to_string()),
            assets,
        }
    }

    /// Validate the inputs into something the fetcher can send.
    ///
    /// An empty asset selection is not an error: it yields
    /// [`QueryPlan::Empty`] so callers render the explicit empty state
    /// without calling the server.
    pub fn validate(&self, max_span_months: u32) -> Result<QueryPlan, FilterError> {
        if self.assets.is_empty() {
            return Ok(QueryPlan::Empty);
        }

        let start = parse_date(self.start.as_deref(), DateField::Start)?;
        let end = parse_date(self.end.as_deref(), DateField::End)?;
        if end < start {
            return Err(FilterError::EndBeforeStart { start, end });
        }

        let limit = start.checked_add_months(Months::new(max_span_months));
        if limit.map_or(true, |limit| end > limit) {
            return Err(FilterError::SpanTooLong {
                start,
                end,
                max_months: max_span_months,
            });
        }

        Ok(QueryPlan::Fetch(HistoryQuery {
            range: DateRange { start, end },
            assets: self.assets.clone(),
        }))
    }
}

/// A validated history request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub range: DateRange,
    pub assets: Vec<AssetKey>,
}

impl HistoryQuery {
    /// Query-string pairs for `GET /api/historico`.
    pub fn query_params(&self) -> [(&'static str, String); 3] {
        [
            ("startDate", self.range.start.format(DATE_FORMAT).to_string()),
            ("endDate", self.range.end.format(DATE_FORMAT).to_string()),
            (
                "assets",
                self.assets
                    .iter()
                    .map(AssetKey::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    /// Nothing selected: render the empty state, do not call the server.
    Empty,
    Fetch(HistoryQuery),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Start,
    End,
}

impl DateField {
    fn label(self) -> &'static str {
        match self {
            Self::Start => "inicial",
            Self::End => "final",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Informe a data {}.", .0.label())]
    MissingDate(DateField),

    #[error("Data {} inválida: {value:?}. Use AAAA-MM-DD.", .field.label())]
    InvalidDate { field: DateField, value: String },

    #[error("A data final ({end}) é anterior à data inicial ({start}).")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("O período selecionado ({start} a {end}) excede o limite de {max_months} meses.")]
    SpanTooLong {
        start: NaiveDate,
        end: NaiveDate,
        max_months: u32,
    },
}

impl FilterError {
    /// Over-long spans are a warning; everything else is an input error.
    pub fn level(&self) -> Level {
        match self {
            Self::SpanTooLong { .. } => Level::Warning,
            _ => Level::Error,
        }
    }
}

fn parse_date(value: Option<&str>, field: DateField) -> Result<NaiveDate, FilterError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(FilterError::MissingDate(field))?;
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| FilterError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn selection(start: &str, end: &str, assets: &[&str]) -> Selection {
        Selection {
            start: Some(start.to_string()),
            end: Some(end.to_string()),
            assets: assets.iter().map(|a| AssetKey::new(a)).collect(),
        }
    }

    #[test]
    fn valid_selection_produces_query() {
        let plan = selection("2024-01-01", "2024-03-01", &["selic", "cdi"])
            .validate(DEFAULT_MAX_SPAN_MONTHS)
            .unwrap();
        let QueryPlan::Fetch(query) = plan else {
            panic!("expected fetch plan");
        };
        assert_eq!(query.range, DateRange::new(date(2024, 1, 1), date(2024, 3, 1)));
        assert_eq!(
            query.query_params(),
            [
                ("startDate", "2024-01-01".to_string()),
                ("endDate", "2024-03-01".to_string()),
                ("assets", "selic,cdi".to_string()),
            ]
        );
    }

    #[test]
    fn end_before_start_is_an_error() {
        let err = selection("2024-01-01", "2023-01-01", &["selic"])
            .validate(DEFAULT_MAX_SPAN_MONTHS)
            .unwrap_err();
        assert!(matches!(err, FilterError::EndBeforeStart { .. }));
        assert_eq!(err.level(), Level::Error);
    }

    #[test]
    fn span_over_two_years_is_a_warning() {
        let start = date(2022, 1, 1);
        let end = start + chrono::Duration::days(800);
        let err = Selection::for_range(DateRange::new(start, end), vec![AssetKey::new("cdi")])
            .validate(DEFAULT_MAX_SPAN_MONTHS)
            .unwrap_err();
        assert!(matches!(err, FilterError::SpanTooLong { max_months: 24, .. }));
        assert_eq!(err.level(), Level::Warning);
    }

    #[test]
    fn exactly_two_years_is_allowed() {
        let plan = selection("2022-02-28", "2024-02-28", &["cdi"])
            .validate(DEFAULT_MAX_SPAN_MONTHS)
            .unwrap();
        assert!(matches!(plan, QueryPlan::Fetch(_)));
    }

    #[test]
    fn empty_asset_selection_is_a_no_op_plan() {
        let plan = Selection::default().validate(DEFAULT_MAX_SPAN_MONTHS).unwrap();
        assert_eq!(plan, QueryPlan::Empty);
    }

    #[test]
    fn missing_and_unparseable_dates_are_rejected() {
        let mut missing = selection("2024-01-01", "", &["selic"]);
        assert_eq!(
            missing.validate(24).unwrap_err(),
            FilterError::MissingDate(DateField::End)
        );
        missing.start = None;
        assert_eq!(
            missing.validate(24).unwrap_err(),
            FilterError::MissingDate(DateField::Start)
        );

        let err = selection("01/01/2024", "2024-02-01", &["selic"])
            .validate(24)
            .unwrap_err();
        assert!(matches!(
            err,
            FilterError::InvalidDate {
                field: DateField::Start,
                ..
            }
        ));
    }

    #[test]
    fn range_helpers_move_and_resize() {
        let range = DateRange::ending_on(date(2024, 6, 30), 30);
        assert_eq!(range.start, date(2024, 5, 31));
        assert_eq!(range.days(), 30);

        let back = range.shifted(-30);
        assert_eq!(back.end, date(2024, 5, 31));

        let wider = range.widened(30);
        assert_eq!(wider.days(), 60);
        let collapsed = range.widened(-90);
        assert_eq!(collapsed.start, collapsed.end);
    }
}
