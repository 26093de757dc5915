//! History pipeline inputs: filter validation, series normalization and
//! the fetch step with last-request-wins tokens.

mod fetcher;
mod filters;
mod series;

pub use fetcher::{fetch_history, FetchError, RequestSequence, RequestToken};
pub use filters::{
    DateField, DateRange, FilterError, HistoryQuery, QueryPlan, Selection, DATE_FORMAT,
    DEFAULT_MAX_SPAN_MONTHS,
};
pub use series::{Series, SeriesPoint};
