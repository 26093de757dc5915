//! Table models as the user sees them. The CSV exporter reads these, never
//! the underlying series, so exports match the screen.

use crate::catalog::{describe_key, AssetKey};
use crate::format::NumberFormatter;
use crate::history::Series;

pub const HISTORY_EMPTY_MESSAGE: &str = "Nenhum dado encontrado para os filtros selecionados.";
pub const DATE_COLUMN_TITLE: &str = "Data";

const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// The asset behind this column; `None` for the date column.
    pub asset: Option<AssetKey>,
    pub title: String,
}

impl Column {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            asset: None,
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRow {
    Cells(Vec<String>),
    /// One full-width message cell ("no data", "loading", ...).
    Placeholder(String),
}

impl TableRow {
    pub fn cells(&self) -> Vec<&str> {
        match self {
            Self::Cells(cells) => cells.iter().map(String::as_str).collect(),
            Self::Placeholder(message) => vec![message.as_str()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedTable {
    pub columns: Vec<Column>,
    pub rows: Vec<TableRow>,
}

impl RenderedTable {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// A table showing only `message` across all columns.
    pub fn placeholder(columns: Vec<Column>, message: impl Into<String>) -> Self {
        Self {
            columns,
            rows: vec![TableRow::Placeholder(message.into())],
        }
    }

    pub fn header(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.title.as_str()).collect()
    }

    /// Rows carrying real cells, skipping placeholders.
    pub fn data_rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().filter_map(|row| match row {
            TableRow::Cells(cells) => Some(cells.as_slice()),
            TableRow::Placeholder(_) => None,
        })
    }

    pub fn placeholder_message(&self) -> Option<&str> {
        self.rows.iter().find_map(|row| match row {
            TableRow::Placeholder(message) => Some(message.as_str()),
            TableRow::Cells(_) => None,
        })
    }
}

/// Header for the history table: `Data` followed by one column per
/// selected asset, in selection order.
pub fn history_columns(assets: &[AssetKey]) -> Vec<Column> {
    std::iter::once(Column::new(DATE_COLUMN_TITLE))
        .chain(assets.iter().map(|asset| Column {
            asset: Some(asset.clone()),
            title: describe_key(asset).label,
        }))
        .collect()
}

/// Rebuild the history table, most recent date first.
///
/// Missing values render as `N/A` so they stay distinguishable from zero.
pub fn render_history_table(
    series: &Series,
    assets: &[AssetKey],
    formatter: &NumberFormatter,
) -> RenderedTable {
    let columns = history_columns(assets);
    if series.is_empty() {
        return RenderedTable::placeholder(columns, HISTORY_EMPTY_MESSAGE);
    }

    let kinds: Vec<_> = assets.iter().map(|a| describe_key(a).kind).collect();
    let rows = series
        .descending()
        .map(|point| {
            let mut cells = Vec::with_capacity(assets.len() + 1);
            cells.push(point.date.format(DISPLAY_DATE_FORMAT).to_string());
            cells.extend(
                assets
                    .iter()
                    .zip(&kinds)
                    .map(|(asset, kind)| formatter.format(point.value(asset), *kind)),
            );
            TableRow::Cells(cells)
        })
        .collect();

    RenderedTable { columns, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::NOT_AVAILABLE;
    use crate::history::SeriesPoint;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn keys(keys: &[&str]) -> Vec<AssetKey> {
        keys.iter().map(|k| AssetKey::new(k)).collect()
    }

    #[test]
    fn header_follows_selection_order() {
        let table = render_history_table(
            &Series::default(),
            &keys(&["dolar", "selic", "euro"]),
            &NumberFormatter::default(),
        );
        assert_eq!(table.header(), vec!["Data", "Dólar", "SELIC", "EURO"]);
    }

    #[test]
    fn empty_series_renders_single_placeholder_row() {
        let table = render_history_table(
            &Series::default(),
            &keys(&["selic"]),
            &NumberFormatter::default(),
        );
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.placeholder_message(), Some(HISTORY_EMPTY_MESSAGE));
        assert_eq!(table.data_rows().count(), 0);
    }

    #[test]
    fn rows_are_most_recent_first_and_missing_differs_from_zero() {
        let series = Series::from_points([
            SeriesPoint::new(date(2024, 1, 1))
                .with_value("selic", Some(0.0))
                .with_value("dolar", Some(4.9)),
            SeriesPoint::new(date(2024, 1, 2)).with_value("selic", None),
        ]);
        let table = render_history_table(
            &series,
            &keys(&["selic", "dolar"]),
            &NumberFormatter::default(),
        );

        let rows: Vec<&[String]> = table.data_rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ["02/01/2024", NOT_AVAILABLE, NOT_AVAILABLE]);
        assert_eq!(rows[1], ["01/01/2024", "0,00%", "R$ 4,90"]);
    }
}
