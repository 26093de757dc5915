//! CSV export of rendered tables.
//!
//! Semicolon-delimited (the locale uses commas for decimals), every field
//! quoted, UTF-8 with a byte-order mark so spreadsheet tools pick the right
//! encoding.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use thiserror::Error;
use tracing::info;

use crate::table::{RenderedTable, TableRow};

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
pub const COMPARISON_FILENAME: &str = "comparacao_aporte_mensal.csv";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Não há dados na tabela para exportar.")]
    NothingToExport,

    #[error("failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn history_filename(today: NaiveDate) -> String {
    format!("historico_rendimentos_{}.csv", today.format("%Y-%m-%d"))
}

/// Encode `table` as CSV bytes.
///
/// Rows with fewer cells than the header (placeholders, loading rows) are
/// skipped. A table with no data rows left is [`ExportError::NothingToExport`].
pub fn table_to_csv(table: &RenderedTable) -> Result<Vec<u8>, ExportError> {
    let header = table.header();
    let rows: Vec<Vec<&str>> = table
        .rows
        .iter()
        .filter(|row| matches!(row, TableRow::Cells(_)))
        .map(TableRow::cells)
        .filter(|cells| cells.len() >= header.len())
        .collect();
    if rows.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let mut bytes = UTF8_BOM.to_vec();
    {
        let mut writer = WriterBuilder::new()
            .delimiter(b';')
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b'\n'))
            .flexible(true)
            .from_writer(&mut bytes);

        writer.write_record(header.iter().map(|cell| cell.trim()))?;
        for cells in &rows {
            writer.write_record(cells.iter().map(|cell| cell.trim()))?;
        }
        writer.flush().map_err(csv::Error::from)?;
    }
    // Records are joined by newlines, not terminated by them.
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    Ok(bytes)
}

/// Encode `table` and write it to `dir/filename`, creating `dir` if needed.
pub fn export_table(
    table: &RenderedTable,
    dir: &Path,
    filename: &str,
) -> Result<PathBuf, ExportError> {
    let bytes = table_to_csv(table)?;
    let path = dir.join(filename);
    std::fs::create_dir_all(dir)
        .and_then(|()| std::fs::write(&path, &bytes))
        .map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
    info!(path = %path.display(), bytes = bytes.len(), "CSV exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn table(header: &[&str], rows: Vec<TableRow>) -> RenderedTable {
        RenderedTable {
            columns: header.iter().map(|h| Column::new(*h)).collect(),
            rows,
        }
    }

    fn cells(cells: &[&str]) -> TableRow {
        TableRow::Cells(cells.iter().map(|c| c.to_string()).collect())
    }

    #[test]
    fn quotes_every_field_with_semicolons_and_bom() {
        let table = table(&["Date", "SELIC"], vec![cells(&["01/01/24", "5,00%"])]);
        let bytes = table_to_csv(&table).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "\u{FEFF}\"Date\";\"SELIC\"\n\"01/01/24\";\"5,00%\"");
    }

    #[test]
    fn embedded_quotes_are_doubled_and_cells_trimmed() {
        let table = table(&["Nome"], vec![cells(&["  Fundo \"XP\"  "])]);
        let text = String::from_utf8(table_to_csv(&table).unwrap()).unwrap();
        assert!(text.ends_with("\"Fundo \"\"XP\"\"\""));
    }

    #[test]
    fn placeholder_rows_are_skipped() {
        let table = table(
            &["Data", "SELIC"],
            vec![
                TableRow::Placeholder("Carregando...".to_string()),
                cells(&["02/01/2024", "11,75%"]),
                cells(&["incompleta"]),
            ],
        );
        let text = String::from_utf8(table_to_csv(&table).unwrap()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(!text.contains("Carregando"));
        assert!(!text.contains("incompleta"));
    }

    #[test]
    fn placeholder_only_table_has_nothing_to_export() {
        let table = RenderedTable::placeholder(vec![Column::new("Data")], "Nenhum dado");
        let err = table_to_csv(&table).unwrap_err();
        assert!(matches!(err, ExportError::NothingToExport));
    }

    #[test]
    fn history_filename_embeds_date() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 9).unwrap();
        assert_eq!(history_filename(date), "historico_rendimentos_2024-07-09.csv");
    }
}
