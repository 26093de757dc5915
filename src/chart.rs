//! Chart model and the canvas that owns the single live chart instance.
//!
//! The model is independent of any drawing backend; the TUI turns the
//! current [`ChartInstance`] into a ratatui `Chart`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use crate::catalog::{describe_key, AssetKey, Rgb};
use crate::format::{NumberFormatter, ValueKind};
use crate::history::Series;

pub const NO_DATA_MESSAGE: &str = "Nenhum dado disponível para o gráfico.";

const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("{}", NO_DATA_MESSAGE)]
    NoData,
}

/// One line on the chart. The asset key travels with the dataset so
/// formatting never has to recover it from the display label.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartDataset {
    pub asset: AssetKey,
    pub label: String,
    pub kind: ValueKind,
    pub color: Rgb,
    /// Aligned with [`ChartModel::dates`]; `None` leaves a gap.
    pub values: Vec<Option<f64>>,
}

impl ChartDataset {
    /// `(x, y)` pairs for the non-null values, x being the date index.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|y| (i as f64, y)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartModel {
    /// Oldest first.
    pub dates: Vec<NaiveDate>,
    pub datasets: Vec<ChartDataset>,
}

impl ChartModel {
    /// Build datasets for `assets` over `series`, oldest date first.
    ///
    /// Assets without a single non-null value are left out entirely. An
    /// empty series, or one where no asset survives, is [`RenderError::NoData`].
    pub fn build(series: &Series, assets: &[AssetKey]) -> Result<Self, RenderError> {
        if series.is_empty() {
            return Err(RenderError::NoData);
        }

        let dates: Vec<NaiveDate> = series.ascending().map(|p| p.date).collect();
        let datasets: Vec<ChartDataset> = assets
            .iter()
            .filter(|asset| series.has_coverage(asset))
            .map(|asset| {
                let descriptor = describe_key(asset);
                ChartDataset {
                    asset: asset.clone(),
                    label: descriptor.label,
                    kind: descriptor.kind,
                    color: descriptor.color,
                    values: series.ascending().map(|p| p.value(asset)).collect(),
                }
            })
            .collect();

        if datasets.is_empty() {
            return Err(RenderError::NoData);
        }
        Ok(Self { dates, datasets })
    }

    /// The value kind shared by every dataset, or `None` when they differ
    /// and the axis cannot assume a single unit.
    pub fn axis_kind(&self) -> Option<ValueKind> {
        let first = self.datasets.first()?.kind;
        self.datasets
            .iter()
            .all(|d| d.kind == first)
            .then_some(first)
    }

    pub fn is_mixed_kind(&self) -> bool {
        !self.datasets.is_empty() && self.axis_kind().is_none()
    }

    pub fn date_label(&self, index: usize) -> Option<String> {
        self.dates
            .get(index)
            .map(|d| d.format(DISPLAY_DATE_FORMAT).to_string())
    }

    pub fn format_tick(&self, value: f64, formatter: &NumberFormatter) -> String {
        formatter.format_axis(value, self.axis_kind())
    }

    /// Tooltip lines (`"SELIC: 11,75%"`) for the date at `index`.
    pub fn tooltip(&self, index: usize, formatter: &NumberFormatter) -> Vec<String> {
        if index >= self.dates.len() {
            return Vec::new();
        }
        self.datasets
            .iter()
            .map(|d| {
                let value = d.values.get(index).copied().flatten();
                format!("{}: {}", d.label, formatter.format(value, d.kind))
            })
            .collect()
    }

    /// `[min, max]` over all plotted values, padded so flat lines stay visible.
    pub fn y_bounds(&self) -> [f64; 2] {
        let (min, max) = self
            .datasets
            .iter()
            .flat_map(|d| d.values.iter().flatten().copied())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if !min.is_finite() || !max.is_finite() {
            return [0.0, 1.0];
        }
        let pad = if max > min {
            (max - min) * 0.05
        } else {
            max.abs().max(1.0) * 0.05
        };
        [min - pad, max + pad]
    }

    pub fn x_bounds(&self) -> [f64; 2] {
        [0.0, self.dates.len().saturating_sub(1).max(1) as f64]
    }
}

/// A chart bound to a canvas. Counts itself on the canvas while alive.
#[derive(Debug)]
pub struct ChartInstance {
    id: u64,
    model: ChartModel,
    live: Arc<AtomicUsize>,
}

impl ChartInstance {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn model(&self) -> &ChartModel {
        &self.model
    }
}

impl Drop for ChartInstance {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// What the chart area currently shows.
#[derive(Debug)]
pub enum Surface<'a> {
    Blank,
    Placeholder(&'a str),
    Chart(&'a ChartInstance),
}

/// The drawing surface holding at most one live chart.
///
/// Only [`ChartCanvas::replace`] creates instances and it always destroys
/// the previous one first.
#[derive(Debug, Default)]
pub struct ChartCanvas {
    current: Option<ChartInstance>,
    placeholder: Option<String>,
    live: Arc<AtomicUsize>,
    next_id: u64,
}

impl ChartCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&ChartInstance> {
        self.current.as_ref()
    }

    pub fn surface(&self) -> Surface<'_> {
        match (&self.current, &self.placeholder) {
            (Some(instance), _) => Surface::Chart(instance),
            (None, Some(message)) => Surface::Placeholder(message),
            (None, None) => Surface::Blank,
        }
    }

    /// Destroy the current chart, then bind a new one for `model`.
    pub fn replace(&mut self, model: ChartModel) -> &ChartInstance {
        self.destroy();
        self.placeholder = None;
        self.next_id += 1;
        self.live.fetch_add(1, Ordering::SeqCst);
        debug!(id = self.next_id, datasets = model.datasets.len(), "chart created");
        self.current.insert(ChartInstance {
            id: self.next_id,
            model,
            live: Arc::clone(&self.live),
        })
    }

    /// Destroy the current chart and draw an inline message instead.
    pub fn show_placeholder(&mut self, message: impl Into<String>) {
        self.destroy();
        self.placeholder = Some(message.into());
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    /// Number of chart instances bound to this canvas that are still alive.
    pub fn live_instances(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn destroy(&mut self) {
        if let Some(previous) = self.current.take() {
            debug!(id = previous.id, "chart destroyed");
        }
    }
}

/// Render `series` onto `canvas`.
///
/// On [`RenderError::NoData`] the canvas shows the no-data placeholder and
/// the caller is expected to report the error.
pub fn render_chart<'c>(
    canvas: &'c mut ChartCanvas,
    series: &Series,
    assets: &[AssetKey],
) -> Result<&'c ChartInstance, RenderError> {
    match ChartModel::build(series, assets) {
        Ok(model) => Ok(canvas.replace(model)),
        Err(err) => {
            canvas.show_placeholder(err.to_string());
            Err(err)
        }
    }
}
