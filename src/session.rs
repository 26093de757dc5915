//! The history dashboard state: filters in, chart and table out.
//!
//! A refresh is split into [`DashboardSession::begin_refresh`] (validate and
//! issue a token), [`PendingFetch::run`] (the network call, which may run on
//! another task) and [`DashboardSession::complete`] (render, unless a newer
//! refresh has been issued in the meantime).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::DashboardApi;
use crate::catalog::{all_assets, AssetKey};
use crate::chart::{render_chart, ChartCanvas, NO_DATA_MESSAGE};
use crate::clock::Clock;
use crate::export::{export_table, history_filename, ExportError};
use crate::format::NumberFormatter;
use crate::history::{
    fetch_history, DateRange, FetchError, FilterError, HistoryQuery, QueryPlan, RequestSequence,
    RequestToken, Selection, Series, DEFAULT_MAX_SPAN_MONTHS,
};
use crate::notify::{Level, Notifier, DEFAULT_DISMISS_AFTER};
use crate::table::{history_columns, render_history_table, RenderedTable, HISTORY_EMPTY_MESSAGE};

pub const DEFAULT_SPAN_DAYS: u32 = 30;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub formatter: NumberFormatter,
    pub default_span_days: u32,
    pub default_assets: Vec<AssetKey>,
    pub max_span_months: u32,
    pub dismiss_after: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            formatter: NumberFormatter::default(),
            default_span_days: DEFAULT_SPAN_DAYS,
            default_assets: all_assets(),
            max_span_months: DEFAULT_MAX_SPAN_MONTHS,
            dismiss_after: DEFAULT_DISMISS_AFTER,
        }
    }
}

/// A validated request waiting to be sent.
#[derive(Debug, Clone)]
pub struct PendingFetch {
    pub token: RequestToken,
    pub query: HistoryQuery,
}

impl PendingFetch {
    pub async fn run(self, api: &dyn DashboardApi) -> FetchCompletion {
        let result = fetch_history(api, &self.query).await;
        FetchCompletion {
            token: self.token,
            query: self.query,
            result,
        }
    }
}

#[derive(Debug)]
pub struct FetchCompletion {
    pub token: RequestToken,
    pub query: HistoryQuery,
    pub result: Result<Series, FetchError>,
}

/// What [`DashboardSession::begin_refresh`] decided.
#[derive(Debug)]
pub enum Refresh {
    /// Settled without a network call.
    Done(RefreshOutcome),
    Pending(PendingFetch),
}

#[derive(Debug)]
pub enum RefreshOutcome {
    /// Filters rejected before any request was made.
    Rejected(FilterError),
    /// No asset selected; empty states rendered.
    Cleared,
    Rendered { points: usize },
    Failed(FetchError),
    /// A newer refresh was issued before this one finished.
    Stale,
}

impl RefreshOutcome {
    /// Outcomes that end in an error notification.
    pub fn is_error(&self) -> bool {
        match self {
            Self::Rejected(err) => err.level() == Level::Error,
            Self::Failed(err) => fetch_error_level(err) == Level::Error,
            Self::Cleared | Self::Rendered { .. } | Self::Stale => false,
        }
    }
}

fn fetch_error_level(err: &FetchError) -> Level {
    match err {
        FetchError::EmptyResult => Level::Warning,
        FetchError::Api(_) => Level::Error,
    }
}

pub struct DashboardSession {
    api: Arc<dyn DashboardApi>,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
    canvas: ChartCanvas,
    table: RenderedTable,
    series: Option<Series>,
    notifier: Notifier,
    sequence: RequestSequence,
    initialized: bool,
}

impl std::fmt::Debug for DashboardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardSession")
            .field("settings", &self.settings)
            .field("canvas", &self.canvas)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl DashboardSession {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        clock: Arc<dyn Clock>,
        settings: SessionSettings,
    ) -> Self {
        let notifier = Notifier::new(Arc::clone(&clock), settings.dismiss_after);
        let table = RenderedTable::new(history_columns(&settings.default_assets));
        Self {
            api,
            clock,
            settings,
            canvas: ChartCanvas::new(),
            table,
            series: None,
            notifier,
            sequence: RequestSequence::new(),
            initialized: false,
        }
    }

    /// The last `default_span_days` ending today, with the default assets.
    pub fn default_selection(&self) -> Selection {
        Selection::for_range(
            DateRange::ending_on(self.clock.today(), self.settings.default_span_days),
            self.settings.default_assets.clone(),
        )
    }

    /// First refresh with the default selection. Later calls do nothing.
    pub fn initialize(&mut self) -> Option<Refresh> {
        if self.initialized {
            debug!("session already initialized");
            return None;
        }
        self.initialized = true;
        let selection = self.default_selection();
        Some(self.begin_refresh(&selection))
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Validate `selection` and either settle right away or hand back the
    /// request to send.
    pub fn begin_refresh(&mut self, selection: &Selection) -> Refresh {
        match selection.validate(self.settings.max_span_months) {
            Err(err) => {
                // The filters changed, so anything still in flight is outdated.
                self.sequence.next();
                self.notifier.notify(err.to_string(), err.level());
                Refresh::Done(RefreshOutcome::Rejected(err))
            }
            Ok(QueryPlan::Empty) => {
                self.sequence.next();
                warn!("no asset selected; chart not rendered");
                self.canvas.show_placeholder(NO_DATA_MESSAGE);
                self.table =
                    RenderedTable::placeholder(history_columns(&[]), HISTORY_EMPTY_MESSAGE);
                self.series = None;
                Refresh::Done(RefreshOutcome::Cleared)
            }
            Ok(QueryPlan::Fetch(query)) => {
                let token = self.sequence.next();
                debug!(token = token.value(), ?query, "history refresh issued");
                Refresh::Pending(PendingFetch { token, query })
            }
        }
    }

    /// Apply a finished fetch, unless a newer one has been issued since.
    pub fn complete(&mut self, completion: FetchCompletion) -> RefreshOutcome {
        let FetchCompletion {
            token,
            query,
            result,
        } = completion;
        if !self.sequence.is_current(token) {
            debug!(token = token.value(), "discarding stale history response");
            return RefreshOutcome::Stale;
        }

        match result {
            Ok(series) => {
                if let Err(err) = render_chart(&mut self.canvas, &series, &query.assets) {
                    self.notifier.warning(err.to_string());
                }
                self.table =
                    render_history_table(&series, &query.assets, &self.settings.formatter);
                let points = series.len();
                info!(points, assets = query.assets.len(), "history refreshed");
                self.series = Some(series);
                RefreshOutcome::Rendered { points }
            }
            Err(err) => {
                let message = err.user_message();
                self.canvas.show_placeholder(message.clone());
                self.table =
                    RenderedTable::placeholder(history_columns(&query.assets), message.clone());
                self.series = None;
                self.notifier.notify(message, fetch_error_level(&err));
                RefreshOutcome::Failed(err)
            }
        }
    }

    /// Run a whole refresh in place.
    pub async fn refresh(&mut self, selection: &Selection) -> RefreshOutcome {
        match self.begin_refresh(selection) {
            Refresh::Done(outcome) => outcome,
            Refresh::Pending(pending) => {
                let api = Arc::clone(&self.api);
                let completion = pending.run(api.as_ref()).await;
                self.complete(completion)
            }
        }
    }

    /// Export the table as shown to `dir/historico_rendimentos_<today>.csv`.
    pub fn export_history(&mut self, dir: &Path) -> Result<PathBuf, ExportError> {
        let filename = history_filename(self.clock.today());
        match export_table(&self.table, dir, &filename) {
            Ok(path) => {
                self.notifier
                    .success(format!("Tabela exportada para {}", path.display()));
                Ok(path)
            }
            Err(err @ ExportError::NothingToExport) => {
                self.notifier.warning(err.to_string());
                Err(err)
            }
            Err(err) => {
                self.notifier.error(format!("Falha ao exportar CSV: {err}"));
                Err(err)
            }
        }
    }

    pub fn api(&self) -> Arc<dyn DashboardApi> {
        Arc::clone(&self.api)
    }

    pub fn canvas(&self) -> &ChartCanvas {
        &self.canvas
    }

    pub fn table(&self) -> &RenderedTable {
        &self.table
    }

    pub fn series(&self) -> Option<&Series> {
        self.series.as_ref()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier {
        &mut self.notifier
    }

    pub fn formatter(&self) -> &NumberFormatter {
        &self.settings.formatter
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
