//! Terminal dashboard: the history view (chart, table, filters) and the
//! contribution-vs-amortization comparison view.

mod render;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::TableState;
use ratatui::Terminal;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::debug;

use crate::api::ComparisonForm;
use crate::catalog::{all_assets, AssetKey};
use crate::compare::{ComparisonController, ComparisonError, ComparisonPanel, ComparisonView};
use crate::config::ResolvedConfig;
use crate::export::ExportError;
use crate::history::{DateRange, Selection};
use crate::session::{DashboardSession, FetchCompletion, Refresh, RefreshOutcome};

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const RESIZE_STEP_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuiView {
    History,
    Comparison,
}

impl TuiView {
    fn toggle(self) -> Self {
        match self {
            Self::History => Self::Comparison,
            Self::Comparison => Self::History,
        }
    }
}

/// Work the event loop has to start after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    None,
    Quit,
    Refresh,
    Compare,
}

/// Results of spawned requests, delivered back to the event loop.
#[derive(Debug)]
enum TaskMessage {
    History(FetchCompletion),
    Comparison(Result<ComparisonView, ComparisonError>),
}

struct AppState {
    active_view: TuiView,
    session: DashboardSession,
    controller: Arc<ComparisonController>,
    export_dir: PathBuf,
    catalog: Vec<AssetKey>,
    selected: Vec<bool>,
    range: DateRange,
    loading: bool,
    cursor: Option<usize>,
    form: ComparisonForm,
    field: usize,
    panel: ComparisonPanel,
    comparing: bool,
}

impl AppState {
    fn new(session: DashboardSession, export_dir: PathBuf) -> Self {
        let defaults = session.default_selection();
        let mut catalog = all_assets();
        for key in &defaults.assets {
            if !catalog.contains(key) {
                catalog.push(key.clone());
            }
        }
        let selected = catalog.iter().map(|k| defaults.assets.contains(k)).collect();
        let today = session.clock().today();
        let range = DateRange::ending_on(today, session.settings().default_span_days);
        let controller = Arc::new(ComparisonController::new(
            session.api(),
            session.formatter().clone(),
        ));

        Self {
            active_view: TuiView::History,
            session,
            controller,
            export_dir,
            catalog,
            selected,
            range,
            loading: false,
            cursor: None,
            form: ComparisonForm::FIELDS
                .iter()
                .map(|key| (*key, String::new()))
                .collect(),
            field: 0,
            panel: ComparisonPanel::new(),
            comparing: false,
        }
    }

    /// Selected assets in catalog order.
    fn selected_assets(&self) -> Vec<AssetKey> {
        self.catalog
            .iter()
            .zip(&self.selected)
            .filter(|(_, on)| **on)
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn selection(&self) -> Selection {
        Selection::for_range(self.range, self.selected_assets())
    }

    fn chart_len(&self) -> usize {
        self.session
            .canvas()
            .current()
            .map_or(0, |chart| chart.model().dates.len())
    }

    fn handle_key(&mut self, code: KeyCode, table_state: &mut TableState) -> Action {
        match code {
            KeyCode::Esc => return Action::Quit,
            KeyCode::Tab => {
                self.active_view = self.active_view.toggle();
                return Action::None;
            }
            _ => {}
        }
        match self.active_view {
            TuiView::History => self.handle_history_key(code, table_state),
            TuiView::Comparison => self.handle_comparison_key(code),
        }
    }

    fn handle_history_key(&mut self, code: KeyCode, table_state: &mut TableState) -> Action {
        let step = self.range.days().max(1);
        match code {
            KeyCode::Char('q') => return Action::Quit,
            KeyCode::Char(c @ '0'..='9') => {
                let index = match c.to_digit(10) {
                    Some(0) => 9,
                    Some(n) => n as usize - 1,
                    None => return Action::None,
                };
                let Some(on) = self.selected.get_mut(index) else {
                    return Action::None;
                };
                *on = !*on;
            }
            KeyCode::Char('[') => self.range = self.range.shifted(-step),
            KeyCode::Char(']') => self.range = self.range.shifted(step),
            KeyCode::Char('-') => self.range = self.range.widened(-RESIZE_STEP_DAYS),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.range = self.range.widened(RESIZE_STEP_DAYS)
            }
            KeyCode::Char('r') => {}
            KeyCode::Char('e') => {
                let _ = self.session.export_history(&self.export_dir);
                return Action::None;
            }
            KeyCode::Char('x') => {
                self.session.notifier_mut().dismiss();
                return Action::None;
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.cursor = Some(self.cursor.map_or(0, |c| c.saturating_sub(1)));
                self.clamp_cursor();
                return Action::None;
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.cursor = Some(self.cursor.map_or(0, |c| c + 1));
                self.clamp_cursor();
                return Action::None;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                select_prev(self.session.table().rows.len(), table_state);
                return Action::None;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                select_next(self.session.table().rows.len(), table_state);
                return Action::None;
            }
            _ => return Action::None,
        }
        Action::Refresh
    }

    fn handle_comparison_key(&mut self, code: KeyCode) -> Action {
        let key = ComparisonForm::FIELDS[self.field];
        match code {
            KeyCode::Char('q') => return Action::Quit,
            KeyCode::Enter => return Action::Compare,
            KeyCode::Up | KeyCode::Char('k') => self.field = self.field.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.field = (self.field + 1).min(ComparisonForm::FIELDS.len() - 1)
            }
            KeyCode::Char('d') => {
                self.panel.toggle_breakdown();
            }
            KeyCode::Char('e') => self.export_comparison(),
            KeyCode::Char('x') => {
                self.session.notifier_mut().dismiss();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || matches!(c, ',' | '.' | '-') => {
                let mut value = self.form.get(key).unwrap_or_default().to_string();
                value.push(c);
                self.form.set(key, value);
            }
            KeyCode::Backspace => {
                let mut value = self.form.get(key).unwrap_or_default().to_string();
                value.pop();
                self.form.set(key, value);
            }
            _ => {}
        }
        Action::None
    }

    fn export_comparison(&mut self) {
        let notifier = self.session.notifier_mut();
        match self.panel.export(&self.export_dir) {
            Ok(path) => {
                notifier.success(format!("Tabela exportada para {}", path.display()));
            }
            Err(err @ ExportError::NothingToExport) => {
                notifier.warning(err.to_string());
            }
            Err(err) => {
                notifier.error(format!("Falha ao exportar CSV: {err}"));
            }
        }
    }

    fn clamp_cursor(&mut self) {
        let len = self.chart_len();
        self.cursor = match self.cursor {
            _ if len == 0 => None,
            Some(c) => Some(c.min(len - 1)),
            None => None,
        };
    }

    fn start(&mut self, refresh: Refresh, tx: &UnboundedSender<TaskMessage>) {
        match refresh {
            Refresh::Done(outcome) => debug!(?outcome, "refresh settled without request"),
            Refresh::Pending(pending) => {
                self.loading = true;
                let api = self.session.api();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let completion = pending.run(api.as_ref()).await;
                    let _ = tx.send(TaskMessage::History(completion));
                });
            }
        }
    }

    fn start_refresh(&mut self, tx: &UnboundedSender<TaskMessage>) {
        let selection = self.selection();
        let refresh = self.session.begin_refresh(&selection);
        if matches!(refresh, Refresh::Done(_)) {
            self.loading = false;
        }
        self.start(refresh, tx);
    }

    fn start_compare(&mut self, tx: &UnboundedSender<TaskMessage>) {
        self.comparing = true;
        let controller = Arc::clone(&self.controller);
        let form = self.form.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = controller.submit(&form).await;
            let _ = tx.send(TaskMessage::Comparison(result));
        });
    }

    fn apply(&mut self, message: TaskMessage) {
        match message {
            TaskMessage::History(completion) => {
                if matches!(self.session.complete(completion), RefreshOutcome::Stale) {
                    return;
                }
                self.loading = false;
                self.clamp_cursor();
            }
            TaskMessage::Comparison(result) => {
                self.comparing = false;
                if let Err(err) = &result {
                    self.session.notifier_mut().error(err.user_message());
                }
                self.panel.apply(result);
            }
        }
    }
}

pub async fn run_tui(session: DashboardSession, config: &ResolvedConfig) -> Result<()> {
    let mut app_state = AppState::new(session, config.export_dir.clone());

    let mut table_state = TableState::default();
    table_state.select(Some(0));
    let mut breakdown_state = TableState::default();

    let mut terminal = enter_terminal()?;
    let result = run_event_loop(
        &mut terminal,
        &mut app_state,
        &mut table_state,
        &mut breakdown_state,
    )
    .await;
    leave_terminal(&mut terminal)?;
    result
}

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app_state: &mut AppState,
    table_state: &mut TableState,
    breakdown_state: &mut TableState,
) -> Result<()> {
    let (tx, mut rx) = unbounded_channel();
    if let Some(refresh) = app_state.session.initialize() {
        app_state.start(refresh, &tx);
    }

    loop {
        while let Ok(message) = rx.try_recv() {
            app_state.apply(message);
        }
        app_state.session.notifier_mut().tick();

        clamp_selection(app_state.session.table().rows.len(), table_state);
        terminal.draw(|frame| render::render(frame, app_state, table_state, breakdown_state))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app_state.handle_key(key.code, table_state) {
            Action::Quit => return Ok(()),
            Action::Refresh => app_state.start_refresh(&tx),
            Action::Compare => app_state.start_compare(&tx),
            Action::None => {}
        }
    }
}

fn clamp_selection(visible_len: usize, table_state: &mut TableState) {
    if visible_len == 0 {
        table_state.select(None);
        return;
    }
    let selected = table_state.selected().unwrap_or(0);
    let clamped = selected.min(visible_len.saturating_sub(1));
    table_state.select(Some(clamped));
}

fn select_prev(visible_len: usize, table_state: &mut TableState) {
    if visible_len == 0 {
        table_state.select(None);
        return;
    }
    let next = table_state.selected().unwrap_or(0).saturating_sub(1);
    table_state.select(Some(next));
}

fn select_next(visible_len: usize, table_state: &mut TableState) {
    if visible_len == 0 {
        table_state.select(None);
        return;
    }
    let current = table_state.selected().unwrap_or(0);
    let max_index = visible_len.saturating_sub(1);
    table_state.select(Some((current + 1).min(max_index)));
}

fn enter_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn leave_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, DashboardClient};
    use crate::clock::FixedClock;
    use crate::history::{Series, SeriesPoint};
    use crate::notify::Level;
    use crate::session::SessionSettings;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn app() -> AppState {
        let session = DashboardSession::new(
            Arc::new(DashboardClient::new("http://127.0.0.1:9")),
            Arc::new(FixedClock::on(date(2024, 6, 30))),
            SessionSettings::default(),
        );
        AppState::new(session, std::env::temp_dir())
    }

    fn press(app: &mut AppState, code: KeyCode) -> Action {
        let mut table_state = TableState::default();
        app.handle_key(code, &mut table_state)
    }

    #[test]
    fn starts_with_default_range_and_every_asset() {
        let app = app();
        assert_eq!(app.range, DateRange::new(date(2024, 5, 31), date(2024, 6, 30)));
        assert_eq!(app.selected_assets(), all_assets());
        assert_eq!(app.selection(), app.session.default_selection());
    }

    #[test]
    fn digit_keys_toggle_assets_and_refresh() {
        let mut app = app();
        assert_eq!(press(&mut app, KeyCode::Char('1')), Action::Refresh);
        assert!(!app.selected_assets().contains(&AssetKey::new("selic")));

        press(&mut app, KeyCode::Char('0'));
        assert!(!app.selected_assets().contains(&AssetKey::new("poupanca")));

        press(&mut app, KeyCode::Char('1'));
        assert_eq!(app.selected_assets()[0], AssetKey::new("selic"));
        assert_eq!(app.selected_assets().len(), 9);
    }

    #[test]
    fn brackets_shift_by_range_length_and_minus_plus_resize() {
        let mut app = app();
        assert_eq!(press(&mut app, KeyCode::Char('[')), Action::Refresh);
        assert_eq!(app.range, DateRange::new(date(2024, 5, 1), date(2024, 5, 31)));

        press(&mut app, KeyCode::Char(']'));
        assert_eq!(app.range.end, date(2024, 6, 30));

        press(&mut app, KeyCode::Char('+'));
        assert_eq!(app.range.days(), 60);
        press(&mut app, KeyCode::Char('-'));
        press(&mut app, KeyCode::Char('-'));
        press(&mut app, KeyCode::Char('-'));
        assert_eq!(app.range.days(), 0);
    }

    #[test]
    fn tab_switches_view_and_q_quits() {
        let mut app = app();
        assert_eq!(press(&mut app, KeyCode::Tab), Action::None);
        assert_eq!(app.active_view, TuiView::Comparison);
        assert_eq!(press(&mut app, KeyCode::Char('q')), Action::Quit);
        assert_eq!(press(&mut app, KeyCode::Esc), Action::Quit);
    }

    #[test]
    fn comparison_form_editing() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);

        for c in "1.000,5".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.form.get(ComparisonForm::MONTHLY_AMOUNT), Some("1.000,"));

        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('1'));
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.form.get(ComparisonForm::REMAINING_INSTALLMENTS), Some("12"));

        press(&mut app, KeyCode::Char('d'));
        assert!(app.panel.breakdown_visible());
        assert_eq!(press(&mut app, KeyCode::Enter), Action::Compare);
    }

    #[test]
    fn cursor_stays_within_chart() {
        let mut app = app();
        press(&mut app, KeyCode::Char('l'));
        assert_eq!(app.cursor, None);

        let series = Series::from_points([
            SeriesPoint::new(date(2024, 6, 1)).with_value("selic", Some(10.5)),
            SeriesPoint::new(date(2024, 6, 2)).with_value("selic", Some(10.5)),
        ]);
        let query = match app.session.begin_refresh(&app.selection()) {
            Refresh::Pending(pending) => pending,
            Refresh::Done(outcome) => panic!("unexpected {outcome:?}"),
        };
        app.apply(TaskMessage::History(FetchCompletion {
            token: query.token,
            query: query.query,
            result: Ok(series),
        }));

        for _ in 0..5 {
            press(&mut app, KeyCode::Char('l'));
        }
        assert_eq!(app.cursor, Some(1));
        press(&mut app, KeyCode::Char('h'));
        assert_eq!(app.cursor, Some(0));
    }

    #[test]
    fn failed_comparison_notifies_and_hides_panel() {
        let mut app = app();
        app.apply(TaskMessage::Comparison(Err(ComparisonError::Api(
            ApiError::Status {
                status: 400,
                message: Some("Parcelas inválidas".to_string()),
            },
        ))));
        assert!(app.panel.view().is_none());
        let notice = app.session.notifier().current().unwrap();
        assert_eq!(notice.level, Level::Error);
        assert_eq!(notice.message, "Parcelas inválidas");
    }

    #[test]
    fn selection_helpers_clamp() {
        let mut state = TableState::default();
        select_next(3, &mut state);
        select_next(3, &mut state);
        select_next(3, &mut state);
        assert_eq!(state.selected(), Some(2));
        clamp_selection(1, &mut state);
        assert_eq!(state.selected(), Some(0));
        select_prev(0, &mut state);
        assert_eq!(state.selected(), None);
    }
}
