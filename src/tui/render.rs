use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, TableState,
};
use ratatui::Frame;

use crate::api::ComparisonForm;
use crate::catalog::{describe_key, Rgb};
use crate::chart::{ChartInstance, Surface};
use crate::compare::{ComparisonView, Highlight};
use crate::history::DATE_FORMAT;
use crate::notify::Level;
use crate::table::{RenderedTable, TableRow};

use super::{AppState, TuiView};

const CURSOR_COLOR: Color = Color::DarkGray;

pub(super) fn render(
    frame: &mut Frame<'_>,
    app_state: &AppState,
    table_state: &mut TableState,
    breakdown_state: &mut TableState,
) {
    match app_state.active_view {
        TuiView::History => render_history_view(frame, app_state, table_state),
        TuiView::Comparison => render_comparison_view(frame, app_state, breakdown_state),
    }
}

fn render_history_view(frame: &mut Frame<'_>, app_state: &AppState, table_state: &mut TableState) {
    let [summary_area, chart_area, tooltip_area, table_area, notice_area, help_area] =
        Layout::vertical([
            Constraint::Length(4),
            Constraint::Min(10),
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .areas(frame.area());

    let status = if app_state.loading { "carregando..." } else { "pronto" };
    let range = format!(
        "{} a {} ({} dias)",
        app_state.range.start.format(DATE_FORMAT),
        app_state.range.end.format(DATE_FORMAT),
        app_state.range.days()
    );
    let assets: Vec<Span> = app_state
        .catalog
        .iter()
        .zip(&app_state.selected)
        .enumerate()
        .map(|(i, (key, on))| {
            let descriptor = describe_key(key);
            let hotkey = (i + 1) % 10;
            let style = if *on {
                Style::default().fg(rgb(descriptor.color))
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let mark = if *on { "x" } else { " " };
            Span::styled(format!("{hotkey}[{mark}] {}  ", descriptor.label), style)
        })
        .collect();
    let summary = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                "Histórico de rendimentos  ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("período={range} | {status}")),
        ]),
        Line::from(assets),
    ])
    .block(Block::default().borders(Borders::ALL).title("Filtros"));
    frame.render_widget(summary, summary_area);

    match app_state.session.canvas().surface() {
        Surface::Chart(instance) => {
            render_chart(frame, app_state, instance, chart_area);
            let tooltip = app_state
                .cursor
                .and_then(|i| {
                    let model = instance.model();
                    let date = model.date_label(i)?;
                    let values = model.tooltip(i, app_state.session.formatter());
                    Some(format!("{date}  {}", values.join("  ")))
                })
                .unwrap_or_else(|| "h/l move o cursor do gráfico".to_string());
            frame.render_widget(
                Paragraph::new(tooltip).style(Style::default().fg(Color::Gray)),
                tooltip_area,
            );
        }
        Surface::Placeholder(message) => {
            let paragraph = Paragraph::new(message.to_string())
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().borders(Borders::ALL).title("Gráfico"));
            frame.render_widget(paragraph, chart_area);
        }
        Surface::Blank => {
            frame.render_widget(
                Block::default().borders(Borders::ALL).title("Gráfico"),
                chart_area,
            );
        }
    }

    let table = rendered_table(app_state.session.table(), "Histórico");
    frame.render_stateful_widget(table, table_area, table_state);

    render_notification(frame, app_state, notice_area);

    let help = Paragraph::new(
        "q/esc sair | tab comparador | 1..0 ativos | [ ] mover período | \
         -/+ período ±30d | h/l cursor | j/k linhas | r atualizar | e exportar CSV | \
         x fechar aviso",
    )
    .block(Block::default().borders(Borders::ALL).title("Teclas"));
    frame.render_widget(help, help_area);
}

fn render_chart(frame: &mut Frame<'_>, app_state: &AppState, instance: &ChartInstance, area: Rect) {
    let model = instance.model();
    let formatter = app_state.session.formatter();
    let [y_min, y_max] = model.y_bounds();
    let [x_min, x_max] = model.x_bounds();

    let points: Vec<Vec<(f64, f64)>> = model.datasets.iter().map(|d| d.points()).collect();
    let cursor_points: Vec<(f64, f64)> = app_state
        .cursor
        .map(|i| vec![(i as f64, y_min), (i as f64, y_max)])
        .unwrap_or_default();

    let mut datasets: Vec<Dataset> = model
        .datasets
        .iter()
        .zip(&points)
        .map(|(dataset, data)| {
            Dataset::default()
                .name(dataset.label.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(rgb(dataset.color)))
                .data(data)
        })
        .collect();
    if !cursor_points.is_empty() {
        datasets.push(
            Dataset::default()
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(CURSOR_COLOR))
                .data(&cursor_points),
        );
    }

    let last = model.dates.len().saturating_sub(1);
    let x_labels: Vec<String> = [0, last / 2, last]
        .iter()
        .filter_map(|i| model.date_label(*i))
        .collect();
    let y_labels: Vec<String> = [y_min, (y_min + y_max) / 2.0, y_max]
        .iter()
        .map(|v| model.format_tick(*v, formatter))
        .collect();

    let title = if model.is_mixed_kind() {
        format!("Gráfico #{} (unidades mistas)", instance.id())
    } else {
        format!("Gráfico #{}", instance.id())
    };
    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(title))
        .x_axis(
            Axis::default()
                .bounds([x_min, x_max])
                .labels(x_labels)
                .style(Style::default().fg(Color::Gray)),
        )
        .y_axis(
            Axis::default()
                .bounds([y_min, y_max])
                .labels(y_labels)
                .style(Style::default().fg(Color::Gray)),
        );
    frame.render_widget(chart, area);
}

fn render_comparison_view(
    frame: &mut Frame<'_>,
    app_state: &AppState,
    breakdown_state: &mut TableState,
) {
    let [summary_area, form_area, result_area, breakdown_area, notice_area, help_area] =
        Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .areas(frame.area());

    let status = if app_state.comparing { "calculando..." } else { "pronto" };
    let summary = Paragraph::new(Line::from(vec![
        Span::styled(
            "Aporte mensal: investir ou amortizar?  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(status),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Comparador"));
    frame.render_widget(summary, summary_area);

    let fields: Vec<Line> = ComparisonForm::FIELDS
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let value = app_state.form.get(key).unwrap_or_default();
            let selected = i == app_state.field;
            let marker = if selected { ">> " } else { "   " };
            let style = if selected {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::raw(marker),
                Span::styled(format!("{:<44}", field_label(key)), style),
                Span::styled(value.to_string(), style.fg(Color::Yellow)),
            ])
        })
        .collect();
    frame.render_widget(
        Paragraph::new(fields).block(Block::default().borders(Borders::ALL).title("Dados")),
        form_area,
    );

    match app_state.panel.view() {
        Some(view) => {
            frame.render_widget(result_paragraph(view), result_area);
            if app_state.panel.breakdown_visible() {
                let table = rendered_table(&view.breakdown, "Detalhamento mensal");
                frame.render_stateful_widget(table, breakdown_area, breakdown_state);
            } else {
                let hint = Paragraph::new("d mostra o detalhamento mensal")
                    .style(Style::default().fg(Color::DarkGray))
                    .block(Block::default().borders(Borders::ALL).title("Detalhamento mensal"));
                frame.render_widget(hint, breakdown_area);
            }
        }
        None => {
            let text = app_state
                .panel
                .error()
                .unwrap_or("Preencha os campos e pressione enter.");
            let paragraph = Paragraph::new(text.to_string())
                .block(Block::default().borders(Borders::ALL).title("Resultado"));
            frame.render_widget(paragraph, result_area);
            frame.render_widget(Block::default().borders(Borders::ALL), breakdown_area);
        }
    }

    render_notification(frame, app_state, notice_area);

    let help = Paragraph::new(
        "esc sair | tab histórico | j/k campo | digite para editar | enter calcular | \
         d detalhamento | e exportar CSV | x fechar aviso",
    )
    .block(Block::default().borders(Borders::ALL).title("Teclas"));
    frame.render_widget(help, help_area);
}

fn result_paragraph(view: &ComparisonView) -> Paragraph<'_> {
    let color = highlight_color(view.recommendation.highlight);
    let months = view
        .months
        .map(|m| format!(" em {m} meses"))
        .unwrap_or_default();
    Paragraph::new(vec![
        Line::from(Span::styled(
            view.recommendation.headline.clone(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(view.recommendation.sentence.clone()),
        Line::from(format!(
            "Montante investido: {} | Economia de juros: {} | Diferença: {}{months}",
            view.invested, view.interest_saved, view.difference
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title("Resultado"),
    )
}

fn rendered_table<'a>(table: &'a RenderedTable, title: &'a str) -> Table<'a> {
    // Placeholder rows span the whole table, so draw them as a single column.
    if let Some(message) = table.placeholder_message() {
        return Table::new(
            [Row::new([Cell::from(message)]).style(Style::default().fg(Color::DarkGray))],
            [Constraint::Fill(1)],
        )
        .header(
            Row::new([table.header().join(" | ")])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(title));
    }

    let widths: Vec<Constraint> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            if i == 0 {
                Constraint::Length(12)
            } else {
                Constraint::Min(column.title.chars().count().max(10) as u16)
            }
        })
        .collect();
    let rows = table.rows.iter().map(|row| match row {
        TableRow::Cells(cells) => Row::new(cells.iter().map(|c| Cell::from(c.as_str()))),
        TableRow::Placeholder(message) => Row::new([Cell::from(message.as_str())])
            .style(Style::default().fg(Color::DarkGray)),
    });

    Table::new(rows, widths)
        .header(
            Row::new(table.header())
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol(">> ")
}

fn render_notification(frame: &mut Frame<'_>, app_state: &AppState, area: Rect) {
    let paragraph = match app_state.session.notifier().current() {
        Some(notice) => Paragraph::new(notice.message.clone())
            .style(Style::default().fg(level_color(notice.level)))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(notice.level.label()),
            ),
        None => Paragraph::new("").block(Block::default().borders(Borders::ALL)),
    };
    frame.render_widget(paragraph, area);
}

fn field_label(key: &str) -> &'static str {
    match key {
        ComparisonForm::MONTHLY_AMOUNT => "Valor disponível mensal (R$)",
        ComparisonForm::REMAINING_INSTALLMENTS => "Parcelas restantes",
        ComparisonForm::MONTHLY_RETURN_RATE => "Taxa de rendimento mensal (%)",
        ComparisonForm::MONTHLY_LOAN_RATE => "Taxa de juros do financiamento mensal (%)",
        _ => "Campo",
    }
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Info => Color::Cyan,
        Level::Success => Color::Green,
        Level::Warning => Color::Yellow,
        Level::Error => Color::Red,
    }
}

fn highlight_color(highlight: Highlight) -> Color {
    match highlight {
        Highlight::Success => Color::Green,
        Highlight::Danger => Color::Red,
        Highlight::Neutral => Color::Gray,
    }
}

fn rgb(color: Rgb) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}
