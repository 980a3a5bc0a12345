//! Ratatui-based terminal UI.
//!
//! A settings panel (ticker, optional date range, horizon and test share)
//! drives the shared forecast pipeline. Results are shown as two Plotters
//! charts (history, and history + forecast), a price table, a forecast table
//! and the evaluation RMSE.

use std::io;
use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Terminal,
};
use tracing::info;

use crate::app::pipeline::{run_forecast, ForecastResponse};
use crate::data::PriceSource;
use crate::error::{AppError, EXIT_INTERNAL};
use crate::fit::ModelSelector;
use crate::plot::ChartData;
use crate::report::format_evaluation;

mod form;
mod plotters_chart;

pub use form::{Field, FormAction, FormState};
use plotters_chart::ForecastChart;

const NOTES: &str = "Disclaimer: forecasts are produced from historical prices by a statistical \
model, for educational and informational purposes only. They are not financial, investment or \
trading advice.\n\n\
The model is chosen automatically: the differencing order comes from a KPSS test and the AR/MA \
orders from an information-criterion search over ARIMA candidates.\n\n\
RMSE (root mean squared error) measures the average deviation of the held-out prices from the \
predictions made by a model fitted on the rest. Lower is better.";

/// Start the TUI.
pub fn run(
    form: FormState,
    source: Box<dyn PriceSource>,
    selector: Box<dyn ModelSelector>,
    today: NaiveDate,
) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(EXIT_INTERNAL, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(form, source, selector, today);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(EXIT_INTERNAL, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(EXIT_INTERNAL, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    form: FormState,
    source: Box<dyn PriceSource>,
    selector: Box<dyn ModelSelector>,
    today: NaiveDate,
    response: Option<ForecastResponse>,
    status: String,
    show_notes: bool,
}

impl App {
    fn new(form: FormState, source: Box<dyn PriceSource>, selector: Box<dyn ModelSelector>, today: NaiveDate) -> Self {
        Self {
            form,
            source,
            selector,
            today,
            response: None,
            status: "Enter a ticker and press g to get predictions.".to_string(),
            show_notes: false,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(EXIT_INTERNAL, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(EXIT_INTERNAL, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(EXIT_INTERNAL, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => needs_redraw = true,
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.show_notes && !self.form.editing && code != KeyCode::Char('q') {
            self.show_notes = false;
            return false;
        }

        match self.form.handle_key(code) {
            FormAction::Quit => return true,
            FormAction::Run => self.run_pipeline(),
            FormAction::ToggleNotes => self.show_notes = !self.show_notes,
            FormAction::DebugBundle => self.write_debug_bundle(),
            FormAction::None => {}
        }
        false
    }

    /// Re-run the whole pipeline. Any failure replaces the previous output.
    fn run_pipeline(&mut self) {
        let request = match self.form.to_request(self.today) {
            Ok(request) => request,
            Err(message) => {
                self.response = None;
                self.status = message;
                return;
            }
        };

        match run_forecast(&request, self.source.as_ref(), self.selector.as_ref()) {
            Ok(response) if response.skipped => {
                self.response = None;
                self.status = "Enter a ticker first.".to_string();
            }
            Ok(response) => {
                self.status = match response.errors.first() {
                    Some(err) => err.to_string(),
                    None => format!(
                        "{}: {} prices, {} forecast day(s).",
                        response.ticker,
                        response.series.len(),
                        request.horizon
                    ),
                };
                info!(ticker = %response.ticker, ok = response.is_ok(), "tui run finished");
                self.response = Some(response);
            }
            Err(err) => {
                self.response = None;
                self.status = err.to_string();
            }
        }
    }

    fn write_debug_bundle(&mut self) {
        let Some(response) = &self.response else {
            self.status = "Nothing to write yet (press g first).".to_string();
            return;
        };
        self.status = match crate::debug::write_debug_bundle(
            Path::new("debug"),
            response,
            self.source.name(),
            &self.selector.describe(),
        ) {
            Ok(path) => format!("Wrote debug bundle: {}", path.display()),
            Err(err) => format!("Debug write failed: {err}"),
        };
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);

        if self.show_notes {
            draw_notes(frame, chunks[1]);
        }
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let summary = match &self.response {
            Some(r) => {
                let rmse = r
                    .evaluation
                    .as_ref()
                    .map(format_evaluation)
                    .unwrap_or_else(|| "RMSE: -".to_string());
                let model = r
                    .model
                    .as_ref()
                    .map(|m| m.summary().display_name())
                    .unwrap_or_else(|| "-".to_string());
                format!("{} | {rmse} | model: {model}", r.ticker)
            }
            None => "no results".to_string(),
        };
        let line = Line::from(vec![
            Span::styled("pf", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(" AutoARIMA stock forecast | "),
            Span::styled(summary, Style::default().fg(Color::Gray)),
        ]);
        frame.render_widget(Paragraph::new(line).block(Block::default().borders(Borders::ALL)), area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(46), Constraint::Min(0)])
            .split(area);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(8), Constraint::Min(0)])
            .split(columns[0]);
        self.draw_settings(frame, left[0]);
        self.draw_tables(frame, left[1]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(columns[1]);

        let (history, combined) = self.chart_data();
        self.draw_chart(frame, right[0], "Adjusted close", history.as_ref());
        self.draw_chart(frame, right[1], "Actual (blue) and forecast (green)", combined.as_ref());
    }

    /// History-only chart and the full series with its forecast overlaid.
    fn chart_data(&self) -> (Option<ChartData>, Option<ChartData>) {
        match &self.response {
            Some(r) => (
                ChartData::new(&r.series, None),
                ChartData::new(&r.series, r.forecast.as_ref()),
            ),
            None => (None, None),
        }
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect, title: &str, data: Option<&ChartData>) {
        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        match data {
            Some(data) => frame.render_widget(
                ForecastChart {
                    data,
                    y_label: "price",
                },
                inner,
            ),
            None => frame.render_widget(
                Paragraph::new("No data.").style(Style::default().fg(Color::Yellow)),
                inner,
            ),
        }
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let form = &self.form;
        let items: Vec<ListItem> = Field::ALL
            .iter()
            .map(|&field| {
                let value = match field {
                    Field::Ticker => form.ticker.clone(),
                    Field::CustomRange => String::from(if form.custom_range { "on" } else { "off (full history)" }),
                    Field::Start => form.start.clone(),
                    Field::End => form.end.clone(),
                    Field::Horizon => form.horizon.to_string(),
                    Field::TestPercentage => form.test_percentage.to_string(),
                };
                let dimmed = matches!(field, Field::Start | Field::End) && !form.custom_range;
                let cursor = if form.editing && field == form.selected { "_" } else { "" };
                let style = if dimmed {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default()
                };
                ListItem::new(format!("{:<15} {value}{cursor}", field.label())).style(style)
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Field::ALL.iter().position(|f| *f == form.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_tables(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let rows = halves[0].height.saturating_sub(2) as usize;
        let prices: Vec<ListItem> = self
            .response
            .as_ref()
            .map(|r| {
                let points = r.series.points();
                points[points.len().saturating_sub(rows)..]
                    .iter()
                    .map(|p| ListItem::new(format!("{} {:>9.2}", p.date, p.price)))
                    .collect()
            })
            .unwrap_or_default();
        frame.render_widget(
            List::new(prices).block(Block::default().title("Prices").borders(Borders::ALL)),
            halves[0],
        );

        let forecast: Vec<ListItem> = self
            .response
            .as_ref()
            .and_then(|r| r.forecast.as_ref())
            .map(|f| {
                f.points
                    .iter()
                    .map(|p| ListItem::new(format!("{} {:>9.2}", p.date, p.prediction)))
                    .collect()
            })
            .unwrap_or_default();
        frame.render_widget(
            List::new(forecast).block(Block::default().title("Forecast").borders(Borders::ALL)),
            halves[1],
        );
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = if self.form.editing {
            "type to edit  Backspace delete  Enter/Esc done"
        } else {
            "↑/↓ select  ←/→ adjust  Enter edit/toggle  g predict  n notes  d debug  q quit"
        };
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        frame.render_widget(Paragraph::new(line).block(Block::default().borders(Borders::ALL)), area);
    }
}

fn draw_notes(frame: &mut ratatui::Frame<'_>, area: Rect) {
    let width = area.width.saturating_sub(8).min(80);
    let height = area.height.saturating_sub(4).min(14);
    let rect = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(Text::from(NOTES))
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Notes (any key to close)").borders(Borders::ALL)),
        rect,
    );
}
