//! Input panel state and key handling, kept free of terminal I/O.

use chrono::{Duration, NaiveDate};
use crossterm::event::KeyCode;

use crate::domain::{
    ForecastRequest, DEFAULT_HORIZON, DEFAULT_TEST_PERCENTAGE, MAX_HORIZON, MAX_TEST_PERCENTAGE, MIN_HORIZON,
    MIN_TEST_PERCENTAGE,
};

const DATE_FMT: &str = "%Y-%m-%d";
const DATE_FMT_LEN: usize = 10;
const MAX_TICKER_LEN: usize = 16;
/// Step for PageUp/PageDown on the sliders.
const PAGE_STEP: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Ticker,
    CustomRange,
    Start,
    End,
    Horizon,
    TestPercentage,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Ticker,
        Field::CustomRange,
        Field::Start,
        Field::End,
        Field::Horizon,
        Field::TestPercentage,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Ticker => "Ticker",
            Field::CustomRange => "Custom range",
            Field::Start => "Start",
            Field::End => "End (excl.)",
            Field::Horizon => "Horizon (days)",
            Field::TestPercentage => "Test %",
        }
    }

    fn is_text(self) -> bool {
        matches!(self, Field::Ticker | Field::Start | Field::End)
    }

    fn index(self) -> usize {
        Field::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }
}

/// What the app should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    None,
    Run,
    ToggleNotes,
    DebugBundle,
    Quit,
}

#[derive(Debug, Clone)]
pub struct FormState {
    pub ticker: String,
    pub custom_range: bool,
    pub start: String,
    pub end: String,
    pub horizon: usize,
    pub test_percentage: u32,
    pub selected: Field,
    pub editing: bool,
}

impl FormState {
    /// Defaults: no ticker, full history, a one-year custom range ready to toggle on.
    pub fn new(today: NaiveDate) -> Self {
        let year_ago = today.checked_sub_signed(Duration::days(365)).unwrap_or(today);
        Self {
            ticker: String::new(),
            custom_range: false,
            start: year_ago.format(DATE_FMT).to_string(),
            end: today.format(DATE_FMT).to_string(),
            horizon: DEFAULT_HORIZON,
            test_percentage: DEFAULT_TEST_PERCENTAGE,
            selected: Field::Ticker,
            editing: false,
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> FormAction {
        if self.editing {
            self.handle_edit(code);
            return FormAction::None;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return FormAction::Quit,
            KeyCode::Char('g') => return FormAction::Run,
            KeyCode::Char('n') => return FormAction::ToggleNotes,
            KeyCode::Char('d') => return FormAction::DebugBundle,
            KeyCode::Up => self.select(-1),
            KeyCode::Down | KeyCode::Tab => self.select(1),
            KeyCode::Left => self.adjust(-1),
            KeyCode::Right => self.adjust(1),
            KeyCode::PageDown => self.adjust(-PAGE_STEP),
            KeyCode::PageUp => self.adjust(PAGE_STEP),
            KeyCode::Char(' ') if self.selected == Field::CustomRange => self.custom_range = !self.custom_range,
            KeyCode::Enter => {
                if self.selected.is_text() {
                    self.editing = true;
                } else if self.selected == Field::CustomRange {
                    self.custom_range = !self.custom_range;
                }
            }
            _ => {}
        }
        FormAction::None
    }

    fn handle_edit(&mut self, code: KeyCode) {
        let field = self.selected;
        let Some(text) = self.text_mut(field) else {
            self.editing = false;
            return;
        };
        match code {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Tab => self.editing = false,
            KeyCode::Backspace => {
                text.pop();
            }
            KeyCode::Char(c) => {
                let accept = match field {
                    Field::Ticker => {
                        text.chars().count() < MAX_TICKER_LEN && (c.is_ascii_alphanumeric() || ".-^=".contains(c))
                    }
                    _ => text.len() < DATE_FMT_LEN && (c.is_ascii_digit() || c == '-'),
                };
                if accept {
                    text.push(if field == Field::Ticker { c.to_ascii_uppercase() } else { c });
                }
            }
            _ => {}
        }
    }

    fn text_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Ticker => Some(&mut self.ticker),
            Field::Start => Some(&mut self.start),
            Field::End => Some(&mut self.end),
            _ => None,
        }
    }

    fn select(&mut self, delta: isize) {
        let n = Field::ALL.len() as isize;
        let idx = (self.selected.index() as isize + delta).clamp(0, n - 1);
        self.selected = Field::ALL[idx as usize];
    }

    fn adjust(&mut self, delta: i64) {
        match self.selected {
            Field::CustomRange => self.custom_range = !self.custom_range,
            Field::Horizon => {
                self.horizon = step(self.horizon as i64, delta, MIN_HORIZON as i64, MAX_HORIZON as i64) as usize;
            }
            Field::TestPercentage => {
                self.test_percentage = step(
                    self.test_percentage as i64,
                    delta,
                    MIN_TEST_PERCENTAGE as i64,
                    MAX_TEST_PERCENTAGE as i64,
                ) as u32;
            }
            _ => {}
        }
    }

    /// Build the pipeline request; a malformed date is reported here.
    pub fn to_request(&self, today: NaiveDate) -> Result<ForecastRequest, String> {
        let date_range = if self.custom_range {
            Some((parse_date("start", &self.start)?, parse_date("end", &self.end)?))
        } else {
            None
        };
        Ok(ForecastRequest {
            ticker: self.ticker.clone(),
            date_range,
            horizon: self.horizon,
            test_percentage: self.test_percentage,
            today,
        })
    }
}

fn step(value: i64, delta: i64, min: i64, max: i64) -> i64 {
    (value + delta).clamp(min, max)
}

fn parse_date(label: &str, s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), DATE_FMT).map_err(|e| format!("Invalid {label} date '{}': {e}", s.trim()))
}
