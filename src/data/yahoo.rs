//! Yahoo Finance chart API client (daily adjusted close).
//!
//! `GET {base}/{TICKER}?period1=..&period2=..&interval=1d&events=div,split&includeAdjustedClose=true`
//!
//! Timestamps are exchange-local trading sessions; we shift them by the
//! `meta.gmtoffset` the API reports before taking the calendar date.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::data::source::{restrict_to_range, PriceQuery, PriceSource};
use crate::domain::{DateRange, PricePoint, PriceSeries};
use crate::error::DataError;

const SOURCE_NAME: &str = "Yahoo Finance";
const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; price-forecast)";
/// Earliest date requested when no range is given.
const HISTORY_START: (i32, u32, u32) = (1900, 1, 1);
/// Longest error body echoed back in a message.
const MAX_ERROR_BODY: usize = 200;

pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Result<Self, DataError> {
        let client = Client::builder().user_agent(user_agent).build().map_err(|e| DataError::Request {
            source_name: SOURCE_NAME.to_string(),
            message: format!("could not build HTTP client: {e}"),
        })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build a client from `PF_YAHOO_BASE_URL` / `PF_USER_AGENT` (a `.env` file is honoured).
    pub fn from_env() -> Result<Self, DataError> {
        dotenvy::dotenv().ok();
        let base_url = std::env::var("PF_YAHOO_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let user_agent = std::env::var("PF_USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());
        Self::new(base_url, &user_agent)
    }
}

impl PriceSource for YahooClient {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn fetch(&self, query: &PriceQuery) -> Result<PriceSeries, DataError> {
        let (period1, period2) = request_periods(query.range, Utc::now());
        let url = format!("{}/{}", self.base_url, query.ticker);
        info!(ticker = %query.ticker, period1, period2, "requesting chart data");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "div,split".to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .send()
            .map_err(|e| DataError::Request {
                source_name: SOURCE_NAME.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        let body = resp.text().map_err(|e| DataError::Request {
            source_name: SOURCE_NAME.to_string(),
            message: format!("could not read response body: {e}"),
        })?;

        let series = interpret_response(status, &body)?;
        debug!(ticker = %query.ticker, rows = series.len(), "parsed chart data");
        Ok(restrict_to_range(series, query.range))
    }
}

/// Map an HTTP status and body to a series.
///
/// 404 means an unknown ticker and yields an empty series. Any other
/// non-success status is an error carrying the (truncated) body.
pub fn interpret_response(status: StatusCode, body: &str) -> Result<PriceSeries, DataError> {
    if status == StatusCode::NOT_FOUND {
        info!("ticker not found");
        return Ok(PriceSeries::empty());
    }
    if !status.is_success() {
        return Err(DataError::Status {
            source_name: SOURCE_NAME.to_string(),
            status: status.as_u16(),
            message: truncate(body, MAX_ERROR_BODY),
        });
    }
    parse_chart(body)
}

/// `(period1, period2)` unix seconds for a query.
///
/// A range maps to midnight UTC of its start and (exclusive) end dates.
/// Without one we ask for everything since 1900 up to `now`.
pub fn request_periods(range: Option<DateRange>, now: DateTime<Utc>) -> (i64, i64) {
    let midnight = |d: NaiveDate| d.and_time(NaiveTime::MIN).and_utc().timestamp();
    match range {
        Some(range) => (midnight(range.start), midnight(range.end)),
        None => {
            let (y, m, d) = HISTORY_START;
            let start = NaiveDate::from_ymd_opt(y, m, d).map(midnight).unwrap_or(0);
            (start, now.timestamp())
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Parse a chart API body into an adjusted-close series.
///
/// "Not Found" errors and empty results yield an empty series. Rows without a
/// price are dropped. When the adjusted close is missing entirely we fall back
/// to the raw close.
pub fn parse_chart(body: &str) -> Result<PriceSeries, DataError> {
    let envelope: ChartEnvelope = serde_json::from_str(body).map_err(|e| DataError::Parse {
        source_name: SOURCE_NAME.to_string(),
        message: e.to_string(),
    })?;

    if let Some(err) = envelope.chart.error {
        if err.code.eq_ignore_ascii_case("Not Found") {
            return Ok(PriceSeries::empty());
        }
        return Err(DataError::Request {
            source_name: SOURCE_NAME.to_string(),
            message: format!("{}: {}", err.code, err.description.unwrap_or_default()),
        });
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(PriceSeries::empty());
    };
    if result.timestamp.is_empty() {
        return Ok(PriceSeries::empty());
    }

    let offset = result.meta.map(|m| m.gmtoffset).unwrap_or(0);
    let Indicators { quote, adjclose } = result.indicators;

    let prices = match adjclose.into_iter().next() {
        Some(block) if !block.adjclose.is_empty() => block.adjclose,
        _ => {
            warn!("adjusted close missing from response; falling back to close");
            quote.into_iter().next().map(|q| q.close).ok_or_else(|| DataError::Parse {
                source_name: SOURCE_NAME.to_string(),
                message: "response has timestamps but no price columns".to_string(),
            })?
        }
    };

    let mut points = Vec::with_capacity(result.timestamp.len());
    for (ts, price) in result.timestamp.iter().zip(prices) {
        let Some(price) = price else {
            continue;
        };
        let date = DateTime::from_timestamp(ts + offset, 0)
            .ok_or_else(|| DataError::Parse {
                source_name: SOURCE_NAME.to_string(),
                message: format!("timestamp {ts} out of range"),
            })?
            .date_naive();
        points.push(PricePoint { date, price });
    }
    Ok(PriceSeries::from_points(points))
}

fn truncate(s: &str, max: usize) -> String {
    let trimmed = s.trim();
    match trimmed.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    const CHART_BODY: &str = r#"{
      "chart": {
        "result": [{
          "meta": {"currency": "USD", "symbol": "MSFT", "gmtoffset": -18000},
          "timestamp": [1704205800, 1704292200, 1704378600],
          "indicators": {
            "quote": [{"close": [370.87, 370.6, 367.94]}],
            "adjclose": [{"adjclose": [368.1, null, 365.2]}]
          }
        }],
        "error": null
      }
    }"#;

    #[test]
    fn parses_adjusted_close_and_drops_nulls() {
        let series = parse_chart(CHART_BODY).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].date, d(2024, 1, 2));
        assert_eq!(series.points()[0].price, 368.1);
        assert_eq!(series.points()[1].date, d(2024, 1, 4));
        assert_eq!(series.points()[1].price, 365.2);
    }

    #[test]
    fn gmt_offset_shifts_the_calendar_date() {
        let body = r#"{"chart": {"result": [{
            "meta": {"gmtoffset": -18000},
            "timestamp": [1704153600],
            "indicators": {"quote": [{"close": [1.0]}], "adjclose": [{"adjclose": [1.5]}]}
        }], "error": null}}"#;
        let series = parse_chart(body).unwrap();
        assert_eq!(series.points()[0].date, d(2024, 1, 1));
    }

    #[test]
    fn falls_back_to_close_without_adjclose() {
        let body = r#"{"chart": {"result": [{
            "meta": {"gmtoffset": 0},
            "timestamp": [1704205800, 1704292200],
            "indicators": {"quote": [{"close": [10.0, 11.0]}]}
        }], "error": null}}"#;
        assert_eq!(parse_chart(body).unwrap().values(), vec![10.0, 11.0]);
    }

    #[test]
    fn not_found_and_empty_results_are_empty_series() {
        let not_found = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        assert!(parse_chart(not_found).unwrap().is_empty());

        let no_rows = r#"{"chart": {"result": [{"meta": {"gmtoffset": 0}, "indicators": {"quote": [{}]}}], "error": null}}"#;
        assert!(parse_chart(no_rows).unwrap().is_empty());
    }

    #[test]
    fn other_errors_and_garbage_are_reported() {
        let bad_request = r#"{"chart": {"result": null, "error": {"code": "Bad Request", "description": "Invalid input"}}}"#;
        assert!(matches!(parse_chart(bad_request), Err(DataError::Request { .. })));
        assert!(matches!(parse_chart("<html>"), Err(DataError::Parse { .. })));
    }

    #[test]
    fn periods_follow_the_range_or_full_history() {
        let range = DateRange::new(d(2024, 1, 1), d(2024, 2, 1)).unwrap();
        let now = DateTime::from_timestamp(1_750_000_000, 0).unwrap();
        assert_eq!(request_periods(Some(range), now), (1_704_067_200, 1_706_745_600));

        let (start, end) = request_periods(None, now);
        assert_eq!(start, -2_208_988_800);
        assert_eq!(end, 1_750_000_000);
    }

    #[test]
    fn not_found_status_is_an_empty_series() {
        let series = interpret_response(StatusCode::NOT_FOUND, "<html>404</html>").unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn server_errors_carry_a_truncated_body() {
        let body = "x".repeat(MAX_ERROR_BODY + 50);
        match interpret_response(StatusCode::INTERNAL_SERVER_ERROR, &body) {
            Err(DataError::Status { status, message, .. }) => {
                assert_eq!(status, 500);
                assert_eq!(message, format!("{}...", "x".repeat(MAX_ERROR_BODY)));
            }
            other => panic!("expected a status error, got {other:?}"),
        }
    }

    #[test]
    fn success_status_parses_the_body() {
        let series = interpret_response(StatusCode::OK, CHART_BODY).unwrap();
        assert_eq!(series.values(), vec![368.1, 365.2]);
    }

    #[test]
    fn truncate_long_bodies() {
        assert_eq!(truncate("  short ", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
