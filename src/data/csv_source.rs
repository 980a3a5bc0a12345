//! Offline price source: a CSV export with `Date` and `Adj Close` columns.
//!
//! This is the layout of a Yahoo "Download" export; a `Close` column is used
//! when no adjusted close is present. The file holds one ticker, so the query
//! ticker is only used in messages.

use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{debug, warn};

use crate::data::source::{restrict_to_range, PriceQuery, PriceSource};
use crate::domain::{PricePoint, PriceSeries};
use crate::error::DataError;

const DATE_COLUMN: &str = "date";
/// Price columns in order of preference (normalized names).
const PRICE_COLUMNS: [&str; 2] = ["adj_close", "close"];

#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    path: PathBuf,
    name: String,
}

impl CsvPriceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("CSV file '{}'", path.display());
        Self { path, name }
    }
}

impl PriceSource for CsvPriceSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, query: &PriceQuery) -> Result<PriceSeries, DataError> {
        let file = File::open(&self.path)
            .map_err(|e| DataError::Io(format!("Failed to open CSV '{}': {e}", self.path.display())))?;
        let series = read_prices(file, &self.name)?;
        debug!(ticker = %query.ticker, rows = series.len(), "loaded prices from CSV");
        Ok(restrict_to_range(series, query.range))
    }
}

/// Read `Date` + price columns from any reader.
///
/// Rows with a missing or non-numeric price (Yahoo writes `null` for those) are
/// skipped; an unparsable date is an error.
pub fn read_prices<R: std::io::Read>(reader: R, source_name: &str) -> Result<PriceSeries, DataError> {
    let parse_err = |message: String| DataError::Parse {
        source_name: source_name.to_string(),
        message,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| parse_err(format!("failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let date_idx = *header_map
        .get(DATE_COLUMN)
        .ok_or_else(|| parse_err("missing required column `Date`".to_string()))?;
    let price_idx = PRICE_COLUMNS
        .iter()
        .find_map(|name| header_map.get(*name).copied())
        .ok_or_else(|| parse_err("missing price column (`Adj Close` or `Close`)".to_string()))?;

    let mut points = Vec::new();
    let mut skipped = 0usize;
    for (idx, result) in reader.records().enumerate() {
        // Line numbers are 1-based and the header is line 1.
        let line = idx + 2;
        let record = result.map_err(|e| parse_err(format!("line {line}: {e}")))?;

        let Some(raw_date) = field(&record, date_idx) else {
            skipped += 1;
            continue;
        };
        let date = parse_date(raw_date).map_err(|e| parse_err(format!("line {line}: {e}")))?;

        match field(&record, price_idx).and_then(|s| s.parse::<f64>().ok()) {
            Some(price) if price.is_finite() => points.push(PricePoint { date, price }),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(skipped, source = source_name, "skipped rows without a usable price");
    }
    Ok(PriceSeries::from_points(points))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

/// `"Adj Close"`, `"adj_close"` and `"AdjClose"` all map to `adj_close`.
fn normalize_header_name(name: &str) -> String {
    let name = name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase();
    let name = name.replace([' ', '-'], "_");
    if name == "adjclose" { "adj_close".to_string() } else { name }
}

fn field(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // Exports with a time component ("2024-01-02 00:00:00-05:00") keep the date part.
    let date_part = s.get(..10).unwrap_or(s);
    const FMTS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(date_part, fmt) {
            return Ok(d);
        }
    }
    Err(format!("invalid date '{s}' (expected YYYY-MM-DD)"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::domain::DateRange;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    const EXPORT: &str = "\
Date,Open,High,Low,Close,Adj Close,Volume
2024-01-03,1,1,1,10.5,10.0,100
2024-01-02,1,1,1,9.5,9.0,100
2024-01-04,1,1,1,null,null,0
2024-01-05,1,1,1,11.5,11.0,100
";

    #[test]
    fn reads_adjusted_close_sorted_and_skips_nulls() {
        let series = read_prices(EXPORT.as_bytes(), "test").unwrap();
        let dates: Vec<NaiveDate> = series.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 5)]);
        assert_eq!(series.values(), vec![9.0, 10.0, 11.0]);
    }

    #[test]
    fn falls_back_to_close_column() {
        let csv = "\u{feff}date,close\n2024-01-02 00:00:00-05:00,5.0\n2024-01-03,6.0\n";
        let series = read_prices(csv.as_bytes(), "test").unwrap();
        assert_eq!(series.values(), vec![5.0, 6.0]);
        assert_eq!(series.first().unwrap().date, d(2024, 1, 2));
    }

    #[test]
    fn schema_and_date_errors_are_reported() {
        assert!(matches!(read_prices("Day,Close\n".as_bytes(), "t"), Err(DataError::Parse { .. })));
        assert!(matches!(read_prices("Date,Volume\n".as_bytes(), "t"), Err(DataError::Parse { .. })));
        let err = read_prices("Date,Close\n02.01.2024,5\n".as_bytes(), "t").unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn file_source_applies_range() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EXPORT.as_bytes()).unwrap();

        let source = CsvPriceSource::new(file.path());
        let query = PriceQuery {
            ticker: "TEST".to_string(),
            range: Some(DateRange::new(d(2024, 1, 3), d(2024, 1, 5)).unwrap()),
        };
        assert_eq!(source.fetch(&query).unwrap().values(), vec![10.0]);

        let missing = CsvPriceSource::new("/nonexistent/prices.csv");
        assert!(matches!(missing.fetch(&query), Err(DataError::Io(_))));
    }
}
