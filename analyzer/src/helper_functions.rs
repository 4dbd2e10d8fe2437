use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use crate::models::{AnalyzerError, DATE};

/// Accepted date-text formats, tried in order. US month-first ordering is
/// listed before day-first because that is what the source exports use.
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%b %d, %Y", "%d %b %Y"];

/// Days between 0001-01-01 (chrono's CE origin) and the Unix epoch, which
/// is the origin of polars' `Date` physical representation.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub fn read_csv(file_path: &str) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(PathBuf::from(file_path)))?
        .finish()
}

/// Parse one date value against the accepted format list, first match wins.
pub fn parse_date(text: &str) -> Result<NaiveDate, AnalyzerError> {
    let trimmed = text.trim();
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(date);
        }
    }
    Err(AnalyzerError::DateParse {
        value: text.to_string(),
    })
}

pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub fn days_to_date(days: i32) -> NaiveDate {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE).unwrap()
}

/// Build a polars `Date` series from calendar dates.
pub fn date_series(name: &str, dates: &[NaiveDate]) -> PolarsResult<Series> {
    let days: Vec<i32> = dates.iter().copied().map(date_to_days).collect();
    Series::new(PlSmallStr::from(name), days).cast(&DataType::Date)
}

/// Extract the `Date` column as calendar dates. Null cells are rejected
/// rather than coerced.
pub fn column_dates(df: &DataFrame) -> Result<Vec<NaiveDate>, AnalyzerError> {
    let col = df
        .column(DATE)
        .map_err(|_| AnalyzerError::MissingColumn(DATE.to_string()))?;
    let days = col.cast(&DataType::Int32)?;
    let chunked = days.i32()?;
    if chunked.null_count() > 0 {
        return Err(AnalyzerError::NullValues(DATE.to_string()));
    }
    Ok(chunked.into_no_null_iter().map(days_to_date).collect())
}

/// Extract a numeric column as `f64`, failing with `MissingColumn` rather
/// than a generic schema error when it is absent. Null cells are rejected
/// rather than coerced.
pub fn column_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>, AnalyzerError> {
    let col = df
        .column(name)
        .map_err(|_| AnalyzerError::MissingColumn(name.to_string()))?;
    let floats = col.cast(&DataType::Float64)?;
    let chunked = floats.f64()?;
    if chunked.null_count() > 0 {
        return Err(AnalyzerError::NullValues(name.to_string()));
    }
    Ok(chunked.into_no_null_iter().collect())
}

pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Every calendar month key between two dates, inclusive. Monthly tables
/// cover the whole span, not just the months that contain rows.
pub fn month_span(first: NaiveDate, last: NaiveDate) -> Vec<String> {
    let mut keys = Vec::new();
    let (mut year, mut month) = (first.year(), first.month());
    let (end_year, end_month) = (last.year(), last.month());
    while (year, month) <= (end_year, end_month) {
        keys.push(format!("{year:04}-{month:02}"));
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }
    keys
}

pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub fn weekday_index(date: NaiveDate) -> usize {
    date.weekday().num_days_from_monday() as usize
}

/// Trailing mean with a shrinking window at the start: the first value is
/// itself, the second the mean of two, and so on until the window fills.
pub fn trailing_mean_shrinking(values: &[f64], window: usize) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Trailing mean requiring a full window: an input of N values yields
/// max(0, N - window + 1) means, nothing for the warm-up days.
pub fn trailing_mean_strict(values: &[f64], window: usize) -> Vec<f64> {
    if values.len() < window || window == 0 {
        return Vec::new();
    }
    (window - 1..values.len())
        .map(|i| values[i + 1 - window..=i].iter().sum::<f64>() / window as f64)
        .collect()
}

/// Pearson's correlation over paired samples. `None` when the inputs are
/// empty, mismatched, or one side has zero variance.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.is_empty() {
        return None;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denom_x = 0.0;
    let mut denom_y = 0.0;

    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        numerator += dx * dy;
        denom_x += dx * dx;
        denom_y += dy * dy;
    }

    let denominator = denom_x.sqrt() * denom_y.sqrt();
    if denominator == 0.0 {
        return None;
    }

    Some(numerator / denominator)
}

pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
