use std::collections::HashSet;

use polars::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::helper_functions::{parse_date, read_csv};
use crate::models::{
    AnalysisOptions, CLICKS_TOTAL, COMMENTS_TOTAL, DATE, ENGAGEMENT_RATE_TOTAL,
    FOLLOWERS_AUTO_INVITED, FOLLOWERS_ORGANIC, FOLLOWERS_SPONSORED, FOLLOWERS_TOTAL,
    IMPRESSIONS_ORGANIC,
    IMPRESSIONS_SPONSORED, IMPRESSIONS_TOTAL, REACTIONS_TOTAL, REPOSTS_TOTAL,
    UNIQUE_IMPRESSIONS,
};

const REQUIRED_CONTENT_COLUMNS: &[&str] = &[
    DATE,
    IMPRESSIONS_ORGANIC,
    IMPRESSIONS_SPONSORED,
    IMPRESSIONS_TOTAL,
    UNIQUE_IMPRESSIONS,
    CLICKS_TOTAL,
    REACTIONS_TOTAL,
    COMMENTS_TOTAL,
    REPOSTS_TOTAL,
    ENGAGEMENT_RATE_TOTAL,
];

const REQUIRED_FOLLOWER_COLUMNS: &[&str] =
    &[DATE, FOLLOWERS_SPONSORED, FOLLOWERS_ORGANIC, FOLLOWERS_TOTAL];

const CONTENT_COUNT_COLUMNS: &[&str] = &[
    IMPRESSIONS_TOTAL,
    CLICKS_TOTAL,
    REACTIONS_TOTAL,
    COMMENTS_TOTAL,
    REPOSTS_TOTAL,
];

/// Outcome of the pre-analysis data-quality checks. Errors fail the run;
/// warnings (duplicate dates, gaps, negative corrections, out-of-range
/// rates) are logged and the pipeline proceeds.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub rows: usize,
    pub columns: usize,
}

impl ValidationReport {
    fn new() -> Self {
        Self {
            passed: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            rows: 0,
            columns: 0,
        }
    }

    fn error(&mut self, message: String) {
        self.passed = false;
        self.errors.push(message);
    }
}

pub fn validate_content(path: &str, options: &AnalysisOptions) -> ValidationReport {
    let mut report = ValidationReport::new();
    let Some(df) = load_into(path, &mut report) else {
        return report;
    };

    check_columns(&df, REQUIRED_CONTENT_COLUMNS, &mut report);
    check_nulls(&df, &mut report);
    check_dates(&df, &mut report);
    check_negative_counts(&df, CONTENT_COUNT_COLUMNS, &mut report);
    check_rate_range(&df, options, &mut report);
    report
}

pub fn validate_followers(path: &str) -> ValidationReport {
    let mut report = ValidationReport::new();
    let Some(df) = load_into(path, &mut report) else {
        return report;
    };

    check_columns(&df, REQUIRED_FOLLOWER_COLUMNS, &mut report);
    check_nulls(&df, &mut report);
    check_dates(&df, &mut report);
    // Auto-invited deltas are optional in the export; the check skips
    // columns that are not present.
    check_negative_counts(
        &df,
        &[FOLLOWERS_TOTAL, FOLLOWERS_ORGANIC, FOLLOWERS_AUTO_INVITED],
        &mut report,
    );
    report
}

fn load_into(path: &str, report: &mut ValidationReport) -> Option<DataFrame> {
    match read_csv(path) {
        Ok(df) => {
            report.rows = df.shape().0;
            report.columns = df.shape().1;
            Some(df)
        }
        Err(e) => {
            report.error(format!("cannot read CSV `{path}`: {e}"));
            None
        }
    }
}

fn check_columns(df: &DataFrame, required: &[&str], report: &mut ValidationReport) {
    let present: Vec<&str> = df.get_column_names().iter().map(|c| c.as_str()).collect();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !present.contains(name))
        .collect();
    if !missing.is_empty() {
        report.error(format!("missing columns: {missing:?}"));
    }
}

fn check_nulls(df: &DataFrame, report: &mut ValidationReport) {
    let mut with_nulls = Vec::new();
    for column in df.get_columns() {
        let nulls = column.null_count();
        if nulls > 0 {
            with_nulls.push(format!("{} ({nulls})", column.name()));
        }
    }
    if !with_nulls.is_empty() {
        report.error(format!("null values found: {}", with_nulls.join(", ")));
    }
}

fn check_dates(df: &DataFrame, report: &mut ValidationReport) {
    let Ok(raw) = df.column(DATE) else {
        return; // already reported by the column check
    };
    let Ok(text) = raw.cast(&DataType::String) else {
        report.error(format!("column `{DATE}` is not text"));
        return;
    };
    let Ok(values) = text.str() else {
        report.error(format!("column `{DATE}` is not text"));
        return;
    };

    let mut dates = Vec::new();
    for value in values.into_iter().flatten() {
        match parse_date(value) {
            Ok(date) => dates.push(date),
            Err(_) => report.error(format!("unparseable date: `{value}`")),
        }
    }
    if dates.is_empty() {
        return;
    }

    let unique: HashSet<_> = dates.iter().copied().collect();
    let duplicates = dates.len() - unique.len();
    if duplicates > 0 {
        report.warnings.push(format!("duplicate dates found: {duplicates}"));
    }

    let min = *dates.iter().min().unwrap();
    let max = *dates.iter().max().unwrap();
    let span = (max - min).num_days() as usize + 1;
    if span > unique.len() {
        report
            .warnings
            .push(format!("missing dates in range: {}", span - unique.len()));
    }
}

fn check_negative_counts(df: &DataFrame, columns: &[&str], report: &mut ValidationReport) {
    let mut negatives = Vec::new();
    for name in columns {
        let Ok(column) = df.column(name) else { continue };
        let Ok(values) = column.cast(&DataType::Float64) else {
            continue;
        };
        let Ok(floats) = values.f64() else { continue };
        let count = floats.into_no_null_iter().filter(|v| *v < 0.0).count();
        if count > 0 {
            negatives.push(format!("{name} ({count})"));
        }
    }
    if !negatives.is_empty() {
        report.warnings.push(format!(
            "negative values detected (source-side corrections): {}",
            negatives.join(", ")
        ));
    }
}

fn check_rate_range(df: &DataFrame, options: &AnalysisOptions, report: &mut ValidationReport) {
    let Ok(column) = df.column(ENGAGEMENT_RATE_TOTAL) else {
        return;
    };
    let Ok(values) = column.cast(&DataType::Float64) else {
        return;
    };
    let Ok(floats) = values.f64() else { return };
    let out_of_range = floats
        .into_no_null_iter()
        .filter(|v| *v < options.rate_min || *v > options.rate_max)
        .count();
    if out_of_range > 0 {
        report.warnings.push(format!(
            "engagement rates outside [{}, {}]: {out_of_range} rows",
            options.rate_min, options.rate_max
        ));
    }
}

pub fn log_report(label: &str, report: &ValidationReport) {
    for message in &report.errors {
        error!("{label}: {message}");
    }
    for message in &report.warnings {
        warn!("{label}: {message}");
    }
    if report.passed {
        info!(
            "{label}: validation passed ({} rows, {} columns, {} warnings)",
            report.rows,
            report.columns,
            report.warnings.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const CONTENT_HEADER: &str = "Date,Impressions (organic),Impressions (sponsored),\
Impressions (total),Unique impressions (organic),Clicks (total),Reactions (total),\
Comments (total),Reposts (total),Engagement rate (total)";

    #[test]
    fn clean_content_table_passes() {
        let file = write_csv(&format!(
            "{CONTENT_HEADER}\n2024-01-01,90,10,100,80,2,3,1,0,0.06\n2024-01-02,90,10,100,80,2,3,1,0,0.06\n"
        ));
        let report = validate_content(
            &file.path().to_string_lossy(),
            &AnalysisOptions::default(),
        );
        assert!(report.passed, "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
        assert_eq!(report.rows, 2);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let file = write_csv("Date,Impressions (total)\n2024-01-01,100\n");
        let report = validate_content(
            &file.path().to_string_lossy(),
            &AnalysisOptions::default(),
        );
        assert!(!report.passed);
        assert!(report.errors[0].contains("missing columns"));
    }

    #[test]
    fn out_of_range_rate_is_a_warning_not_an_error() {
        let file = write_csv(&format!(
            "{CONTENT_HEADER}\n2024-01-01,90,10,100,80,2,3,1,0,1.5\n"
        ));
        let report = validate_content(
            &file.path().to_string_lossy(),
            &AnalysisOptions::default(),
        );
        assert!(report.passed);
        assert!(report.warnings.iter().any(|w| w.contains("engagement rates")));
    }

    #[test]
    fn duplicate_and_gapped_dates_warn() {
        let file = write_csv(&format!(
            "{CONTENT_HEADER}\n\
             2024-01-01,90,10,100,80,2,3,1,0,0.06\n\
             2024-01-01,90,10,100,80,2,3,1,0,0.06\n\
             2024-01-05,90,10,100,80,2,3,1,0,0.06\n"
        ));
        let report = validate_content(
            &file.path().to_string_lossy(),
            &AnalysisOptions::default(),
        );
        assert!(report.passed);
        assert!(report.warnings.iter().any(|w| w.contains("duplicate dates")));
        assert!(report.warnings.iter().any(|w| w.contains("missing dates")));
    }
}
