pub mod content;
pub mod followers;

use polars::prelude::*;

use crate::helper_functions::{date_series, parse_date};
use crate::models::{AnalyzerError, DATE};

/// Replace the textual `Date` column with a typed date column and sort the
/// table ascending by it. Fails loudly on any value no accepted format
/// parses; rows are never silently dropped.
pub(crate) fn parse_date_column(df: DataFrame) -> Result<DataFrame, AnalyzerError> {
    let raw = df
        .column(DATE)
        .map_err(|_| AnalyzerError::MissingColumn(DATE.to_string()))?;
    let text = raw.cast(&DataType::String)?;
    let dates = text
        .str()?
        .into_iter()
        .map(|value| match value {
            Some(v) => parse_date(v),
            None => Err(AnalyzerError::DateParse {
                value: "<null>".to_string(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut df = df;
    df.with_column(date_series(DATE, &dates)?)?;
    let sorted = df.sort([DATE], SortMultipleOptions::default())?;
    Ok(sorted)
}

pub(crate) fn require_columns(df: &DataFrame, names: &[&str]) -> Result<(), AnalyzerError> {
    for name in names {
        if !df.get_column_names().iter().any(|c| c.as_str() == *name) {
            return Err(AnalyzerError::MissingColumn((*name).to_string()));
        }
    }
    Ok(())
}
