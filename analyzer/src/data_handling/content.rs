use polars::prelude::*;
use tracing::{debug, info};

use super::{parse_date_column, require_columns};
use crate::helper_functions::read_csv;
use crate::models::{
    AnalyzerError, Dataset, CLICKS_TOTAL, COMMENTS_TOTAL, REACTIONS_TOTAL, REPOSTS_TOTAL,
    TOTAL_ENGAGEMENT,
};

/// The cleaned daily content export: one row per calendar day with
/// impression, interaction, and engagement-rate columns.
pub struct ContentDataset {
    pub path: String,
}

/// Derive `Total Engagement` as the sum of the four total interaction
/// counts when the export does not already carry it.
fn derive_total_engagement(df: DataFrame) -> Result<DataFrame, AnalyzerError> {
    if df
        .get_column_names()
        .iter()
        .any(|c| c.as_str() == TOTAL_ENGAGEMENT)
    {
        return Ok(df);
    }
    require_columns(
        &df,
        &[CLICKS_TOTAL, REACTIONS_TOTAL, COMMENTS_TOTAL, REPOSTS_TOTAL],
    )?;

    let derived = df
        .lazy()
        .with_column(
            (col(CLICKS_TOTAL) + col(REACTIONS_TOTAL) + col(COMMENTS_TOTAL) + col(REPOSTS_TOTAL))
                .alias(TOTAL_ENGAGEMENT),
        )
        .collect()?;
    Ok(derived)
}

impl Dataset for ContentDataset {
    fn load(&self) -> Result<DataFrame, AnalyzerError> {
        info!("Reading content export from: {}", &self.path);
        let df = read_csv(&self.path)?;
        debug!("Loaded {} rows", df.shape().0);

        let df = parse_date_column(df)?;
        let df = derive_total_engagement(df)?;
        debug!(
            "After preparation, shape: {} rows, {} cols",
            df.shape().0,
            df.shape().1
        );
        Ok(df)
    }
}
