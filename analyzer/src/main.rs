use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::data_handling::content::ContentDataset;
use crate::data_handling::followers::FollowerDataset;
use crate::models::{AnalysisOptions, Dataset};
use crate::report::{build_report, print_summary, save_report, ReportSources};

mod analysis;
mod data_handling;
mod helper_functions;
mod models;
mod report;
mod validation;

#[derive(Debug, Parser)]
#[command(name = "analyzer")]
#[command(about = "Engagement, reach and growth metrics for social page exports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full metrics pipeline and write a JSON report
    Analyze {
        /// Cleaned content export CSV
        content: String,
        /// Cleaned follower export CSV; enables the growth and correlation sections
        #[arg(long)]
        followers: Option<String>,
        /// Report output path
        #[arg(long, default_value = "analysis_report.json")]
        output: String,
        /// Spike threshold as a multiple of the trailing 7-day impression mean
        #[arg(long, default_value_t = 1.5)]
        spike_factor: f64,
        /// Skip the pre-analysis data-quality checks
        #[arg(long)]
        skip_validation: bool,
    },
    /// Run the data-quality checks only
    Validate {
        /// Cleaned content export CSV
        content: String,
        /// Cleaned follower export CSV
        #[arg(long)]
        followers: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            content,
            followers,
            output,
            spike_factor,
            skip_validation,
        } => analyze(content, followers, output, spike_factor, skip_validation),
        Commands::Validate { content, followers } => validate(content, followers),
    }
}

fn analyze(
    content: String,
    followers: Option<String>,
    output: String,
    spike_factor: f64,
    skip_validation: bool,
) -> anyhow::Result<()> {
    let options = AnalysisOptions {
        spike_factor,
        ..Default::default()
    };

    if !skip_validation && !run_validation(&content, followers.as_deref(), &options) {
        bail!("input failed validation; rerun with --skip-validation to override");
    }

    info!("Starting the metrics pipeline");
    let content_df = ContentDataset {
        path: content.clone(),
    }
    .load()?;
    let follower_df = followers
        .as_ref()
        .map(|path| FollowerDataset { path: path.clone() }.load())
        .transpose()?;

    let sources = ReportSources {
        content_path: content,
        follower_path: followers,
    };
    let report = build_report(&content_df, follower_df.as_ref(), &sources, &options)?;
    save_report(&report, &output)?;
    info!("Report saved to: {}", output);

    print_summary(&report);
    Ok(())
}

fn validate(content: String, followers: Option<String>) -> anyhow::Result<()> {
    if run_validation(&content, followers.as_deref(), &AnalysisOptions::default()) {
        Ok(())
    } else {
        bail!("validation failed")
    }
}

fn run_validation(content: &str, followers: Option<&str>, options: &AnalysisOptions) -> bool {
    let content_report = validation::validate_content(content, options);
    validation::log_report("content", &content_report);
    let mut passed = content_report.passed;

    if let Some(path) = followers {
        let follower_report = validation::validate_followers(path);
        validation::log_report("followers", &follower_report);
        passed &= follower_report.passed;
    }
    passed
}
