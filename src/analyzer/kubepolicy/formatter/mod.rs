//! Output formatters for scan reports.
//!
//! The evaluation core knows nothing about these formats; each formatter
//! renders a [`ScanReport`] for one consumer.

pub mod comment;
pub mod github;
pub mod json;
pub mod plain;

use crate::analyzer::kubepolicy::lint::ScanReport;
use crate::analyzer::kubepolicy::types::Severity;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// GitHub Actions workflow annotations.
    #[default]
    Github,
    /// Coloured terminal output.
    Plain,
    /// JSON summary.
    Json,
}

/// Format a scan report to a string.
pub fn format_report(report: &ScanReport, format: OutputFormat, threshold: Severity) -> String {
    match format {
        OutputFormat::Github => github::format(report),
        OutputFormat::Plain => plain::format(report, threshold),
        OutputFormat::Json => json::format(report, threshold),
    }
}
