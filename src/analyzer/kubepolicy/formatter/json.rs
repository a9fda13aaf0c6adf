//! JSON summary formatter.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analyzer::kubepolicy::lint::ScanReport;
use crate::analyzer::kubepolicy::types::{Finding, Severity};
use crate::error::{KubePolicyError, Result};

/// The machine-readable run summary.
#[derive(Debug, Serialize)]
pub struct JsonSummary<'a> {
    pub generated_at: DateTime<Utc>,
    pub files_scanned: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub severity_threshold: Severity,
    pub blocking: bool,
    /// Messages per file, keyed by path in sorted order.
    pub per_file: BTreeMap<&'a str, FileMessages<'a>>,
    pub findings: Vec<&'a Finding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub read_errors: Vec<JsonReadError<'a>>,
}

#[derive(Debug, Default, Serialize)]
pub struct FileMessages<'a> {
    pub errors: Vec<&'a str>,
    pub warnings: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct JsonReadError<'a> {
    pub file_path: &'a str,
    pub message: &'a str,
}

impl<'a> JsonSummary<'a> {
    pub fn new(report: &'a ScanReport, threshold: Severity) -> Self {
        let mut per_file: BTreeMap<&str, FileMessages> = BTreeMap::new();
        for file in &report.files {
            let messages = per_file.entry(file.file_path.as_str()).or_default();
            for finding in &file.findings {
                match finding.severity {
                    Severity::Error => messages.errors.push(&finding.message),
                    Severity::Warning => messages.warnings.push(&finding.message),
                }
            }
        }

        Self {
            generated_at: Utc::now(),
            files_scanned: report.files_scanned(),
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            severity_threshold: threshold,
            blocking: report.has_blocking(threshold),
            per_file,
            findings: report.findings().collect(),
            read_errors: report
                .read_errors
                .iter()
                .map(|e| JsonReadError {
                    file_path: &e.file_path,
                    message: &e.message,
                })
                .collect(),
        }
    }
}

/// Format a report as pretty-printed JSON.
pub fn format(report: &ScanReport, threshold: Severity) -> String {
    let summary = JsonSummary::new(report, threshold);
    serde_json::to_string_pretty(&summary).unwrap_or_else(|_| "{}".to_string())
}

/// Write the JSON summary to a file.
pub fn write_summary(path: &Path, report: &ScanReport, threshold: Severity) -> Result<()> {
    let summary = JsonSummary::new(report, threshold);
    let content = serde_json::to_string_pretty(&summary)?;
    std::fs::write(path, content + "\n").map_err(|source| KubePolicyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Wrote JSON summary to {}", path.display());
    Ok(())
}
