//! GitHub Actions output formatter.
//!
//! Produces workflow commands:
//! ::error file={name},line={line},col={col},title={rule}::{message}

use crate::analyzer::kubepolicy::lint::ScanReport;
use crate::analyzer::kubepolicy::types::{Finding, Severity};

/// Format every finding of a report as an annotation.
pub fn format(report: &ScanReport) -> String {
    report.findings().map(annotation).collect()
}

/// A single annotation line, newline-terminated.
pub fn annotation(finding: &Finding) -> String {
    let level = match finding.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };

    format!(
        "::{} file={},line={},col={},title={}::{}\n",
        level,
        escape_property(&finding.file_path),
        finding.line.max(1),
        finding.column.max(1),
        finding.rule,
        escape_data(&finding.message)
    )
}

/// Escape the message part of a workflow command.
fn escape_data(s: &str) -> String {
    s.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Escape a `key=value` property of a workflow command.
fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}
