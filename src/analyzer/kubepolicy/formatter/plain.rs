//! Plain text formatter.

use colored::Colorize;

use crate::analyzer::kubepolicy::lint::ScanReport;
use crate::analyzer::kubepolicy::types::Severity;

/// Format a report for a terminal.
pub fn format(report: &ScanReport, threshold: Severity) -> String {
    let mut output = String::new();

    for finding in report.findings() {
        let level = match finding.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };

        output.push_str(&format!(
            "{}:{}:{}: {} [{}] {}\n",
            finding.file_path.bold(),
            finding.line,
            finding.column,
            level,
            finding.rule.to_string().cyan(),
            finding.message,
        ));

        if let Some(ref patch) = finding.patch {
            output.push_str(&format!("  {} ({}):\n", "suggested patch".green(), patch.describe()));
            for line in patch.render().lines() {
                output.push_str(&format!("    {}\n", line));
            }
        }
    }

    for failure in &report.read_errors {
        output.push_str(&format!(
            "{}: {} {}\n",
            failure.file_path.bold(),
            "unreadable".red(),
            failure.message
        ));
    }

    let summary = format!(
        "Scanned {} file(s). Found {} error(s) and {} warning(s).",
        report.files_scanned(),
        report.error_count(),
        report.warning_count()
    );
    if report.has_blocking(threshold) {
        output.push_str(&format!("\n{} (threshold: {})\n", summary.red(), threshold));
    } else {
        output.push_str(&format!("\n{} (threshold: {})\n", summary.green(), threshold));
    }

    output
}
