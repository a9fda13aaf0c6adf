//! Main evaluation orchestration for kubepolicy.
//!
//! Ties together parsing, recognition, rules and patch suggestion, and
//! runs batches of files on a bounded worker pool.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::analyzer::kubepolicy::parser::{ParseError, Position, parse};
use crate::analyzer::kubepolicy::patch;
use crate::analyzer::kubepolicy::recognize::{PodScope, recognize};
use crate::analyzer::kubepolicy::rules::{Rule, RuleError, RuleScope, Violation, all_rules};
use crate::analyzer::kubepolicy::types::{Finding, Patch, RuleId, Severity};
use crate::error::{KubePolicyError, Result};

/// Options shared by every file of a run.
#[derive(Debug, Clone, Default)]
pub struct EvaluationOptions {
    /// Rules that are never run.
    pub disabled_rules: Vec<RuleId>,
    /// Worker threads for batch evaluation; `None` means one per CPU.
    pub jobs: Option<usize>,
    /// Directory relative paths are read from. Findings keep the path as given.
    pub base_dir: Option<PathBuf>,
}

impl EvaluationOptions {
    pub fn with_disabled_rules(mut self, rules: impl IntoIterator<Item = RuleId>) -> Self {
        self.disabled_rules.extend(rules);
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs.max(1));
        self
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        }
    }

    fn is_enabled(&self, rule: RuleId) -> bool {
        !self.disabled_rules.contains(&rule)
    }
}

/// Result of evaluating one file.
#[derive(Debug, Clone, Default)]
pub struct FileReport {
    pub file_path: String,
    /// Findings ordered by (line, column, rule ID).
    pub findings: Vec<Finding>,
    /// Rule failures that were contained and skipped.
    pub diagnostics: Vec<String>,
    pub documents: usize,
    pub scopes: usize,
}

impl FileReport {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Self::default()
        }
    }

    pub fn error_count(&self) -> usize {
        count(&self.findings, Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        count(&self.findings, Severity::Warning)
    }

    pub fn has_blocking(&self, threshold: Severity) -> bool {
        has_blocking(&self.findings, threshold)
    }
}

/// A file that could not be read.
#[derive(Debug, Clone)]
pub struct ReadFailure {
    pub file_path: String,
    pub message: String,
}

/// Result of evaluating a batch of files.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Per-file reports, ordered by path.
    pub files: Vec<FileReport>,
    pub read_errors: Vec<ReadFailure>,
}

impl ScanReport {
    pub fn files_scanned(&self) -> usize {
        self.files.len()
    }

    /// All findings, ordered by path then (line, column, rule ID).
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.files.iter().flat_map(|f| f.findings.iter())
    }

    pub fn error_count(&self) -> usize {
        self.files.iter().map(FileReport::error_count).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.files.iter().map(FileReport::warning_count).sum()
    }

    pub fn has_blocking(&self, threshold: Severity) -> bool {
        self.findings().any(|f| f.severity >= threshold)
    }
}

/// Whether any finding is at or above the threshold.
///
/// With an `error` threshold only errors block; with `warning` every
/// finding does.
pub fn has_blocking(findings: &[Finding], threshold: Severity) -> bool {
    findings.iter().any(|f| f.severity >= threshold)
}

fn count(findings: &[Finding], severity: Severity) -> usize {
    findings.iter().filter(|f| f.severity == severity).count()
}

/// Evaluate YAML text with all rules enabled.
pub fn evaluate(file_path: &str, text: &str) -> Vec<Finding> {
    evaluate_report(file_path, text, &EvaluationOptions::default()).findings
}

/// Evaluate YAML text and keep the diagnostics.
pub fn evaluate_report(file_path: &str, text: &str, options: &EvaluationOptions) -> FileReport {
    let mut report = FileReport::new(file_path);

    let documents = match parse(file_path, text) {
        Ok(documents) => documents,
        Err(err) => {
            log::warn!("{err}");
            if options.is_enabled(RuleId::ParseError) {
                report.findings.push(parse_error_finding(&err));
            }
            return report;
        }
    };
    report.documents = documents.len();

    let rules: Vec<&dyn Rule> = all_rules()
        .iter()
        .map(|r| r.as_ref())
        .filter(|r| options.is_enabled(r.id()))
        .collect();

    let mut seen = HashSet::new();
    for document in &documents {
        for scope in recognize(document) {
            report.scopes += 1;
            for finding in evaluate_scope(&scope, &rules, file_path, &mut report.diagnostics) {
                if seen.insert(finding.identity()) {
                    report.findings.push(finding);
                }
            }
        }
    }

    report.findings.sort();
    report
}

fn evaluate_scope(
    scope: &PodScope<'_>,
    rules: &[&dyn Rule],
    file_path: &str,
    diagnostics: &mut Vec<String>,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    for rule in rules.iter().filter(|r| r.scope() == RuleScope::Pod) {
        let outcome = rule.check_pod(scope);
        let Some(violations) = contain(outcome, rule.id(), None, file_path, diagnostics) else {
            continue;
        };
        findings.extend(violations.into_iter().map(|v| {
            let patch = patch::suggest(&v, scope, None);
            finalize(v, file_path, scope.document_index, patch)
        }));
    }

    for container in &scope.containers {
        for rule in rules.iter().filter(|r| r.scope() == RuleScope::Container) {
            let outcome = rule.check_container(scope, container);
            let Some(violations) =
                contain(outcome, rule.id(), Some(container.name), file_path, diagnostics)
            else {
                continue;
            };
            findings.extend(violations.into_iter().map(|v| {
                let patch = patch::suggest(&v, scope, Some(container));
                finalize(v, file_path, scope.document_index, patch)
            }));
        }
    }

    findings
}

/// Turn a rule failure into a diagnostic so the remaining rules still run.
fn contain<T>(
    outcome: std::result::Result<T, RuleError>,
    rule: RuleId,
    container: Option<&str>,
    file_path: &str,
    diagnostics: &mut Vec<String>,
) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(err) => {
            let diagnostic = match container {
                Some(name) => {
                    format!("{file_path}: rule {rule} skipped for container '{name}': {err}")
                }
                None => format!("{file_path}: rule {rule} skipped: {err}"),
            };
            log::warn!("{diagnostic}");
            diagnostics.push(diagnostic);
            None
        }
    }
}

fn finalize(
    violation: Violation<'_>,
    file_path: &str,
    document_index: usize,
    patch: Option<Patch>,
) -> Finding {
    violation
        .into_finding(file_path, document_index)
        .with_patch(patch)
}

fn parse_error_finding(err: &ParseError) -> Finding {
    Finding::new(
        RuleId::ParseError,
        err.file_path(),
        Position::START,
        format!("failed to parse YAML at {}", err.describe()),
    )
}

/// Evaluate a file from disk.
pub fn evaluate_file(path: &Path, options: &EvaluationOptions) -> Result<FileReport> {
    let location = options.resolve(path);
    let text = std::fs::read_to_string(&location).map_err(|source| KubePolicyError::Io {
        path: location.clone(),
        source,
    })?;
    Ok(evaluate_report(&display_path(path), &text, options))
}

/// Evaluate many files in parallel.
///
/// Unreadable files are collected in [`ScanReport::read_errors`]; they never
/// stop the rest of the batch.
pub fn evaluate_files(paths: &[PathBuf], options: &EvaluationOptions) -> Result<ScanReport> {
    let jobs = options.jobs.unwrap_or_else(num_cpus::get).max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| KubePolicyError::Runtime(format!("failed to start worker pool: {e}")))?;

    log::debug!("evaluating {} file(s) on {} worker(s)", paths.len(), jobs);

    let outcomes: Vec<(String, Result<FileReport>)> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| (display_path(path), evaluate_file(path, options)))
            .collect()
    });

    let mut report = ScanReport::default();
    for (file_path, outcome) in outcomes {
        match outcome {
            Ok(file) => report.files.push(file),
            Err(err) => {
                log::warn!("{err}");
                report.read_errors.push(ReadFailure {
                    file_path,
                    message: err.to_string(),
                });
            }
        }
    }

    report.files.sort_by(|a, b| a.file_path.cmp(&b.file_path));
    report.read_errors.sort_by(|a, b| a.file_path.cmp(&b.file_path));
    Ok(report)
}

/// Path as reported in findings, always with `/` separators.
pub fn display_path(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    text.strip_prefix("./").map(str::to_string).unwrap_or(text)
}
