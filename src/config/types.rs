use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::analyzer::kubepolicy::{RuleId, Severity};

/// Main configuration structure
///
/// Every field has a default, so a `.kubepolicy.toml` only needs the keys it
/// wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Globs a changed file must match to be scanned
    pub include_globs: Vec<String>,
    /// Globs that exclude a file from scanning
    pub exclude_globs: Vec<String>,
    /// Explicit file globs; when set, git change detection is skipped
    pub file_globs: Vec<String>,
    /// Lowest severity that fails the run
    pub severity_threshold: Severity,
    /// Post a summary comment on pull requests
    pub post_pr_comment: bool,
    #[serde(skip_serializing)]
    pub github_token: Option<String>,
    /// Where to write the JSON summary
    pub json_output: Option<PathBuf>,
    /// Scan nothing (instead of the whole tree) when the diff cannot be computed
    pub no_fallback_all: bool,
    /// Worker threads for evaluation (defaults to the CPU count)
    pub jobs: Option<usize>,
    /// Rules whose findings are never reported
    pub disabled_rules: Vec<RuleId>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include_globs: vec!["**/*.yml".to_string(), "**/*.yaml".to_string()],
            exclude_globs: Vec::new(),
            file_globs: Vec::new(),
            severity_threshold: Severity::Error,
            post_pr_comment: true,
            github_token: None,
            json_output: None,
            no_fallback_all: false,
            jobs: None,
            disabled_rules: Vec::new(),
        }
    }
}

impl Config {
    /// Whether explicit file globs replace change-set discovery.
    pub fn has_file_globs(&self) -> bool {
        !self.file_globs.is_empty()
    }
}
