use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::analyzer::kubepolicy::{OutputFormat, RuleId, Severity};
use crate::config::{Overrides, split_globs};

#[derive(Parser)]
#[command(name = "kubepolicy")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Check Kubernetes workloads in a pull request against security and reliability policies")]
#[command(long_about = "Scans the Kubernetes manifests changed by a pull request (or given explicitly), reports policy violations as GitHub annotations with exact line and column, suggests patches where the fix is mechanical, and fails when findings reach the severity threshold.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan manifests and report policy violations
    Scan(ScanArgs),

    /// List the policy rules
    Rules,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// Files or directories to scan (default: files changed by the pull request)
    #[arg(value_name = "PATHS")]
    pub paths: Vec<PathBuf>,

    /// Comma-separated globs a changed file must match
    #[arg(long, value_name = "GLOBS")]
    pub include: Option<String>,

    /// Comma-separated globs of files to skip
    #[arg(long, value_name = "GLOBS")]
    pub exclude: Option<String>,

    /// Comma-separated globs to scan instead of the git change set
    #[arg(long, value_name = "GLOBS")]
    pub file_globs: Option<String>,

    /// Lowest severity that fails the run
    #[arg(long, value_enum)]
    pub severity_threshold: Option<SeverityThreshold>,

    /// Output format
    #[arg(long, value_enum, default_value = "github")]
    pub format: OutputFormat,

    /// Also write the JSON summary to this file
    #[arg(long, value_name = "FILE")]
    pub json_output: Option<PathBuf>,

    /// Post a summary comment on the pull request
    #[arg(long, value_name = "BOOL", value_parser = clap::builder::BoolishValueParser::new())]
    pub post_pr_comment: Option<bool>,

    /// Token used to post the PR comment
    #[arg(long, value_name = "TOKEN")]
    pub github_token: Option<String>,

    /// Scan nothing, instead of every file, when the diff cannot be computed
    #[arg(long)]
    pub no_fallback_all: bool,

    /// Number of worker threads (default: number of CPUs)
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: Option<u16>,

    /// Rule to disable (repeatable)
    #[arg(long = "disable-rule", value_name = "RULE", value_parser = parse_rule_id)]
    pub disabled_rules: Vec<RuleId>,
}

impl ScanArgs {
    /// Command-line values as the highest configuration layer.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            include_globs: self.include.as_deref().map(split_globs),
            exclude_globs: self.exclude.as_deref().map(split_globs),
            file_globs: self.file_globs.as_deref().map(split_globs),
            severity_threshold: self.severity_threshold.map(Severity::from),
            post_pr_comment: self.post_pr_comment,
            github_token: self.github_token.clone(),
            json_output: self.json_output.clone(),
            no_fallback_all: self.no_fallback_all.then_some(true),
            jobs: self.jobs.map(usize::from),
            disabled_rules: self.disabled_rules.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeverityThreshold {
    Error,
    Warning,
}

impl From<SeverityThreshold> for Severity {
    fn from(value: SeverityThreshold) -> Self {
        match value {
            SeverityThreshold::Error => Severity::Error,
            SeverityThreshold::Warning => Severity::Warning,
        }
    }
}

fn parse_rule_id(s: &str) -> Result<RuleId, String> {
    RuleId::parse(s).ok_or_else(|| {
        let known: Vec<&str> = RuleId::ALL.iter().map(RuleId::as_str).collect();
        format!("unknown rule '{s}' (known: {})", known.join(", "))
    })
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }
}
