use std::path::{Path, PathBuf};

use crate::analyzer::kubepolicy::formatter::{comment, format_report, json};
use crate::analyzer::kubepolicy::{EvaluationOptions, OutputFormat, ScanReport, evaluate_files};
use crate::cli::ScanArgs;
use crate::config::{self, Config, Overrides};
use crate::discovery;
use crate::error::{KubePolicyError, Result};
use crate::github::{self, GithubEvent};

/// What a scan produced, for the caller to turn into an exit code.
#[derive(Debug)]
pub struct ScanOutcome {
    pub report: ScanReport,
    pub blocking: bool,
}

/// Handle `kubepolicy scan`.
///
/// Configuration layers, lowest first: defaults, TOML file, environment,
/// command line.
pub fn handle_scan(args: ScanArgs, config_path: Option<&Path>) -> Result<ScanOutcome> {
    let root = std::env::current_dir().map_err(|source| KubePolicyError::Io {
        path: PathBuf::from("."),
        source,
    })?;

    let mut config = config::load_config(config_path, &root)?;
    Overrides::from_env()?.apply(&mut config);
    args.overrides().apply(&mut config);
    log::debug!("Effective configuration: {:?}", redacted(&config));

    let event = GithubEvent::from_env();
    run_scan(&config, &args.paths, args.format, &event, &root)
}

/// Discover, evaluate, report.
pub fn run_scan(
    config: &Config,
    paths: &[PathBuf],
    format: OutputFormat,
    event: &GithubEvent,
    root: &Path,
) -> Result<ScanOutcome> {
    let threshold = config.severity_threshold;
    let (_, files) = discovery::discover(config, paths, event, root)?;
    if files.is_empty() {
        log::info!("No matching YAML files to scan");
    }

    let mut options = EvaluationOptions::default()
        .with_disabled_rules(config.disabled_rules.iter().copied())
        .with_base_dir(root);
    if let Some(jobs) = config.jobs {
        options = options.with_jobs(jobs);
    }
    let report = evaluate_files(&files, &options)?;

    let output = format_report(&report, format, threshold);
    if !output.is_empty() {
        print!("{output}");
        if !output.ends_with('\n') {
            println!();
        }
    }

    if let Some(path) = &config.json_output {
        if let Err(e) = json::write_summary(path, &report, threshold) {
            log::warn!("Failed to write JSON summary: {e}");
        }
    }

    if config.post_pr_comment && event.is_pull_request() && report.files_scanned() > 0 {
        publish_comment(config, event, &report);
    }

    Ok(ScanOutcome {
        blocking: report.has_blocking(threshold),
        report,
    })
}

fn publish_comment(config: &Config, event: &GithubEvent, report: &ScanReport) {
    let body = comment::build(report, config.severity_threshold);

    let Some(token) = config.github_token.as_deref() else {
        log::info!("No GitHub token provided; printing comment body instead");
        eprintln!("{body}");
        return;
    };

    let api_url = std::env::var("GITHUB_API_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| github::DEFAULT_API_URL.to_string());

    if let Err(e) = github::post_comment(&api_url, event, token, &body) {
        log::warn!("{e}");
    }
}

fn redacted(config: &Config) -> Config {
    Config {
        github_token: config.github_token.as_ref().map(|_| "***".to_string()),
        ..config.clone()
    }
}
