//! Which files to scan.
//!
//! Candidates come from one of three sources, in order of preference:
//! explicit command-line paths, configured file globs, or the files changed
//! by the current pull request (or last commit) according to git. Every
//! candidate must be a `.yaml`/`.yml` file and match no exclude glob;
//! changed files must additionally match an include glob. Changed files are
//! relative to the repository root, so globs are written the way git prints
//! paths.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use glob::Pattern;
use walkdir::WalkDir;

use crate::analyzer::kubepolicy::lint::display_path;
use crate::config::Config;
use crate::error::{ConfigError, KubePolicyError, Result};
use crate::github::{GithubEvent, PullRequest};

/// Where the candidate list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Paths,
    FileGlobs,
    ChangeSet,
}

/// Include/exclude glob filter over `/`-separated paths.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl PathFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: compile("include_globs", include)?,
            exclude: compile("exclude_globs", exclude)?,
        })
    }

    /// An empty include list accepts everything.
    pub fn is_included(&self, path: &str) -> bool {
        self.include.is_empty() || self.include.iter().any(|p| p.matches(path))
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(path))
    }
}

fn compile(field: &'static str, patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| {
                KubePolicyError::from(ConfigError::InvalidValue {
                    field,
                    value: format!("{p} ({e})"),
                })
            })
        })
        .collect()
}

pub fn is_yaml_file(path: &str) -> bool {
    let lower = path.to_lowercase();
    lower.ends_with(".yaml") || lower.ends_with(".yml")
}

/// Resolve the files to scan for this run.
pub fn discover(
    config: &Config,
    paths: &[PathBuf],
    event: &GithubEvent,
    root: &Path,
) -> Result<(Source, Vec<PathBuf>)> {
    let filter = PathFilter::new(&config.include_globs, &config.exclude_globs)?;

    let (source, candidates) = if !paths.is_empty() {
        (Source::Paths, expand_paths(paths))
    } else if config.has_file_globs() {
        (Source::FileGlobs, expand_globs(&config.file_globs)?)
    } else {
        (
            Source::ChangeSet,
            changed_files(event, root, config.no_fallback_all),
        )
    };

    let selected = select(candidates, &filter, source == Source::ChangeSet);
    log::debug!("{:?}: {} file(s) selected", source, selected.len());
    Ok((source, selected))
}

/// Apply the YAML/include/exclude filters, dropping duplicates.
pub fn select(candidates: Vec<PathBuf>, filter: &PathFilter, use_include: bool) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|path| {
            let shown = display_path(path);
            is_yaml_file(&shown)
                && (!use_include || filter.is_included(&shown))
                && !filter.is_excluded(&shown)
                && seen.insert(shown)
        })
        .collect()
}

/// Explicit paths; directories are walked for YAML files.
pub fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(
                walk(path)
                    .into_iter()
                    .filter(|p| is_yaml_file(&p.to_string_lossy())),
            );
        } else {
            if !path.exists() {
                log::warn!("{} does not exist", path.display());
            }
            files.push(path.clone());
        }
    }
    files
}

/// Expand file globs (`**` is recursive).
pub fn expand_globs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let entries = glob::glob(pattern).map_err(|e| ConfigError::InvalidValue {
            field: "file_globs",
            value: format!("{pattern} ({e})"),
        })?;
        files.extend(entries.filter_map(|entry| entry.ok()).filter(|p| p.is_file()));
    }
    log::info!("Using file globs, found {} file(s)", files.len());
    Ok(files)
}

/// Every file under `root`, skipping `.git`.
pub fn walk(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

/// Files changed by the event, relative to `root`, falling back to the
/// whole tree when git cannot tell.
pub fn changed_files(event: &GithubEvent, root: &Path, no_fallback_all: bool) -> Vec<PathBuf> {
    let diffed = match &event.pull_request {
        Some(pr) => pull_request_diff(pr, root),
        None => diff_names(root, "HEAD^...HEAD"),
    };

    if let Some(files) = diffed {
        return files
            .into_iter()
            .map(PathBuf::from)
            .filter(|p| {
                let present = root.join(p).is_file();
                if !present {
                    log::debug!("Skipping {} (removed in this change)", p.display());
                }
                present
            })
            .collect();
    }

    if event.is_pull_request() && no_fallback_all {
        log::info!("Diff failed; fallback disabled, skipping repo-wide scan");
        return Vec::new();
    }
    log::info!("Falling back to all repository files");
    walk(root)
        .into_iter()
        .filter_map(|p| p.strip_prefix(root).ok().map(Path::to_path_buf))
        .collect()
}

fn pull_request_diff(pr: &PullRequest, root: &Path) -> Option<Vec<String>> {
    let base = &pr.base.name;

    if !base.is_empty() {
        if let Err(e) = git(root, &["fetch", "origin", base, "--depth", "1"]) {
            log::debug!("{e}; trying without fetch");
        }
        if let Some(files) = diff_names(root, &format!("origin/{base}...HEAD")) {
            return Some(files);
        }
    }

    if pr.base.sha.is_empty() {
        return None;
    }
    let merge_base = git(root, &["merge-base", &pr.base.sha, "HEAD"])
        .map_err(|e| log::debug!("{e}"))
        .ok()?;
    diff_names(root, &format!("{}...HEAD", merge_base.trim()))
}

/// `git diff --name-only RANGE`; an empty diff counts as no answer.
fn diff_names(root: &Path, range: &str) -> Option<Vec<String>> {
    let output = git(root, &["diff", "--name-only", range])
        .map_err(|e| log::debug!("{e}"))
        .ok()?;
    let files: Vec<String> = output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    (!files.is_empty()).then_some(files)
}

fn git(root: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .map_err(|e| KubePolicyError::Git(format!("failed to run git {}: {e}", args.join(" "))))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(KubePolicyError::Git(format!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}
