//! The workflow event payload (`GITHUB_EVENT_PATH`).
//!
//! Only the fields needed for diffing and commenting are read; anything
//! else in the payload is ignored.

use serde::Deserialize;
use std::path::Path;

use crate::error::{KubePolicyError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GithubEvent {
    #[serde(default)]
    pub pull_request: Option<PullRequest>,
    #[serde(default)]
    pub repository: Option<Repository>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub base: GitRef,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref", default)]
    pub name: String,
    #[serde(default)]
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

impl GithubEvent {
    /// Load the event named by `GITHUB_EVENT_PATH`.
    ///
    /// Outside of Actions, or when the payload cannot be read, this is an
    /// empty (non pull request) event.
    pub fn from_env() -> Self {
        let Some(path) = std::env::var_os("GITHUB_EVENT_PATH") else {
            return Self::default();
        };
        let path = Path::new(&path);
        if !path.is_file() {
            log::debug!("GITHUB_EVENT_PATH {} does not exist", path.display());
            return Self::default();
        }
        match Self::from_path(path) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Ignoring unreadable event payload: {e}");
                Self::default()
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| KubePolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// `(owner, repo)` of the repository the event belongs to.
    pub fn owner_and_repo(&self) -> Option<(&str, &str)> {
        let full_name = &self.repository.as_ref()?.full_name;
        let (owner, repo) = full_name.split_once('/')?;
        (!owner.is_empty() && !repo.is_empty() && !repo.contains('/')).then_some((owner, repo))
    }
}
