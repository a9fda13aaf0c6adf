//! Posting the summary comment on a pull request.

use serde_json::json;

use crate::error::{KubePolicyError, Result};
use crate::github::event::GithubEvent;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = "kubepolicy-pr-bot";

/// Issue comments endpoint for the event's pull request.
pub fn comments_url(api_url: &str, event: &GithubEvent) -> Result<String> {
    let pr = event
        .pull_request
        .as_ref()
        .ok_or_else(|| KubePolicyError::GitHub("event is not a pull request".to_string()))?;
    let (owner, repo) = event.owner_and_repo().ok_or_else(|| {
        KubePolicyError::GitHub("event payload has no usable repository.full_name".to_string())
    })?;
    Ok(format!(
        "{}/repos/{owner}/{repo}/issues/{}/comments",
        api_url.trim_end_matches('/'),
        pr.number
    ))
}

/// Post `body` as a comment on the pull request.
pub fn post_comment(api_url: &str, event: &GithubEvent, token: &str, body: &str) -> Result<()> {
    let url = comments_url(api_url, event)?;

    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .build()?;

    let response = client
        .post(&url)
        .header("Accept", "application/vnd.github.v3+json")
        .header("Authorization", format!("token {token}"))
        .json(&json!({ "body": body }))
        .send()?;

    let status = response.status();
    if status.is_success() {
        log::info!("Posted PR comment");
        Ok(())
    } else {
        let text = response.text().unwrap_or_default();
        Err(KubePolicyError::GitHub(format!(
            "failed to post PR comment: {status} {text}"
        )))
    }
}
