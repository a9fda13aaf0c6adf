//! GitHub Actions integration: the event payload and PR comments.

pub mod comment;
pub mod event;

pub use comment::{DEFAULT_API_URL, comments_url, post_comment};
pub use event::{GithubEvent, GitRef, PullRequest, Repository};
