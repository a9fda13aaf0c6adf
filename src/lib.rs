//! # KubePolicy
//!
//! A pull-request gate for Kubernetes manifests. It finds the workload
//! manifests changed by a pull request, checks every pod spec against a
//! catalog of security and reliability rules, and reports each violation at
//! the exact line and column of the offending key.
//!
//! ## Features
//!
//! - **Position-aware findings**: GitHub annotations land on the right line
//! - **Workload coverage**: Pods, Deployments, DaemonSets, StatefulSets, ReplicaSets, Jobs and CronJobs
//! - **Suggested patches**: mechanical fixes are proposed as YAML fragments
//! - **PR summaries**: an optional comment with totals and remediation snippets
//!
//! ## Example
//!
//! ```rust,no_run
//! use kubepolicy::{evaluate, has_blocking, Severity};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let text = std::fs::read_to_string("k8s/deployment.yaml")?;
//! let findings = evaluate("k8s/deployment.yaml", &text);
//! for finding in &findings {
//!     println!("{}:{}: {}", finding.line, finding.column, finding.message);
//! }
//! assert!(!has_blocking(&findings, Severity::Error));
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod github;
pub mod handlers;

// Re-export commonly used types and functions
pub use analyzer::kubepolicy::{
    EvaluationOptions, Finding, RuleId, ScanReport, Severity, evaluate, evaluate_files,
    has_blocking,
};
pub use error::{KubePolicyError, Result};

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
