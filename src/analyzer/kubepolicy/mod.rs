//! KubePolicy: position-aware policy checks for Kubernetes workloads.
//!
//! Parses manifests into a positioned YAML tree, finds every pod spec
//! (Pods, Deployments, DaemonSets, StatefulSets, ReplicaSets, Jobs and
//! CronJobs) and runs a fixed catalog of security and reliability rules
//! against it. Each finding points at the exact line and column of the
//! offending key, and some carry an advisory patch.
//!
//! # Example
//!
//! ```rust,ignore
//! use kubepolicy::analyzer::kubepolicy::{evaluate, has_blocking, Severity};
//!
//! let findings = evaluate("deploy.yaml", &std::fs::read_to_string("deploy.yaml")?);
//! for finding in &findings {
//!     println!("{}:{}: [{}] {}", finding.line, finding.column, finding.rule, finding.message);
//! }
//! let blocked = has_blocking(&findings, Severity::Error);
//! ```
//!
//! # Rules
//!
//! Errors: `privileged`, `host-namespaces`, `image-tag`, `missing-resources`,
//! `dangerous-capability`, `hostpath-not-readonly` (and `parse-error` for
//! invalid YAML).
//!
//! Warnings: `run-as-non-root`, `readonly-root-fs`, `seccomp-profile`,
//! `missing-probe`.

pub mod formatter;
pub mod lint;
pub mod parser;
pub mod patch;
pub mod recognize;
pub mod rules;
pub mod types;

pub use formatter::OutputFormat;
pub use lint::{
    EvaluationOptions, FileReport, ReadFailure, ScanReport, evaluate, evaluate_file,
    evaluate_files, evaluate_report, has_blocking,
};
pub use parser::{Document, ParseError, Position, YamlNode};
pub use recognize::{ContainerScope, ManifestKind, PodScope, recognize};
pub use types::{Finding, Patch, PatchMode, RuleId, Severity};
