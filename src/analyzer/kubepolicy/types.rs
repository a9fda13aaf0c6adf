//! Core types for the kubepolicy checker.
//!
//! - `Severity` - finding severity, also used as the blocking threshold
//! - `RuleId` - the closed catalog of rule identifiers
//! - `Finding` - a single policy violation with its location
//! - `Patch` - an advisory YAML fragment that would fix a finding

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::analyzer::kubepolicy::parser::Position;

/// Severity levels for findings.
///
/// `Error > Warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks a pull request under the default threshold
    #[default]
    Error,
    /// Blocks only when the threshold is lowered to `warning`
    Warning,
}

impl Severity {
    /// Parse a severity from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            _ => None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Error => 1,
            Self::Warning => 0,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Identifier of a policy rule.
///
/// The catalog is closed: severity and description are looked up here and
/// never computed by the rules themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    /// Synthetic rule for files that are not valid YAML.
    ParseError,
    Privileged,
    HostNamespaces,
    ImageTag,
    MissingResources,
    DangerousCapability,
    HostpathNotReadonly,
    RunAsNonRoot,
    ReadonlyRootFs,
    SeccompProfile,
    MissingProbe,
}

impl RuleId {
    pub const ALL: [RuleId; 11] = [
        RuleId::ParseError,
        RuleId::Privileged,
        RuleId::HostNamespaces,
        RuleId::ImageTag,
        RuleId::MissingResources,
        RuleId::DangerousCapability,
        RuleId::HostpathNotReadonly,
        RuleId::RunAsNonRoot,
        RuleId::ReadonlyRootFs,
        RuleId::SeccompProfile,
        RuleId::MissingProbe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "parse-error",
            Self::Privileged => "privileged",
            Self::HostNamespaces => "host-namespaces",
            Self::ImageTag => "image-tag",
            Self::MissingResources => "missing-resources",
            Self::DangerousCapability => "dangerous-capability",
            Self::HostpathNotReadonly => "hostpath-not-readonly",
            Self::RunAsNonRoot => "run-as-non-root",
            Self::ReadonlyRootFs => "readonly-root-fs",
            Self::SeccompProfile => "seccomp-profile",
            Self::MissingProbe => "missing-probe",
        }
    }

    /// Parse a rule ID from its kebab-case name.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|id| id.as_str().eq_ignore_ascii_case(s))
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::ParseError
            | Self::Privileged
            | Self::HostNamespaces
            | Self::ImageTag
            | Self::MissingResources
            | Self::DangerousCapability
            | Self::HostpathNotReadonly => Severity::Error,
            Self::RunAsNonRoot | Self::ReadonlyRootFs | Self::SeccompProfile | Self::MissingProbe => {
                Severity::Warning
            }
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ParseError => "The file must be valid YAML.",
            Self::Privileged => "Containers must not run with securityContext.privileged: true.",
            Self::HostNamespaces => "Pods must not share the host network, PID or IPC namespace.",
            Self::ImageTag => "Images must be pinned to a tag other than 'latest' or to a digest.",
            Self::MissingResources => {
                "Containers must declare resources.requests or resources.limits."
            }
            Self::DangerousCapability => {
                "Containers must not add SYS_ADMIN, NET_ADMIN, SYS_PTRACE or DAC_READ_SEARCH."
            }
            Self::HostpathNotReadonly => "hostPath volumes must be mounted with readOnly: true.",
            Self::RunAsNonRoot => "Containers should run with securityContext.runAsNonRoot: true.",
            Self::ReadonlyRootFs => {
                "Containers should set securityContext.readOnlyRootFilesystem: true."
            }
            Self::SeccompProfile => "Pods or containers should use the RuntimeDefault seccomp profile.",
            Self::MissingProbe => "Containers should define livenessProbe and readinessProbe.",
        }
    }

    /// Whether findings of this rule can carry a suggested patch.
    pub fn is_patchable(&self) -> bool {
        matches!(
            self,
            Self::ImageTag
                | Self::MissingResources
                | Self::RunAsNonRoot
                | Self::ReadonlyRootFs
                | Self::SeccompProfile
        )
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a patch fragment is applied at its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatchMode {
    /// Insert the fragment on the lines following the anchor key.
    InsertAfterKey,
    /// Replace the anchor key and its value with the fragment.
    ReplaceValue,
}

impl PatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsertAfterKey => "insertAfterKey",
            Self::ReplaceValue => "replaceValue",
        }
    }
}

/// An advisory edit. Never applied to the source file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Patch {
    pub anchor_line: u32,
    pub anchor_column: u32,
    pub mode: PatchMode,
    /// Unindented YAML text.
    pub fragment: String,
    /// Number of spaces every fragment line should be indented by.
    pub indent: usize,
}

impl Patch {
    pub fn new(anchor: Position, mode: PatchMode, fragment: impl Into<String>, indent: usize) -> Self {
        Self {
            anchor_line: anchor.line,
            anchor_column: anchor.column,
            mode,
            fragment: fragment.into(),
            indent,
        }
    }

    /// The fragment with the indentation applied.
    pub fn render(&self) -> String {
        let pad = " ".repeat(self.indent);
        self.fragment
            .lines()
            .map(|line| format!("{pad}{line}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Short description of where the fragment goes.
    pub fn describe(&self) -> String {
        match self.mode {
            PatchMode::InsertAfterKey => format!("insert after line {}", self.anchor_line),
            PatchMode::ReplaceValue => format!("replace line {}", self.anchor_line),
        }
    }
}

/// Deduplication identity of a finding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FindingIdentity {
    pub rule: RuleId,
    pub file_path: String,
    pub line: u32,
    pub column: u32,
    pub container: Option<String>,
}

/// A policy violation found in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    #[serde(rename = "rule_id")]
    pub rule: RuleId,
    pub severity: Severity,
    pub file_path: String,
    /// 1-based line of the offending node.
    pub line: u32,
    /// 1-based column of the offending node.
    pub column: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Patch>,
}

impl Finding {
    /// Create a finding; severity comes from the rule catalog.
    pub fn new(
        rule: RuleId,
        file_path: impl Into<String>,
        position: Position,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule,
            severity: rule.severity(),
            file_path: file_path.into(),
            line: position.line,
            column: position.column,
            message: message.into(),
            container: None,
            document_index: None,
            patch: None,
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn with_document(mut self, index: usize) -> Self {
        self.document_index = Some(index);
        self
    }

    pub fn with_patch(mut self, patch: Option<Patch>) -> Self {
        self.patch = patch;
        self
    }

    pub fn identity(&self) -> FindingIdentity {
        FindingIdentity {
            rule: self.rule,
            file_path: self.file_path.clone(),
            line: self.line,
            column: self.column,
            container: self.container.clone(),
        }
    }
}

impl Ord for Finding {
    fn cmp(&self, other: &Self) -> Ordering {
        self.file_path
            .cmp(&other.file_path)
            .then(self.line.cmp(&other.line))
            .then(self.column.cmp(&other.column))
            .then(self.rule.as_str().cmp(other.rule.as_str()))
            .then_with(|| self.container.cmp(&other.container))
            .then_with(|| self.message.cmp(&other.message))
            // Consistent with the derived `Eq`.
            .then_with(|| self.severity.cmp(&other.severity))
            .then_with(|| self.document_index.cmp(&other.document_index))
            .then_with(|| self.patch.cmp(&other.patch))
    }
}

impl PartialOrd for Finding {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert_eq!(Severity::parse("WARNING"), Some(Severity::Warning));
        assert_eq!(Severity::parse(" error "), Some(Severity::Error));
        assert_eq!(Severity::parse("info"), None);
    }

    #[test]
    fn test_rule_id_round_trip() {
        for id in RuleId::ALL {
            assert_eq!(RuleId::parse(id.as_str()), Some(id));
        }
        assert_eq!(RuleId::parse("no-such-rule"), None);
    }

    #[test]
    fn test_rule_id_serde_matches_as_str() {
        for id in RuleId::ALL {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.as_str()));
        }
    }

    #[test]
    fn test_fixed_severities() {
        assert_eq!(RuleId::Privileged.severity(), Severity::Error);
        assert_eq!(RuleId::HostpathNotReadonly.severity(), Severity::Error);
        assert_eq!(RuleId::MissingProbe.severity(), Severity::Warning);
        assert_eq!(RuleId::SeccompProfile.severity(), Severity::Warning);
    }

    #[test]
    fn test_finding_sort_order() {
        let a = Finding::new(RuleId::Privileged, "a.yaml", Position::new(5, 3), "x");
        let b = Finding::new(RuleId::ImageTag, "a.yaml", Position::new(5, 3), "y");
        let c = Finding::new(RuleId::HostNamespaces, "a.yaml", Position::new(2, 9), "z");
        let d = Finding::new(RuleId::HostNamespaces, "0.yaml", Position::new(9, 1), "z");
        let mut findings = vec![a.clone(), b.clone(), c.clone(), d.clone()];
        findings.sort();
        assert_eq!(findings, vec![d, c, b, a]);
    }

    #[test]
    fn test_finding_ordering_agrees_with_equality() {
        let base = Finding::new(RuleId::Privileged, "a.yaml", Position::new(5, 3), "x");
        let in_second_doc = base.clone().with_document(1);
        let patched = base.clone().with_patch(Some(Patch::new(
            Position::new(5, 3),
            PatchMode::ReplaceValue,
            "privileged: false",
            4,
        )));

        assert_eq!(base.cmp(&base.clone()), Ordering::Equal);
        for other in [&in_second_doc, &patched] {
            assert_ne!(&base, other);
            assert_ne!(base.cmp(other), Ordering::Equal);
        }
    }

    #[test]
    fn test_patch_render() {
        let patch = Patch::new(
            Position::new(4, 7),
            PatchMode::InsertAfterKey,
            "securityContext:\n  runAsNonRoot: true",
            6,
        );
        assert_eq!(patch.render(), "      securityContext:\n        runAsNonRoot: true");
        assert_eq!(patch.describe(), "insert after line 4");
    }
}
