//! Pull request comment formatter (markdown).

use crate::analyzer::kubepolicy::lint::ScanReport;
use crate::analyzer::kubepolicy::types::{Severity, RuleId};

pub const COMMENT_TITLE: &str = "## KubePolicy PR Bot";

/// Generic remediation snippets, one per rule that appeared in the report.
fn remediation(rule: RuleId) -> Option<(&'static str, &'static str)> {
    let snippet = match rule {
        RuleId::Privileged => ("Avoid privileged containers", "securityContext:\n  privileged: false"),
        RuleId::HostNamespaces => (
            "Disable host namespace sharing",
            "spec:\n  hostNetwork: false\n  hostPID: false\n  hostIPC: false",
        ),
        RuleId::ImageTag => (
            "Pin image tags (avoid latest) or use digests",
            "containers:\n- name: app\n  image: myrepo/myimage:1.2.3  # or myimage@sha256:...",
        ),
        RuleId::MissingResources => (
            "Define resource requests and limits",
            "resources:\n  requests:\n    cpu: \"100m\"\n    memory: \"128Mi\"\n  limits:\n    cpu: \"500m\"\n    memory: \"512Mi\"",
        ),
        RuleId::DangerousCapability => (
            "Remove dangerous Linux capabilities",
            "securityContext:\n  capabilities:\n    drop: [\"ALL\"]",
        ),
        RuleId::HostpathNotReadonly => (
            "Mount hostPath volumes read-only",
            "volumeMounts:\n- name: host-vol\n  mountPath: /host\n  readOnly: true",
        ),
        RuleId::RunAsNonRoot => ("Run as a non-root user", "securityContext:\n  runAsNonRoot: true"),
        RuleId::ReadonlyRootFs => (
            "Use a read-only root filesystem",
            "securityContext:\n  readOnlyRootFilesystem: true",
        ),
        RuleId::SeccompProfile => (
            "Use the RuntimeDefault seccomp profile",
            "securityContext:\n  seccompProfile:\n    type: RuntimeDefault",
        ),
        RuleId::MissingProbe => (
            "Add liveness and readiness probes",
            "livenessProbe:\n  httpGet:\n    path: /healthz\n    port: 8080\nreadinessProbe:\n  httpGet:\n    path: /ready\n    port: 8080",
        ),
        RuleId::ParseError => return None,
    };
    Some(snippet)
}

/// Build the comment body.
pub fn build(report: &ScanReport, threshold: Severity) -> String {
    let mut lines = vec![
        COMMENT_TITLE.to_string(),
        String::new(),
        format!(
            "Scanned {} file(s). Found {} error(s) and {} warning(s).",
            report.files_scanned(),
            report.error_count(),
            report.warning_count()
        ),
        String::new(),
    ];

    if report.has_blocking(threshold) {
        lines.push(format!("**Result:** blocking (threshold: `{threshold}`)"));
    } else {
        lines.push(format!("**Result:** passing (threshold: `{threshold}`)"));
    }
    lines.push(String::new());

    for file in &report.files {
        lines.push(format!("- {}", file.file_path));
        for finding in file.findings.iter().filter(|f| f.severity == Severity::Error) {
            lines.push(format!("  - E: L{}: {}", finding.line, finding.message));
        }
        for finding in file.findings.iter().filter(|f| f.severity == Severity::Warning) {
            lines.push(format!("  - W: L{}: {}", finding.line, finding.message));
        }
    }

    let patched: Vec<_> = report.findings().filter(|f| f.patch.is_some()).collect();
    if !patched.is_empty() {
        lines.push(String::new());
        lines.push("### Suggested patches".to_string());
        for finding in patched {
            let Some(patch) = &finding.patch else {
                continue;
            };
            lines.push(String::new());
            lines.push(format!(
                "`{}` line {} ({}, {}):",
                finding.file_path,
                finding.line,
                finding.rule,
                patch.describe()
            ));
            lines.push("```yaml".to_string());
            lines.push(patch.render());
            lines.push("```".to_string());
        }
    }

    let mut rules: Vec<RuleId> = report.findings().map(|f| f.rule).collect();
    rules.sort_by_key(|r| r.as_str());
    rules.dedup();
    let snippets: Vec<_> = rules.into_iter().filter_map(remediation).collect();
    if !snippets.is_empty() {
        lines.push(String::new());
        lines.push("### Remediation reference".to_string());
        for (title, yaml) in snippets {
            lines.push(String::new());
            lines.push(format!("- {title}:"));
            lines.push("```yaml".to_string());
            lines.push(yaml.to_string());
            lines.push("```".to_string());
        }
    }

    lines.join("\n")
}
