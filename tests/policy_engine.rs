use std::path::{Path, PathBuf};

use kubepolicy::analyzer::kubepolicy::{
    EvaluationOptions, Finding, PatchMode, RuleId, Severity, evaluate, evaluate_file,
    evaluate_files, has_blocking,
};

const FIXTURES: &str = "tests/fixtures/kubepolicy";

fn fixture(name: &str) -> PathBuf {
    Path::new(FIXTURES).join(name)
}

fn evaluate_fixture(name: &str) -> Vec<Finding> {
    evaluate_file(&fixture(name), &EvaluationOptions::default())
        .unwrap_or_else(|e| panic!("{name}: {e}"))
        .findings
}

/// (rule, line, column, container) of every finding.
fn located(findings: &[Finding]) -> Vec<(&str, u32, u32, Option<&str>)> {
    findings
        .iter()
        .map(|f| (f.rule.as_str(), f.line, f.column, f.container.as_deref()))
        .collect()
}

#[test]
fn insecure_deployment_findings_are_positioned() {
    let findings = evaluate_fixture("insecure-deployment.yaml");

    assert_eq!(
        located(&findings),
        vec![
            ("host-namespaces", 12, 7, None),
            ("missing-probe", 14, 11, Some("app")),
            ("missing-resources", 14, 11, Some("app")),
            ("missing-probe", 14, 17, Some("app")),
            ("image-tag", 15, 11, Some("app")),
            ("readonly-root-fs", 16, 11, Some("app")),
            ("run-as-non-root", 16, 11, Some("app")),
            ("seccomp-profile", 16, 11, Some("app")),
            ("privileged", 17, 13, Some("app")),
            ("dangerous-capability", 19, 21, Some("app")),
            ("hostpath-not-readonly", 21, 15, Some("app")),
            ("missing-probe", 23, 11, Some("sidecar")),
            ("readonly-root-fs", 23, 11, Some("sidecar")),
            ("run-as-non-root", 23, 11, Some("sidecar")),
            ("seccomp-profile", 23, 11, Some("sidecar")),
            ("missing-probe", 23, 17, Some("sidecar")),
        ]
    );

    let errors = findings.iter().filter(|f| f.severity == Severity::Error).count();
    assert_eq!(errors, 6);
    assert_eq!(findings.len() - errors, 10);
    assert!(findings.iter().all(|f| f.document_index == Some(0)));
}

#[test]
fn insecure_deployment_messages() {
    let findings = evaluate_fixture("insecure-deployment.yaml");
    let messages: Vec<&str> = findings.iter().map(|f| f.message.as_str()).collect();

    for expected in [
        "hostNetwork is true",
        "container 'app': securityContext.privileged is true",
        "container 'app': image 'nginx:latest' uses 'latest' or has no tag",
        "container 'app': dangerous capability added: NET_ADMIN",
        "container 'app': missing livenessProbe",
        "container 'sidecar': missing readinessProbe",
    ] {
        assert!(messages.contains(&expected), "missing message: {expected}");
    }
    assert!(!messages.iter().any(|m| m.contains("SYS_TIME")));
}

#[test]
fn insecure_deployment_patches() {
    let findings = evaluate_fixture("insecure-deployment.yaml");
    let patch_of = |rule: RuleId, container: &str| {
        findings
            .iter()
            .find(|f| f.rule == rule && f.container.as_deref() == Some(container))
            .and_then(|f| f.patch.clone())
    };

    let resources = patch_of(RuleId::MissingResources, "app").expect("resources patch");
    assert_eq!(resources.mode, PatchMode::InsertAfterKey);
    assert_eq!((resources.anchor_line, resources.indent), (14, 10));

    let run_as = patch_of(RuleId::RunAsNonRoot, "app").expect("runAsNonRoot patch");
    assert_eq!(run_as.mode, PatchMode::InsertAfterKey);
    assert_eq!(run_as.anchor_line, 16);
    assert_eq!(run_as.fragment, "runAsNonRoot: true");

    let sidecar = patch_of(RuleId::ReadonlyRootFs, "sidecar").expect("sidecar patch");
    assert_eq!(sidecar.anchor_line, 23);
    assert_eq!(sidecar.fragment, "securityContext:\n  readOnlyRootFilesystem: true");

    // No other nginx reference in the pod to pin to.
    assert!(patch_of(RuleId::ImageTag, "app").is_none());
    assert!(patch_of(RuleId::Privileged, "app").is_none());
}

#[test]
fn cronjob_pod_spec_is_found_and_inherits_pod_settings() {
    let findings = evaluate_fixture("cronjob.yaml");

    assert_eq!(
        located(&findings),
        vec![
            ("missing-probe", 17, 15, Some("migrate")),
            ("missing-probe", 17, 21, Some("migrate")),
            ("image-tag", 18, 15, Some("migrate")),
            ("missing-probe", 25, 15, Some("report")),
            ("missing-probe", 25, 21, Some("report")),
            ("run-as-non-root", 32, 17, Some("report")),
        ]
    );

    let run_as = &findings[5];
    assert_eq!(
        run_as.message,
        "container 'report': securityContext.runAsNonRoot is false, expected true"
    );
    let patch = run_as.patch.as_ref().expect("replace patch");
    assert_eq!(patch.mode, PatchMode::ReplaceValue);
    assert_eq!(patch.render(), "                runAsNonRoot: true");
}

#[test]
fn multi_document_file_reports_document_index() {
    let findings = evaluate_fixture("multi-document.yaml");
    assert_eq!(located(&findings), vec![("host-namespaces", 14, 3, None)]);
    assert_eq!(findings[0].message, "hostPID is true");
    assert_eq!(findings[0].document_index, Some(1));
}

#[test]
fn broken_file_yields_single_parse_error() {
    let findings = evaluate_fixture("broken.yaml");
    assert_eq!(findings.len(), 1);
    let finding = &findings[0];
    assert_eq!(finding.rule, RuleId::ParseError);
    assert_eq!(finding.severity, Severity::Error);
    assert_eq!((finding.line, finding.column), (1, 1));
    assert!(finding.message.starts_with("failed to parse YAML at"));
}

#[test]
fn hardened_statefulset_is_clean() {
    assert!(evaluate_fixture("hardened-statefulset.yaml").is_empty());
}

#[test]
fn evaluation_is_deterministic() {
    let text = std::fs::read_to_string(fixture("insecure-deployment.yaml")).unwrap();
    let first = evaluate("deploy.yaml", &text);
    for _ in 0..5 {
        assert_eq!(evaluate("deploy.yaml", &text), first);
    }
}

#[test]
fn batch_evaluation_orders_files_and_collects_read_errors() {
    let paths = vec![
        fixture("multi-document.yaml"),
        fixture("does-not-exist.yaml"),
        fixture("cronjob.yaml"),
        fixture("insecure-deployment.yaml"),
    ];
    let options = EvaluationOptions::default().with_jobs(3);
    let report = evaluate_files(&paths, &options).unwrap();

    let scanned: Vec<&str> = report.files.iter().map(|f| f.file_path.as_str()).collect();
    assert_eq!(
        scanned,
        vec![
            "tests/fixtures/kubepolicy/cronjob.yaml",
            "tests/fixtures/kubepolicy/insecure-deployment.yaml",
            "tests/fixtures/kubepolicy/multi-document.yaml",
        ]
    );
    assert_eq!(report.read_errors.len(), 1);
    assert_eq!(
        report.read_errors[0].file_path,
        "tests/fixtures/kubepolicy/does-not-exist.yaml"
    );

    assert_eq!(report.error_count(), 1 + 6 + 1);
    assert_eq!(report.warning_count(), 5 + 10);
    assert!(report.has_blocking(Severity::Error));
}

#[test]
fn disabled_rules_change_the_gate() {
    let options = EvaluationOptions::default().with_disabled_rules([RuleId::ImageTag]);
    let report = evaluate_files(&[fixture("cronjob.yaml")], &options).unwrap();
    let findings: Vec<Finding> = report.findings().cloned().collect();

    assert!(!has_blocking(&findings, Severity::Error));
    assert!(has_blocking(&findings, Severity::Warning));
}
