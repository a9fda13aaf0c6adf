//! run-as-non-root: containers should run with `runAsNonRoot: true`.
//!
//! A container-level value overrides the pod-level one; a container that
//! does not set it inherits the pod's.

use crate::analyzer::kubepolicy::recognize::{ContainerScope, PodScope};
use crate::analyzer::kubepolicy::rules::{
    ContainerRule, Rule, RuleResult, Violation, nearest_key, security_context, set_value,
};
use crate::analyzer::kubepolicy::types::RuleId;

pub fn rule() -> impl Rule {
    ContainerRule::new(RuleId::RunAsNonRoot, check)
}

fn check<'a>(pod: &PodScope<'a>, container: &ContainerScope<'a>) -> RuleResult<'a> {
    let path = container.path(&pod.source_path);
    let container_sc = security_context(container.node, &path)?;
    let pod_sc = security_context(pod.spec, &pod.source_path)?;

    let container_value = container_sc.and_then(|sc| set_value(sc, "runAsNonRoot"));
    let message = match container_value {
        Some((_, value)) if value.as_bool() == Some(true) => return Ok(Vec::new()),
        Some((_, value)) => format!(
            "container '{}': securityContext.runAsNonRoot is {}, expected true",
            container.name,
            value.raw().unwrap_or("not a boolean")
        ),
        None => {
            let pod_value = pod_sc.and_then(|sc| sc.get("runAsNonRoot"));
            if pod_value.and_then(|v| v.as_bool()) == Some(true) {
                return Ok(Vec::new());
            }
            format!(
                "container '{}': missing runAsNonRoot: true (pod or container securityContext)",
                container.name
            )
        }
    };

    let anchor = nearest_key(container.node, &["securityContext", "runAsNonRoot"])
        .unwrap_or(container.node);

    Ok(vec![
        Violation::new(RuleId::RunAsNonRoot, anchor, message).in_container(container),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::kubepolicy::rules::test_support::run;

    #[test]
    fn test_pod_level_true_is_inherited() {
        let yaml = r#"
kind: Pod
spec:
  securityContext:
    runAsNonRoot: true
  containers:
    - name: app
    - name: side
"#;
        assert!(run(&rule(), yaml).is_empty());
    }

    #[test]
    fn test_container_level_true() {
        let yaml = r#"
kind: Pod
spec:
  containers:
    - name: app
      securityContext:
        runAsNonRoot: true
"#;
        assert!(run(&rule(), yaml).is_empty());
    }

    #[test]
    fn test_container_false_overrides_pod_true() {
        let yaml = r#"
kind: Pod
spec:
  securityContext:
    runAsNonRoot: true
  containers:
    - name: app
      securityContext:
        runAsNonRoot: false
    - name: inherits
"#;
        let findings = run(&rule(), yaml);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].2.as_deref(), Some("app"));
        assert_eq!((findings[0].0, findings[0].1), (9, 9));
        assert_eq!(
            findings[0].3,
            "container 'app': securityContext.runAsNonRoot is false, expected true"
        );
    }

    #[test]
    fn test_container_true_overrides_pod_false() {
        let yaml = r#"
kind: Pod
spec:
  securityContext:
    runAsNonRoot: false
  containers:
    - name: app
      securityContext:
        runAsNonRoot: true
"#;
        assert!(run(&rule(), yaml).is_empty());
    }

    #[test]
    fn test_missing_everywhere_anchors() {
        let yaml = r#"
kind: Pod
spec:
  containers:
    - name: bare
    - name: partial
      securityContext:
        privileged: false
"#;
        let findings = run(&rule(), yaml);
        assert_eq!(findings.len(), 2);
        assert_eq!((findings[0].0, findings[0].1), (5, 7));
        assert_eq!(
            findings[0].3,
            "container 'bare': missing runAsNonRoot: true (pod or container securityContext)"
        );
        assert_eq!((findings[1].0, findings[1].1), (7, 7));
    }

    #[test]
    fn test_string_true_does_not_satisfy() {
        let yaml = r#"
kind: Pod
spec:
  securityContext:
    runAsNonRoot: "true"
  containers:
    - name: app
"#;
        assert_eq!(run(&rule(), yaml).len(), 1);
    }
}
