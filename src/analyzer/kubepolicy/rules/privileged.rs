//! privileged: containers must not set `securityContext.privileged: true`.

use crate::analyzer::kubepolicy::recognize::{ContainerScope, PodScope};
use crate::analyzer::kubepolicy::rules::{
    ContainerRule, Rule, RuleResult, Violation, security_context,
};
use crate::analyzer::kubepolicy::types::RuleId;

pub fn rule() -> impl Rule {
    ContainerRule::new(RuleId::Privileged, check)
}

fn check<'a>(pod: &PodScope<'a>, container: &ContainerScope<'a>) -> RuleResult<'a> {
    let path = container.path(&pod.source_path);
    let Some(sc) = security_context(container.node, &path)? else {
        return Ok(Vec::new());
    };

    match sc.entry("privileged") {
        Some((key, value)) if value.as_bool() == Some(true) => Ok(vec![
            Violation::new(
                RuleId::Privileged,
                key,
                format!(
                    "container '{}': securityContext.privileged is true",
                    container.name
                ),
            )
            .in_container(container),
        ]),
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::kubepolicy::rules::test_support::{run, try_run};

    #[test]
    fn test_privileged_container() {
        let yaml = r#"
kind: Pod
spec:
  containers:
    - name: app
      securityContext:
        privileged: true
    - name: other
      securityContext:
        privileged: true
"#;
        let findings = run(&rule(), yaml);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].0, 7);
        assert_eq!(findings[0].1, 9);
        assert_eq!(findings[0].2.as_deref(), Some("app"));
        assert_eq!(
            findings[0].3,
            "container 'app': securityContext.privileged is true"
        );
        assert_eq!(findings[1].2.as_deref(), Some("other"));
    }

    #[test]
    fn test_not_privileged() {
        let yaml = r#"
kind: Pod
spec:
  containers:
    - name: off
      securityContext:
        privileged: false
    - name: absent
    - name: empty
      securityContext: {}
"#;
        assert!(run(&rule(), yaml).is_empty());
    }

    #[test]
    fn test_string_true_is_not_boolean() {
        let yaml = r#"
kind: Pod
spec:
  containers:
    - name: app
      securityContext:
        privileged: "true"
"#;
        assert!(run(&rule(), yaml).is_empty());
    }

    #[test]
    fn test_unexpected_security_context_shape() {
        let yaml = r#"
kind: Pod
spec:
  containers:
    - name: app
      securityContext: privileged
"#;
        let err = try_run(&rule(), yaml).unwrap_err();
        assert!(err.to_string().contains("spec.containers[0].securityContext"));
    }
}
