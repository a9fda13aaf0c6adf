//! missing-resources: containers must declare requests or limits.

use crate::analyzer::kubepolicy::recognize::{ContainerRole, ContainerScope, PodScope};
use crate::analyzer::kubepolicy::rules::{ContainerRule, Rule, RuleResult, Violation, child_mapping};
use crate::analyzer::kubepolicy::types::RuleId;

pub fn rule() -> impl Rule {
    ContainerRule::new(RuleId::MissingResources, check)
}

fn check<'a>(pod: &PodScope<'a>, container: &ContainerScope<'a>) -> RuleResult<'a> {
    // Ephemeral containers cannot carry resources.
    if container.role == ContainerRole::EphemeralContainer {
        return Ok(Vec::new());
    }

    let path = container.path(&pod.source_path);
    let resources = child_mapping(container.node, "resources", &path)?;
    let declared = |key: &str| {
        resources
            .and_then(|r| r.get(key))
            .is_some_and(|value| !value.is_blank())
    };

    if declared("requests") || declared("limits") {
        return Ok(Vec::new());
    }

    let anchor = container
        .node
        .entry("resources")
        .map_or(container.node, |(key, _)| key);

    Ok(vec![
        Violation::new(
            RuleId::MissingResources,
            anchor,
            format!(
                "container '{}': missing both resources.requests and resources.limits",
                container.name
            ),
        )
        .in_container(container),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::kubepolicy::rules::test_support::run;

    #[test]
    fn test_limits_only_is_accepted() {
        let yaml = r#"
kind: Pod
spec:
  containers:
    - name: app
      resources:
        limits:
          cpu: "500m"
"#;
        assert!(run(&rule(), yaml).is_empty());
    }

    #[test]
    fn test_requests_only_is_accepted() {
        let yaml = r#"
kind: Pod
spec:
  containers:
    - name: app
      resources:
        requests:
          memory: 64Mi
"#;
        assert!(run(&rule(), yaml).is_empty());
    }

    #[test]
    fn test_no_resources_key() {
        let yaml = r#"
kind: Pod
spec:
  containers:
    - name: app
      image: nginx:1.25
"#;
        let findings = run(&rule(), yaml);
        assert_eq!(findings.len(), 1);
        assert_eq!((findings[0].0, findings[0].1), (5, 7));
        assert_eq!(
            findings[0].3,
            "container 'app': missing both resources.requests and resources.limits"
        );
    }

    #[test]
    fn test_empty_resources_anchor_on_key() {
        let yaml = r#"
kind: Pod
spec:
  containers:
    - name: app
      resources: {}
    - name: side
      resources:
        requests: {}
"#;
        let findings = run(&rule(), yaml);
        assert_eq!(findings.len(), 2);
        assert_eq!((findings[0].0, findings[0].1), (6, 7));
        assert_eq!((findings[1].0, findings[1].1), (8, 7));
    }

    #[test]
    fn test_ephemeral_containers_skipped() {
        let yaml = r#"
kind: Pod
spec:
  ephemeralContainers:
    - name: debug
"#;
        assert!(run(&rule(), yaml).is_empty());
    }
}
