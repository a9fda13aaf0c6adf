//! dangerous-capability: containers must not add capabilities from a fixed denylist.

use crate::analyzer::kubepolicy::recognize::{ContainerScope, PodScope};
use crate::analyzer::kubepolicy::rules::{
    ContainerRule, Rule, RuleResult, Violation, child_mapping, child_sequence, security_context,
};
use crate::analyzer::kubepolicy::types::RuleId;

pub const DANGEROUS_CAPABILITIES: [&str; 4] =
    ["SYS_ADMIN", "NET_ADMIN", "SYS_PTRACE", "DAC_READ_SEARCH"];

/// Upper-case a capability name and strip a leading `CAP_`.
pub fn normalize_capability(name: &str) -> String {
    let upper = name.trim().to_ascii_uppercase();
    match upper.strip_prefix("CAP_") {
        Some(rest) => rest.to_string(),
        None => upper,
    }
}

pub fn rule() -> impl Rule {
    ContainerRule::new(RuleId::DangerousCapability, check)
}

fn check<'a>(pod: &PodScope<'a>, container: &ContainerScope<'a>) -> RuleResult<'a> {
    let path = container.path(&pod.source_path);
    let Some(sc) = security_context(container.node, &path)? else {
        return Ok(Vec::new());
    };
    let sc_path = format!("{path}.securityContext");
    let Some(capabilities) = child_mapping(sc, "capabilities", &sc_path)? else {
        return Ok(Vec::new());
    };
    let added = child_sequence(capabilities, "add", &format!("{sc_path}.capabilities"))?;

    let violations = added
        .iter()
        .filter_map(|item| item.as_str().map(|name| (item, normalize_capability(name))))
        .filter(|(_, cap)| DANGEROUS_CAPABILITIES.contains(&cap.as_str()))
        .map(|(item, cap)| {
            Violation::new(
                RuleId::DangerousCapability,
                item,
                format!(
                    "container '{}': dangerous capability added: {}",
                    container.name, cap
                ),
            )
            .in_container(container)
        })
        .collect();

    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::kubepolicy::rules::test_support::{run, try_run};

    #[test]
    fn test_one_finding_per_capability() {
        let yaml = r#"
kind: Pod
spec:
  containers:
    - name: app
      securityContext:
        capabilities:
          add:
            - NET_BIND_SERVICE
            - SYS_ADMIN
            - cap_net_admin
"#;
        let findings = run(&rule(), yaml);
        assert_eq!(findings.len(), 2);
        assert_eq!((findings[0].0, findings[0].1), (10, 15));
        assert_eq!(
            findings[0].3,
            "container 'app': dangerous capability added: SYS_ADMIN"
        );
        assert_eq!((findings[1].0, findings[1].1), (11, 15));
        assert!(findings[1].3.ends_with("NET_ADMIN"));
    }

    #[test]
    fn test_flow_sequence() {
        let yaml = r#"
kind: Pod
spec:
  containers:
    - name: app
      securityContext:
        capabilities: {add: [SYS_PTRACE, DAC_READ_SEARCH], drop: [ALL]}
"#;
        assert_eq!(run(&rule(), yaml).len(), 2);
    }

    #[test]
    fn test_drop_is_ignored() {
        let yaml = r#"
kind: Pod
spec:
  containers:
    - name: app
      securityContext:
        capabilities:
          drop: [SYS_ADMIN]
"#;
        assert!(run(&rule(), yaml).is_empty());
    }

    #[test]
    fn test_add_must_be_a_list() {
        let yaml = r#"
kind: Pod
spec:
  containers:
    - name: app
      securityContext:
        capabilities:
          add: SYS_ADMIN
"#;
        let err = try_run(&rule(), yaml).unwrap_err();
        assert_eq!(
            err.to_string(),
            "spec.containers[0].securityContext.capabilities.add: expected a sequence, found a scalar"
        );
    }

    #[test]
    fn test_normalize_capability() {
        assert_eq!(normalize_capability(" cap_sys_admin "), "SYS_ADMIN");
        assert_eq!(normalize_capability("Net_Admin"), "NET_ADMIN");
        assert_eq!(normalize_capability("CAPTURE"), "CAPTURE");
    }
}
