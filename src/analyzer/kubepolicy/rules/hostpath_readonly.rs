//! hostpath-not-readonly: hostPath volumes must be mounted read-only.

use std::collections::HashSet;

use crate::analyzer::kubepolicy::parser::YamlNode;
use crate::analyzer::kubepolicy::recognize::{ContainerScope, PodScope};
use crate::analyzer::kubepolicy::rules::{ContainerRule, Rule, RuleResult, Violation, child_sequence};
use crate::analyzer::kubepolicy::types::RuleId;

pub fn rule() -> impl Rule {
    ContainerRule::new(RuleId::HostpathNotReadonly, check)
}

fn check<'a>(pod: &PodScope<'a>, container: &ContainerScope<'a>) -> RuleResult<'a> {
    let host_path_volumes: HashSet<&str> = child_sequence(pod.spec, "volumes", &pod.source_path)?
        .iter()
        .filter(|volume| volume.get("hostPath").is_some_and(YamlNode::is_mapping))
        .filter_map(|volume| volume.get("name").and_then(|n| n.as_str()))
        .collect();

    if host_path_volumes.is_empty() {
        return Ok(Vec::new());
    }

    let path = container.path(&pod.source_path);
    let mut violations = Vec::new();

    for mount in child_sequence(container.node, "volumeMounts", &path)? {
        let Some(name) = mount.get("name").and_then(|n| n.as_str()) else {
            continue;
        };
        if !host_path_volumes.contains(name) {
            continue;
        }

        let anchor = match mount.entry("readOnly") {
            Some((_, value)) if value.as_bool() == Some(true) => continue,
            Some((key, _)) => key,
            None => mount,
        };

        violations.push(
            Violation::new(
                RuleId::HostpathNotReadonly,
                anchor,
                format!(
                    "container '{}': hostPath volumeMount '{}' should set readOnly: true",
                    container.name, name
                ),
            )
            .in_container(container),
        );
    }

    Ok(violations)
}
