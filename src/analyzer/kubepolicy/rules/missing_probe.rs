//! missing-probe: containers should define liveness and readiness probes.

use crate::analyzer::kubepolicy::recognize::{ContainerRole, ContainerScope, PodScope};
use crate::analyzer::kubepolicy::rules::{ContainerRule, Rule, RuleResult, Violation};
use crate::analyzer::kubepolicy::types::RuleId;

const PROBES: [&str; 2] = ["livenessProbe", "readinessProbe"];

pub fn rule() -> impl Rule {
    ContainerRule::new(RuleId::MissingProbe, check)
}

fn check<'a>(_pod: &PodScope<'a>, container: &ContainerScope<'a>) -> RuleResult<'a> {
    // Ephemeral containers cannot have probes.
    if container.role == ContainerRole::EphemeralContainer {
        return Ok(Vec::new());
    }

    let mut violations = Vec::new();
    for probe in PROBES {
        let anchor = match container.node.entry(probe) {
            Some((_, value)) if !value.is_blank() => continue,
            Some((key, _)) => key,
            // Readiness sits on the name value so both findings stay distinct.
            None if probe == "readinessProbe" => container.name_value,
            None => container.node,
        };

        violations.push(
            Violation::new(
                RuleId::MissingProbe,
                anchor,
                format!("container '{}': missing {}", container.name, probe),
            )
            .in_container(container),
        );
    }

    Ok(violations)
}
