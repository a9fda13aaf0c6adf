//! host-namespaces: pods must not share the host network, PID or IPC namespace.

use crate::analyzer::kubepolicy::recognize::PodScope;
use crate::analyzer::kubepolicy::rules::{PodRule, Rule, RuleResult, Violation};
use crate::analyzer::kubepolicy::types::RuleId;

const HOST_NAMESPACE_FIELDS: [&str; 3] = ["hostNetwork", "hostPID", "hostIPC"];

pub fn rule() -> impl Rule {
    PodRule::new(RuleId::HostNamespaces, check)
}

fn check<'a>(pod: &PodScope<'a>) -> RuleResult<'a> {
    let violations = HOST_NAMESPACE_FIELDS
        .iter()
        .filter_map(|field| pod.spec.entry(field).map(|(key, value)| (field, key, value)))
        .filter(|(_, _, value)| value.as_bool() == Some(true))
        .map(|(field, key, _)| Violation::new(RuleId::HostNamespaces, key, format!("{field} is true")))
        .collect();

    Ok(violations)
}
