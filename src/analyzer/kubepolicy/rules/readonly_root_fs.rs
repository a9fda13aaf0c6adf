//! readonly-root-fs: containers should mount their root filesystem read-only.

use crate::analyzer::kubepolicy::recognize::{ContainerScope, PodScope};
use crate::analyzer::kubepolicy::rules::{
    ContainerRule, Rule, RuleResult, Violation, nearest_key, security_context,
};
use crate::analyzer::kubepolicy::types::RuleId;

pub fn rule() -> impl Rule {
    ContainerRule::new(RuleId::ReadonlyRootFs, check)
}

fn check<'a>(pod: &PodScope<'a>, container: &ContainerScope<'a>) -> RuleResult<'a> {
    let path = container.path(&pod.source_path);
    let read_only = security_context(container.node, &path)?
        .and_then(|sc| sc.get("readOnlyRootFilesystem"))
        .and_then(|v| v.as_bool());

    if read_only == Some(true) {
        return Ok(Vec::new());
    }

    let anchor = nearest_key(container.node, &["securityContext", "readOnlyRootFilesystem"])
        .unwrap_or(container.node);

    Ok(vec![
        Violation::new(
            RuleId::ReadonlyRootFs,
            anchor,
            format!(
                "container '{}': missing readOnlyRootFilesystem: true",
                container.name
            ),
        )
        .in_container(container),
    ])
}
