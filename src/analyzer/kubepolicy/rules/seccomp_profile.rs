//! seccomp-profile: pods or containers should use the `RuntimeDefault` profile.
//!
//! Either level declaring `RuntimeDefault` satisfies the rule; the other
//! level may then hold any profile.

use crate::analyzer::kubepolicy::parser::YamlNode;
use crate::analyzer::kubepolicy::recognize::{ContainerScope, PodScope};
use crate::analyzer::kubepolicy::rules::{
    ContainerRule, Rule, RuleError, RuleResult, Violation, child_mapping, nearest_key,
    security_context, set_value,
};
use crate::analyzer::kubepolicy::types::RuleId;

const RUNTIME_DEFAULT: &str = "RuntimeDefault";
const PROFILE_PATH: [&str; 3] = ["securityContext", "seccompProfile", "type"];

pub fn rule() -> impl Rule {
    ContainerRule::new(RuleId::SeccompProfile, check)
}

/// `securityContext.seccompProfile.type` of a pod spec or container, if set.
fn profile_type<'a>(owner: &'a YamlNode, owner_path: &str) -> Result<Option<&'a YamlNode>, RuleError> {
    let Some(sc) = security_context(owner, owner_path)? else {
        return Ok(None);
    };
    let Some(profile) = child_mapping(sc, "seccompProfile", &format!("{owner_path}.securityContext"))?
    else {
        return Ok(None);
    };
    Ok(set_value(profile, "type").map(|(_, v)| v))
}

fn check<'a>(pod: &PodScope<'a>, container: &ContainerScope<'a>) -> RuleResult<'a> {
    let path = container.path(&pod.source_path);
    let container_type = profile_type(container.node, &path)?;
    let pod_type = profile_type(pod.spec, &pod.source_path)?;

    let is_runtime_default =
        |ty: Option<&YamlNode>| ty.and_then(YamlNode::as_str) == Some(RUNTIME_DEFAULT);
    if is_runtime_default(container_type) || is_runtime_default(pod_type) {
        return Ok(Vec::new());
    }

    let in_container = nearest_key(container.node, &PROFILE_PATH);
    let anchor = if container.node.get_path(&PROFILE_PATH[..2]).is_some() {
        in_container
    } else {
        pod.spec
            .get_path(&PROFILE_PATH[..2])
            .and_then(|_| nearest_key(pod.spec, &PROFILE_PATH))
            .or(in_container)
    };
    let anchor = anchor.unwrap_or(container.node);

    Ok(vec![
        Violation::new(
            RuleId::SeccompProfile,
            anchor,
            format!(
                "container '{}': missing seccompProfile.type: RuntimeDefault (pod or container)",
                container.name
            ),
        )
        .in_container(container),
    ])
}
