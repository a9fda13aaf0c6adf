//! Patch suggestions.
//!
//! Produces advisory YAML fragments for the rules whose fix is mechanical.
//! Nothing here touches the source file.

use crate::analyzer::kubepolicy::parser::YamlNode;
use crate::analyzer::kubepolicy::recognize::{ContainerScope, PodScope};
use crate::analyzer::kubepolicy::rules::Violation;
use crate::analyzer::kubepolicy::rules::image_tag::ImageReference;
use crate::analyzer::kubepolicy::types::{Patch, PatchMode, RuleId};

const RESOURCES_FRAGMENT: &str = "resources:\n  requests:\n    cpu: \"100m\"\n    memory: \"128Mi\"";

/// Suggest a patch for a violation, if its fix is unambiguous.
pub fn suggest(
    violation: &Violation<'_>,
    pod: &PodScope<'_>,
    container: Option<&ContainerScope<'_>>,
) -> Option<Patch> {
    let container = container?;

    match violation.rule {
        RuleId::ImageTag => pin_image(pod, container),
        RuleId::MissingResources => add_resources(container),
        RuleId::RunAsNonRoot => ensure_field(container, &["securityContext", "runAsNonRoot"], "true"),
        RuleId::ReadonlyRootFs => ensure_field(
            container,
            &["securityContext", "readOnlyRootFilesystem"],
            "true",
        ),
        RuleId::SeccompProfile => ensure_field(
            container,
            &["securityContext", "seccompProfile", "type"],
            "RuntimeDefault",
        ),
        RuleId::ParseError
        | RuleId::Privileged
        | RuleId::HostNamespaces
        | RuleId::DangerousCapability
        | RuleId::HostpathNotReadonly
        | RuleId::MissingProbe => None,
    }
}

/// Reuse a pinned reference to the same repository from elsewhere in the pod.
fn pin_image(pod: &PodScope<'_>, container: &ContainerScope<'_>) -> Option<Patch> {
    let (key, value) = container.node.entry("image")?;
    let repository = ImageReference::parse(value.as_str()?).repository;

    let pinned = pod
        .containers
        .iter()
        .filter_map(|other| other.node.get("image").and_then(YamlNode::as_str))
        .map(str::trim)
        .find(|image| {
            let reference = ImageReference::parse(image);
            reference.repository == repository && reference.is_pinned()
        })?;

    Some(Patch::new(
        key.position,
        PatchMode::ReplaceValue,
        format!("image: {pinned}"),
        indent_of(key),
    ))
}

fn add_resources(container: &ContainerScope<'_>) -> Option<Patch> {
    match container.node.entry("resources") {
        Some((key, value)) if is_replaceable(value) => Some(Patch::new(
            key.position,
            PatchMode::ReplaceValue,
            RESOURCES_FRAGMENT,
            indent_of(key),
        )),
        // `resources: {requests: {}}` and friends keep whatever else they hold.
        Some(_) => None,
        None => insert_into_container(container, RESOURCES_FRAGMENT.to_string()),
    }
}

/// Make `path` (relative to the container) hold `value`.
fn ensure_field(container: &ContainerScope<'_>, path: &[&str], value: &str) -> Option<Patch> {
    let mut parent = container.node;
    let mut depth = 0;
    let mut last_key: Option<&YamlNode> = None;

    while depth < path.len() {
        match parent.entry(path[depth]) {
            Some((key, child)) => {
                last_key = Some(key);
                parent = child;
                depth += 1;
            }
            None => break,
        }
    }

    match last_key {
        None => insert_into_container(container, nest(path, value)),
        Some(key) if depth == path.len() => Some(Patch::new(
            key.position,
            PatchMode::ReplaceValue,
            format!("{}: {}", path[depth - 1], value),
            indent_of(key),
        )),
        Some(key) if is_replaceable(parent) => Some(Patch::new(
            key.position,
            PatchMode::ReplaceValue,
            nest(&path[depth - 1..], value),
            indent_of(key),
        )),
        Some(key) => {
            let first_child = parent.as_mapping()?.first()?;
            if parent.is_flow() {
                return None;
            }
            Some(Patch::new(
                key.position,
                PatchMode::InsertAfterKey,
                nest(&path[depth..], value),
                indent_of(&first_child.0),
            ))
        }
    }
}

/// Insert a fragment as new keys of the container, after its `name`.
fn insert_into_container(container: &ContainerScope<'_>, fragment: String) -> Option<Patch> {
    if container.node.is_flow() {
        return None;
    }
    Some(Patch::new(
        container.name_key.position,
        PatchMode::InsertAfterKey,
        fragment,
        indent_of(container.name_key),
    ))
}

/// A value that can be swapped out wholesale without losing content.
fn is_replaceable(value: &YamlNode) -> bool {
    value.is_null() || value.as_mapping().is_some_and(|entries| entries.is_empty())
}

fn indent_of(key: &YamlNode) -> usize {
    key.position.column as usize - 1
}

/// Build nested block YAML: `a:\n  b: value`.
fn nest(keys: &[&str], value: &str) -> String {
    let last = keys.len().saturating_sub(1);
    keys.iter()
        .enumerate()
        .map(|(depth, key)| {
            let pad = "  ".repeat(depth);
            if depth == last {
                format!("{pad}{key}: {value}")
            } else {
                format!("{pad}{key}:")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
