//! Rule system for kubepolicy.
//!
//! Rules come in two shapes:
//! - pod rules, run once per pod scope
//! - container rules, run once per container of a pod scope
//!
//! Every rule is a plain function wrapped in [`PodRule`] or [`ContainerRule`].
//! The catalog is built once and never mutated.

use std::sync::OnceLock;

use crate::analyzer::kubepolicy::parser::{NodeKind, Position, YamlNode};
use crate::analyzer::kubepolicy::recognize::{ContainerScope, PodScope};
use crate::analyzer::kubepolicy::types::{Finding, RuleId};

pub mod dangerous_capability;
pub mod host_namespaces;
pub mod hostpath_readonly;
pub mod image_tag;
pub mod missing_probe;
pub mod missing_resources;
pub mod privileged;
pub mod readonly_root_fs;
pub mod run_as_non_root;
pub mod seccomp_profile;

/// A rule hit a node whose shape it cannot interpret.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("{path}: expected a {expected}, found a {found}")]
    UnexpectedShape {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

pub type RuleResult<'a> = Result<Vec<Violation<'a>>, RuleError>;

pub type PodCheck = for<'a> fn(&PodScope<'a>) -> RuleResult<'a>;
pub type ContainerCheck = for<'a> fn(&PodScope<'a>, &ContainerScope<'a>) -> RuleResult<'a>;

/// A violation as reported by a rule, still borrowing the document.
#[derive(Debug, Clone)]
pub struct Violation<'a> {
    pub rule: RuleId,
    /// The node the finding points at.
    pub anchor: &'a YamlNode,
    pub message: String,
    pub container: Option<&'a str>,
}

impl<'a> Violation<'a> {
    pub fn new(rule: RuleId, anchor: &'a YamlNode, message: impl Into<String>) -> Self {
        Self {
            rule,
            anchor,
            message: message.into(),
            container: None,
        }
    }

    pub fn in_container(mut self, container: &ContainerScope<'a>) -> Self {
        self.container = Some(container.name);
        self
    }

    pub fn position(&self) -> Position {
        self.anchor.position
    }

    pub fn into_finding(self, file_path: &str, document_index: usize) -> Finding {
        let finding = Finding::new(self.rule, file_path, self.anchor.position, self.message)
            .with_document(document_index);
        match self.container {
            Some(name) => finding.with_container(name),
            None => finding,
        }
    }
}

/// Where a rule runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    Pod,
    Container,
}

/// A policy rule.
pub trait Rule: Send + Sync {
    fn id(&self) -> RuleId;

    fn scope(&self) -> RuleScope;

    /// Check a pod scope. Only called for [`RuleScope::Pod`] rules.
    fn check_pod<'a>(&self, _pod: &PodScope<'a>) -> RuleResult<'a> {
        Ok(Vec::new())
    }

    /// Check one container. Only called for [`RuleScope::Container`] rules.
    fn check_container<'a>(
        &self,
        _pod: &PodScope<'a>,
        _container: &ContainerScope<'a>,
    ) -> RuleResult<'a> {
        Ok(Vec::new())
    }
}

/// A rule evaluated once per pod scope.
pub struct PodRule {
    id: RuleId,
    check_fn: PodCheck,
}

impl PodRule {
    pub fn new(id: RuleId, check_fn: PodCheck) -> Self {
        Self { id, check_fn }
    }
}

impl Rule for PodRule {
    fn id(&self) -> RuleId {
        self.id
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Pod
    }

    fn check_pod<'a>(&self, pod: &PodScope<'a>) -> RuleResult<'a> {
        (self.check_fn)(pod)
    }
}

/// A rule evaluated once per container.
pub struct ContainerRule {
    id: RuleId,
    check_fn: ContainerCheck,
}

impl ContainerRule {
    pub fn new(id: RuleId, check_fn: ContainerCheck) -> Self {
        Self { id, check_fn }
    }
}

impl Rule for ContainerRule {
    fn id(&self) -> RuleId {
        self.id
    }

    fn scope(&self) -> RuleScope {
        RuleScope::Container
    }

    fn check_container<'a>(
        &self,
        pod: &PodScope<'a>,
        container: &ContainerScope<'a>,
    ) -> RuleResult<'a> {
        (self.check_fn)(pod, container)
    }
}

/// The rule catalog.
pub fn all_rules() -> &'static [Box<dyn Rule>] {
    static RULES: OnceLock<Vec<Box<dyn Rule>>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            Box::new(privileged::rule()),
            Box::new(host_namespaces::rule()),
            Box::new(image_tag::rule()),
            Box::new(missing_resources::rule()),
            Box::new(dangerous_capability::rule()),
            Box::new(hostpath_readonly::rule()),
            Box::new(run_as_non_root::rule()),
            Box::new(readonly_root_fs::rule()),
            Box::new(seccomp_profile::rule()),
            Box::new(missing_probe::rule()),
        ]
    })
}

pub(crate) fn shape_name(node: &YamlNode) -> &'static str {
    match node.kind {
        NodeKind::Mapping { .. } => "mapping",
        NodeKind::Sequence { .. } => "sequence",
        NodeKind::Scalar { .. } => "scalar",
    }
}

/// The mapping under `key`, treating an absent or null value as not set.
pub(crate) fn child_mapping<'a>(
    parent: &'a YamlNode,
    key: &str,
    parent_path: &str,
) -> Result<Option<&'a YamlNode>, RuleError> {
    match parent.get(key) {
        None => Ok(None),
        Some(node) if node.is_null() => Ok(None),
        Some(node) if node.is_mapping() => Ok(Some(node)),
        Some(node) => Err(RuleError::UnexpectedShape {
            path: format!("{parent_path}.{key}"),
            expected: "mapping",
            found: shape_name(node),
        }),
    }
}

/// The sequence under `key`, treating an absent or null value as empty.
pub(crate) fn child_sequence<'a>(
    parent: &'a YamlNode,
    key: &str,
    parent_path: &str,
) -> Result<&'a [YamlNode], RuleError> {
    match parent.get(key) {
        None => Ok(&[]),
        Some(node) if node.is_null() => Ok(&[]),
        Some(node) => node.as_sequence().ok_or_else(|| RuleError::UnexpectedShape {
            path: format!("{parent_path}.{key}"),
            expected: "sequence",
            found: shape_name(node),
        }),
    }
}

/// `securityContext` of a pod spec or container.
pub(crate) fn security_context<'a>(
    owner: &'a YamlNode,
    owner_path: &str,
) -> Result<Option<&'a YamlNode>, RuleError> {
    child_mapping(owner, "securityContext", owner_path)
}

/// Key node of the deepest existing key along `path`.
pub(crate) fn nearest_key<'a>(node: &'a YamlNode, path: &[&str]) -> Option<&'a YamlNode> {
    let mut current = node;
    let mut found = None;
    for key in path {
        match current.entry(key) {
            Some((k, v)) => {
                found = Some(k);
                current = v;
            }
            None => break,
        }
    }
    found
}

/// A key's value unless it is null.
pub(crate) fn set_value<'a>(node: &'a YamlNode, key: &str) -> Option<(&'a YamlNode, &'a YamlNode)> {
    node.entry(key).filter(|(_, v)| !v.is_null())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::analyzer::kubepolicy::parser::parse;
    use crate::analyzer::kubepolicy::recognize::recognize;

    /// Run one rule over every scope of a YAML string, returning
    /// `(line, column, container, message)` tuples.
    pub fn run(rule: &dyn Rule, yaml: &str) -> Vec<(u32, u32, Option<String>, String)> {
        try_run(rule, yaml).unwrap()
    }

    pub fn try_run(
        rule: &dyn Rule,
        yaml: &str,
    ) -> Result<Vec<(u32, u32, Option<String>, String)>, RuleError> {
        let docs = parse("test.yaml", yaml).unwrap();
        let mut out = Vec::new();
        for doc in &docs {
            for scope in recognize(doc) {
                let violations = match rule.scope() {
                    RuleScope::Pod => rule.check_pod(&scope)?,
                    RuleScope::Container => {
                        let mut all = Vec::new();
                        for container in &scope.containers {
                            all.extend(rule.check_container(&scope, container)?);
                        }
                        all
                    }
                };
                for v in violations {
                    assert_eq!(v.rule, rule.id());
                    let pos = v.position();
                    out.push((pos.line, pos.column, v.container.map(str::to_string), v.message));
                }
            }
        }
        Ok(out)
    }
}
