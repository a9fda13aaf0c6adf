//! Manifest recognition.
//!
//! Finds the pod spec inside each supported workload kind and lists its
//! containers. Unknown kinds and incomplete manifests simply produce no
//! scope; nothing here is an error.

use std::fmt;

use crate::analyzer::kubepolicy::parser::{Document, YamlNode};

/// Workload kinds that embed a pod spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestKind {
    Pod,
    Deployment,
    DaemonSet,
    StatefulSet,
    ReplicaSet,
    Job,
    CronJob,
}

impl ManifestKind {
    /// Match a manifest `kind` (case-insensitive).
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "pod" => Some(Self::Pod),
            "deployment" => Some(Self::Deployment),
            "daemonset" => Some(Self::DaemonSet),
            "statefulset" => Some(Self::StatefulSet),
            "replicaset" => Some(Self::ReplicaSet),
            "job" => Some(Self::Job),
            "cronjob" => Some(Self::CronJob),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pod => "Pod",
            Self::Deployment => "Deployment",
            Self::DaemonSet => "DaemonSet",
            Self::StatefulSet => "StatefulSet",
            Self::ReplicaSet => "ReplicaSet",
            Self::Job => "Job",
            Self::CronJob => "CronJob",
        }
    }

    /// Keys leading from the document root to the pod spec.
    pub fn pod_spec_path(&self) -> &'static [&'static str] {
        match self {
            Self::Pod => &["spec"],
            Self::Deployment | Self::DaemonSet | Self::StatefulSet | Self::ReplicaSet | Self::Job => {
                &["spec", "template", "spec"]
            }
            Self::CronJob => &["spec", "jobTemplate", "spec", "template", "spec"],
        }
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pod spec list a container came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerRole {
    Container,
    InitContainer,
    EphemeralContainer,
}

impl ContainerRole {
    const ALL: [ContainerRole; 3] = [
        ContainerRole::Container,
        ContainerRole::InitContainer,
        ContainerRole::EphemeralContainer,
    ];

    pub fn list_key(&self) -> &'static str {
        match self {
            Self::Container => "containers",
            Self::InitContainer => "initContainers",
            Self::EphemeralContainer => "ephemeralContainers",
        }
    }
}

/// A named container inside a pod spec.
#[derive(Debug, Clone)]
pub struct ContainerScope<'a> {
    pub name: &'a str,
    /// The container mapping.
    pub node: &'a YamlNode,
    /// The `name` key node.
    pub name_key: &'a YamlNode,
    /// The `name` value node.
    pub name_value: &'a YamlNode,
    pub role: ContainerRole,
    /// Index within its list.
    pub index: usize,
}

impl ContainerScope<'_> {
    /// Report path such as `spec.template.spec.initContainers[1]`.
    pub fn path(&self, pod_spec_path: &str) -> String {
        format!("{}.{}[{}]", pod_spec_path, self.role.list_key(), self.index)
    }
}

/// A pod spec and its containers, whatever workload wrapped it.
#[derive(Debug, Clone)]
pub struct PodScope<'a> {
    pub kind: ManifestKind,
    /// Dotted path of the pod spec, e.g. `spec.jobTemplate.spec.template.spec`.
    pub source_path: String,
    pub spec: &'a YamlNode,
    pub containers: Vec<ContainerScope<'a>>,
    pub document_index: usize,
}

/// Recognize the pod scopes of a document.
pub fn recognize(document: &Document) -> Vec<PodScope<'_>> {
    let root = &document.root;

    let Some(kind) = root.get("kind").and_then(YamlNode::as_str).and_then(ManifestKind::parse) else {
        return Vec::new();
    };

    let path = kind.pod_spec_path();
    let Some(spec) = root.get_path(path).filter(|s| s.is_mapping()) else {
        log::debug!(
            "{}[{}]: {} without {}, skipping",
            document.file_path,
            document.index,
            kind,
            path.join(".")
        );
        return Vec::new();
    };

    vec![PodScope {
        kind,
        source_path: path.join("."),
        spec,
        containers: containers_of(spec),
        document_index: document.index,
    }]
}

fn containers_of(spec: &YamlNode) -> Vec<ContainerScope<'_>> {
    let mut containers = Vec::new();

    for role in ContainerRole::ALL {
        let Some(items) = spec.get(role.list_key()).and_then(YamlNode::as_sequence) else {
            continue;
        };

        for (index, node) in items.iter().enumerate() {
            let Some((name_key, name_value)) = node.entry("name") else {
                continue;
            };
            let Some(name) = name_value.as_str().filter(|n| !n.is_empty()) else {
                continue;
            };

            containers.push(ContainerScope {
                name,
                node,
                name_key,
                name_value,
                role,
                index,
            });
        }
    }

    containers
}
