//! image-tag: images must be pinned to a tag other than `latest` or to a digest.

use crate::analyzer::kubepolicy::recognize::{ContainerScope, PodScope};
use crate::analyzer::kubepolicy::rules::{ContainerRule, Rule, RuleResult, Violation};
use crate::analyzer::kubepolicy::types::RuleId;

/// The parts of an image reference that matter for pinning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageReference<'s> {
    /// Everything before the tag and digest, registry included.
    pub repository: &'s str,
    pub tag: Option<&'s str>,
    pub digest: Option<&'s str>,
}

impl<'s> ImageReference<'s> {
    pub fn parse(image: &'s str) -> Self {
        let image = image.trim();
        let (name, digest) = match image.split_once('@') {
            Some((name, digest)) => (name, Some(digest)),
            None => (image, None),
        };

        // A ':' before the last '/' is a registry port, not a tag.
        let last_segment_start = name.rfind('/').map_or(0, |i| i + 1);
        let (repository, tag) = match name[last_segment_start..].rfind(':') {
            Some(i) => {
                let split = last_segment_start + i;
                (&name[..split], Some(&name[split + 1..]))
            }
            None => (name, None),
        };

        Self {
            repository,
            tag: tag.filter(|t| !t.is_empty()),
            digest,
        }
    }

    /// A digest always pins; otherwise any tag but `latest` does.
    pub fn is_pinned(&self) -> bool {
        self.digest.is_some() || self.tag.is_some_and(|t| t != "latest")
    }
}

pub fn rule() -> impl Rule {
    ContainerRule::new(RuleId::ImageTag, check)
}

fn check<'a>(_pod: &PodScope<'a>, container: &ContainerScope<'a>) -> RuleResult<'a> {
    let Some((key, value)) = container.node.entry("image") else {
        return Ok(Vec::new());
    };
    let Some(image) = value.as_str().filter(|i| !i.trim().is_empty()) else {
        return Ok(Vec::new());
    };

    if ImageReference::parse(image).is_pinned() {
        return Ok(Vec::new());
    }

    Ok(vec![
        Violation::new(
            RuleId::ImageTag,
            key,
            format!(
                "container '{}': image '{}' uses 'latest' or has no tag",
                container.name, image
            ),
        )
        .in_container(container),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::kubepolicy::rules::test_support::run;
    use proptest::prelude::*;

    fn pod_with_image(image: &str) -> String {
        format!("kind: Pod\nspec:\n  containers:\n    - name: app\n      image: {image}\n")
    }

    #[test]
    fn test_image_classification() {
        assert_eq!(run(&rule(), &pod_with_image("nginx")).len(), 1);
        assert_eq!(run(&rule(), &pod_with_image("nginx:latest")).len(), 1);
        assert!(run(&rule(), &pod_with_image("nginx:1.25")).is_empty());
        assert!(run(&rule(), &pod_with_image("nginx@sha256:abc123")).is_empty());
        assert!(run(&rule(), &pod_with_image("nginx:latest@sha256:abc123")).is_empty());
    }

    #[test]
    fn test_registry_port_is_not_a_tag() {
        assert_eq!(run(&rule(), &pod_with_image("registry.local:5000/team/app")).len(), 1);
        assert!(run(&rule(), &pod_with_image("registry.local:5000/team/app:2.0")).is_empty());
    }

    #[test]
    fn test_finding_anchored_on_image_key() {
        let findings = run(&rule(), &pod_with_image("redis"));
        assert_eq!((findings[0].0, findings[0].1), (5, 7));
        assert_eq!(
            findings[0].3,
            "container 'app': image 'redis' uses 'latest' or has no tag"
        );
    }

    #[test]
    fn test_missing_or_non_string_image_ignored() {
        let yaml = "kind: Pod\nspec:\n  containers:\n    - name: a\n    - name: b\n      image: 5\n    - name: c\n      image: \"\"\n";
        assert!(run(&rule(), yaml).is_empty());
    }

    #[test]
    fn test_parse_reference() {
        let r = ImageReference::parse("ghcr.io/org/app:1.2@sha256:ff");
        assert_eq!(r.repository, "ghcr.io/org/app");
        assert_eq!(r.tag, Some("1.2"));
        assert_eq!(r.digest, Some("sha256:ff"));

        let r = ImageReference::parse("nginx:");
        assert_eq!(r.repository, "nginx");
        assert_eq!(r.tag, None);
        assert!(!r.is_pinned());
    }

    proptest! {
        #[test]
        fn digest_always_pins(
            repo in "[a-z][a-z0-9]{0,10}(/[a-z][a-z0-9]{0,8}){0,2}",
            tag in proptest::option::of("[a-z0-9.]{1,8}"),
            hex in "[0-9a-f]{8,64}",
        ) {
            let image = match tag {
                Some(t) => format!("{repo}:{t}@sha256:{hex}"),
                None => format!("{repo}@sha256:{hex}"),
            };
            prop_assert!(ImageReference::parse(&image).is_pinned());
        }

        #[test]
        fn untagged_is_never_pinned(repo in "[a-z][a-z0-9]{0,10}(/[a-z][a-z0-9]{0,8}){0,2}") {
            let r = ImageReference::parse(&repo);
            prop_assert_eq!(r.repository, repo.as_str());
            prop_assert!(!r.is_pinned());
        }
    }
}
