use std::fmt;

/// A fully-qualified container image destination.
///
/// Rendered as `registry[/namespace]/repository:tag`, lowercased.
///
/// # Examples
///
/// ```
/// use monoship_core::ImageReference;
///
/// let r = ImageReference::new("GHCR.io", Some("ns"), "Repo", "V1");
/// assert_eq!(r.to_string(), "ghcr.io/ns/repo:v1");
///
/// let anon = ImageReference::new("ttl.sh", None, "anon-image", "20m");
/// assert_eq!(anon.to_string(), "ttl.sh/anon-image:20m");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry: String,
    pub namespace: Option<String>,
    pub repository: String,
    pub tag: String,
}

impl ImageReference {
    pub fn new(registry: &str, namespace: Option<&str>, repository: &str, tag: &str) -> Self {
        Self {
            registry: registry.to_owned(),
            namespace: namespace.map(str::to_owned),
            repository: repository.to_owned(),
            tag: tag.to_owned(),
        }
    }

    /// Build a reference from an `namespace/repository` image name.
    ///
    /// A name without `/` has no namespace. With several `/`, the last
    /// segment is the repository and the rest is the namespace.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidImageName`](crate::Error::InvalidImageName) if the
    /// name or any of its segments is empty.
    pub fn from_image_name(registry: &str, image: &str, tag: &str) -> crate::Result<Self> {
        let invalid = |reason| crate::Error::InvalidImageName {
            name: image.to_owned(),
            reason,
        };

        if image.trim().is_empty() {
            return Err(invalid("image name is empty"));
        }
        if image.split('/').any(str::is_empty) {
            return Err(invalid("image name has an empty path segment"));
        }

        let (namespace, repository) = match image.rsplit_once('/') {
            Some((ns, repo)) => (Some(ns), repo),
            None => (None, image),
        };

        Ok(Self::new(registry, namespace, repository, tag))
    }

    /// Registry host, lowercased, used for credential matching.
    pub fn registry_host(&self) -> String {
        self.registry.to_lowercase()
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = [
            Some(self.registry.as_str()),
            self.namespace.as_deref(),
            Some(self.repository.as_str()),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

        write!(f, "{}:{}", path.to_lowercase(), self.tag.to_lowercase())
    }
}

/// Render `{registry, namespace?, repository, tag}` as a normalized reference string.
pub fn reference(registry: &str, namespace: Option<&str>, repository: &str, tag: &str) -> String {
    ImageReference::new(registry, namespace, repository, tag).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_is_lowercased_and_joined() {
        assert_eq!(
            reference("GHCR.io", Some("ns"), "Repo", "V1"),
            "ghcr.io/ns/repo:v1"
        );
    }

    #[test]
    fn absent_namespace_is_omitted() {
        assert_eq!(
            reference("ttl.sh", None, "anon-image", "20m"),
            "ttl.sh/anon-image:20m"
        );
    }

    #[test]
    fn empty_namespace_is_omitted() {
        assert_eq!(reference("ttl.sh", Some(""), "img", "x"), "ttl.sh/img:x");
    }

    #[test]
    fn from_image_name_splits_namespace() {
        let r = ImageReference::from_image_name("ghcr.io", "Sessional/Python-Monorepo", "abc").unwrap();
        assert_eq!(r.namespace.as_deref(), Some("Sessional"));
        assert_eq!(r.repository, "Python-Monorepo");
        assert_eq!(r.to_string(), "ghcr.io/sessional/python-monorepo:abc");
    }

    #[test]
    fn from_image_name_without_namespace() {
        let r = ImageReference::from_image_name("ttl.sh", "solo", "1h").unwrap();
        assert_eq!(r.namespace, None);
        assert_eq!(r.to_string(), "ttl.sh/solo:1h");
    }

    #[test]
    fn from_image_name_nested_namespace() {
        let r = ImageReference::from_image_name("registry.example.com", "a/b/c", "t").unwrap();
        assert_eq!(r.namespace.as_deref(), Some("a/b"));
        assert_eq!(r.repository, "c");
    }

    #[test]
    fn from_image_name_rejects_empty_segments() {
        assert!(ImageReference::from_image_name("ghcr.io", "", "t").is_err());
        assert!(ImageReference::from_image_name("ghcr.io", "ns/", "t").is_err());
        assert!(ImageReference::from_image_name("ghcr.io", "/repo", "t").is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn rendered_reference_is_lowercase(
                registry in "[A-Za-z0-9.]{1,20}",
                ns in proptest::option::of("[A-Za-z0-9_-]{0,12}"),
                repo in "[A-Za-z0-9_-]{1,20}",
                tag in "[A-Za-z0-9._-]{1,10}",
            ) {
                let r = reference(&registry, ns.as_deref(), &repo, &tag);
                prop_assert_eq!(r.clone(), r.to_lowercase());
                prop_assert!(!r.contains("//"));
                let expected_suffix = format!(":{}", tag.to_lowercase());
                prop_assert!(r.ends_with(&expected_suffix));
            }
        }
    }
}
