//! `uv.lock` parsing and local dependency closure resolution.
//!
//! Only packages listed under `[manifest].members` are local. Every other
//! name reachable through `dependencies` is third-party and is never
//! expanded, even if its record looks like a local one.
//!
//! ```text
//! [manifest]
//! members = ["app", "lib1"]
//!
//! [[package]]
//! name = "app"
//! source = { editable = "projects/app" }
//! dependencies = [{ name = "lib1" }, { name = "fastapi" }]
//! ```

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// File name of the lockfile at the repository root.
pub const LOCKFILE_NAME: &str = "uv.lock";

/// A single dependency edge of a [`PackageRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyRef {
    /// Edge naming another package (local or third-party).
    Named(String),
    /// Entry without a usable name; never matches a workspace member.
    Opaque,
}

impl DependencyRef {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Opaque => None,
        }
    }
}

/// One `[[package]]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    pub dependencies: Vec<DependencyRef>,
    /// `source.editable`, present only for path-based (in-repo) packages.
    pub source_path: Option<String>,
}

/// Parsed lockfile: workspace boundary plus package records in file order.
#[derive(Debug, Clone, Default)]
pub struct LockfileDocument {
    pub workspace_members: BTreeSet<String>,
    pub packages: Vec<PackageRecord>,
}

#[derive(Deserialize)]
struct RawLockfile {
    #[serde(default)]
    manifest: RawManifest,
    #[serde(default)]
    package: Vec<RawPackage>,
}

#[derive(Deserialize, Default)]
struct RawManifest {
    #[serde(default)]
    members: Vec<String>,
}

#[derive(Deserialize)]
struct RawPackage {
    name: String,
    #[serde(default)]
    dependencies: Vec<RawDependency>,
    source: Option<RawSource>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDependency {
    Named { name: String },
    Opaque(toml::Value),
}

#[derive(Deserialize)]
struct RawSource {
    editable: Option<String>,
}

impl LockfileDocument {
    /// Parse raw lockfile bytes.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedLockfile`](crate::Error::MalformedLockfile) if the
    /// bytes are not UTF-8 TOML of the expected shape.
    pub fn parse(bytes: &[u8]) -> crate::Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|e| crate::Error::MalformedLockfile {
            detail: format!("not valid UTF-8: {e}"),
        })?;

        let raw: RawLockfile =
            toml::from_str(text).map_err(|e| crate::Error::MalformedLockfile {
                detail: e.to_string(),
            })?;

        let packages = raw
            .package
            .into_iter()
            .map(|p| PackageRecord {
                name: p.name,
                dependencies: p
                    .dependencies
                    .into_iter()
                    .map(|d| match d {
                        RawDependency::Named { name } => DependencyRef::Named(name),
                        RawDependency::Opaque(_) => DependencyRef::Opaque,
                    })
                    .collect(),
                source_path: p.source.and_then(|s| s.editable),
            })
            .collect();

        Ok(Self {
            workspace_members: raw.manifest.members.into_iter().collect(),
            packages,
        })
    }

    /// Read and parse `uv.lock` from the repository root.
    pub fn load(repo_root: &Path) -> crate::Result<Self> {
        let path = repo_root.join(LOCKFILE_NAME);
        let bytes = std::fs::read(&path).map_err(|e| crate::Error::LockfileRead {
            path: path.clone(),
            source: e,
        })?;
        Self::parse(&bytes)
    }

    pub fn is_member(&self, name: &str) -> bool {
        self.workspace_members.contains(name)
    }

    /// Compute the set of workspace packages needed to build `target`.
    ///
    /// Depth-first over local-to-local edges with an explicit visited set,
    /// so cycles among local packages terminate.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownPackage`](crate::Error::UnknownPackage) if `target` is not a workspace member
    /// - [`Error::InconsistentLockfile`](crate::Error::InconsistentLockfile) if a reached member has no record
    /// - [`Error::MissingSourcePath`](crate::Error::MissingSourcePath) if a reached member has no editable source
    pub fn closure(&self, target: &str) -> crate::Result<DependencyClosure> {
        if !self.is_member(target) {
            return Err(crate::Error::UnknownPackage {
                package: target.to_owned(),
                workspace_members: self.workspace_members.iter().cloned().collect(),
            });
        }

        let mut visited = BTreeSet::from([target.to_owned()]);
        let mut stack = vec![target.to_owned()];

        while let Some(current) = stack.pop() {
            let mut records = self.packages.iter().filter(|p| p.name == current).peekable();
            if records.peek().is_none() {
                return Err(crate::Error::InconsistentLockfile { package: current });
            }

            for record in records {
                for dep in record.dependencies.iter().filter_map(DependencyRef::name) {
                    if self.is_member(dep) && visited.insert(dep.to_owned()) {
                        tracing::debug!(from = %current, to = %dep, "local dependency edge");
                        stack.push(dep.to_owned());
                    }
                }
            }
        }

        let mut members = BTreeMap::new();
        for record in self.packages.iter().filter(|p| visited.contains(&p.name)) {
            let path = record
                .source_path
                .clone()
                .ok_or_else(|| crate::Error::MissingSourcePath {
                    package: record.name.clone(),
                })?;
            members.insert(record.name.clone(), path);
        }

        tracing::debug!(
            target = %target,
            members = members.len(),
            "dependency closure resolved"
        );

        Ok(DependencyClosure {
            target: target.to_owned(),
            members,
        })
    }
}

/// Parse lockfile bytes and resolve `target`'s local closure in one step.
pub fn resolve_closure(lockfile: &[u8], target: &str) -> crate::Result<DependencyClosure> {
    LockfileDocument::parse(lockfile)?.closure(target)
}

/// Workspace packages needed to build one target, keyed by name.
///
/// Iteration is sorted by package name so layer order is reproducible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyClosure {
    target: String,
    members: BTreeMap<String, String>,
}

impl DependencyClosure {
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Relative source path of the target package.
    pub fn target_path(&self) -> &str {
        // Construction always inserts the target; an empty path is unreachable.
        self.members
            .get(&self.target)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn source_path(&self, package: &str) -> Option<&str> {
        self.members.get(package).map(String::as_str)
    }

    pub fn contains(&self, package: &str) -> bool {
        self.members.contains_key(package)
    }

    pub fn members(&self) -> &BTreeMap<String, String> {
        &self.members
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.members.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1
requires-python = ">=3.11"

[manifest]
members = ["app", "lib1", "lib2"]

[[package]]
name = "app"
version = "0.1.0"
source = { editable = "projects/app" }
dependencies = [
    { name = "fastapi" },
    { name = "lib1" },
]

[[package]]
name = "lib1"
version = "0.1.0"
source = { editable = "projects/lib1" }
dependencies = [
    { name = "requests" },
]

[[package]]
name = "lib2"
version = "0.1.0"
source = { editable = "projects/lib2" }

[[package]]
name = "fastapi"
version = "0.115.0"
source = { registry = "https://pypi.org/simple" }

[[package]]
name = "requests"
version = "2.32.3"
source = { registry = "https://pypi.org/simple" }
"#;

    #[test]
    fn parse_reads_members_and_records() {
        let doc = LockfileDocument::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(doc.workspace_members.len(), 3);
        assert_eq!(doc.packages.len(), 5);
        assert_eq!(doc.packages[0].source_path.as_deref(), Some("projects/app"));
        assert_eq!(doc.packages[3].source_path, None);
        assert_eq!(
            doc.packages[0].dependencies,
            vec![
                DependencyRef::Named("fastapi".to_owned()),
                DependencyRef::Named("lib1".to_owned())
            ]
        );
    }

    #[test]
    fn closure_excludes_third_party_and_unreached_members() {
        let closure = resolve_closure(SAMPLE.as_bytes(), "app").unwrap();
        let names: Vec<&str> = closure.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["app", "lib1"]);
        assert_eq!(closure.target_path(), "projects/app");
        assert!(!closure.contains("requests"));
        assert!(!closure.contains("lib2"));
    }

    #[test]
    fn closure_of_leaf_is_itself() {
        let closure = resolve_closure(SAMPLE.as_bytes(), "lib2").unwrap();
        assert_eq!(closure.len(), 1);
        assert_eq!(closure.source_path("lib2"), Some("projects/lib2"));
    }

    #[test]
    fn opaque_dependency_entries_are_ignored() {
        let lock = r#"
[manifest]
members = ["a"]

[[package]]
name = "a"
source = { editable = "a" }
dependencies = ["lib1", 42]
"#;
        let doc = LockfileDocument::parse(lock.as_bytes()).unwrap();
        assert_eq!(
            doc.packages[0].dependencies,
            vec![DependencyRef::Opaque, DependencyRef::Opaque]
        );
        assert_eq!(doc.closure("a").unwrap().len(), 1);
    }

    #[test]
    fn unknown_target_errors() {
        let err = resolve_closure(SAMPLE.as_bytes(), "requests").unwrap_err();
        assert!(matches!(err, crate::Error::UnknownPackage { .. }));
        assert!(err.to_string().contains("app, lib1, lib2"), "got: {err}");
    }

    #[test]
    fn malformed_bytes_error() {
        let err = resolve_closure(b"[[package]\nname = ", "app").unwrap_err();
        assert!(matches!(err, crate::Error::MalformedLockfile { .. }));

        let err = resolve_closure(&[0xff, 0xfe, 0x00], "app").unwrap_err();
        assert!(matches!(err, crate::Error::MalformedLockfile { .. }));
    }
}
