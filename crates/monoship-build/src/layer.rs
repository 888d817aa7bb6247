//! Immutable container layer model.
//!
//! A [`Container`] is a base image plus an ordered list of [`Op`]s. Every
//! `with_*` method consumes the value and returns a new one; a clone taken
//! earlier keeps its own op list, so branching a pipeline never affects
//! the chain it branched from.

use std::collections::BTreeMap;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::excludes::ExcludeSet;

/// Where a single file comes from.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// Path relative to the repository root.
    Host(PathBuf),
    /// Literal file content.
    Inline(String),
    /// A file inside another container's filesystem.
    FromContainer {
        container: Box<Container>,
        path: String,
    },
}

/// Where a directory comes from.
#[derive(Debug, Clone)]
pub enum DirectorySource {
    /// Directory relative to the repository root, filtered by `excludes`.
    Host {
        path: PathBuf,
        excludes: ExcludeSet,
    },
    /// A directory assembled from individual files.
    Inline(Directory),
    /// A subtree of another container's filesystem.
    FromContainer {
        container: Box<Container>,
        path: String,
    },
}

/// A directory built file by file, keyed by relative path.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    files: BTreeMap<String, FileSource>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, source: FileSource) -> Self {
        self.files.insert(path.into(), source);
        self
    }

    pub fn files(&self) -> &BTreeMap<String, FileSource> {
        &self.files
    }
}

/// One layer-producing (or configuration) operation.
#[derive(Debug, Clone)]
pub enum Op {
    File { path: String, source: FileSource },
    Directory { path: String, source: DirectorySource },
    Exec { args: Vec<String> },
    Env { key: String, value: String },
    Workdir(String),
    Entrypoint(Vec<String>),
    ExposedPort(u16),
    /// Persistent cache volume mounted for every later `Exec`.
    MountedCache { path: String, volume: String },
}

/// Credentials used when publishing; never rendered into the image.
#[derive(Debug, Clone)]
pub struct RegistryAuth {
    pub address: String,
    pub username: String,
    pub secret: SecretString,
}

#[derive(Debug, Clone)]
pub struct Container {
    base: String,
    ops: Vec<Op>,
    registry_auth: Option<RegistryAuth>,
}

impl Container {
    /// Start a new container from a base image reference.
    pub fn from_image(image: impl Into<String>) -> Self {
        Self {
            base: image.into(),
            ops: Vec::new(),
            registry_auth: None,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn registry_auth(&self) -> Option<&RegistryAuth> {
        self.registry_auth.as_ref()
    }

    fn push(mut self, op: Op) -> Self {
        tracing::trace!(?op, "layer op");
        self.ops.push(op);
        self
    }

    pub fn with_file(self, path: impl Into<String>, source: FileSource) -> Self {
        self.push(Op::File {
            path: path.into(),
            source,
        })
    }

    pub fn with_directory(self, path: impl Into<String>, source: DirectorySource) -> Self {
        self.push(Op::Directory {
            path: path.into(),
            source,
        })
    }

    /// Reference the subtree at `path` for copying into another container.
    pub fn directory(&self, path: &str) -> DirectorySource {
        DirectorySource::FromContainer {
            container: Box::new(self.clone()),
            path: path.to_owned(),
        }
    }

    pub fn file(&self, path: &str) -> FileSource {
        FileSource::FromContainer {
            container: Box::new(self.clone()),
            path: path.to_owned(),
        }
    }

    pub fn with_exec<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Op::Exec {
            args: args.into_iter().map(Into::into).collect(),
        })
    }

    pub fn with_env_variable(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(Op::Env {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn with_workdir(self, path: impl Into<String>) -> Self {
        self.push(Op::Workdir(path.into()))
    }

    pub fn with_entrypoint<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(Op::Entrypoint(args.into_iter().map(Into::into).collect()))
    }

    pub fn with_exposed_port(self, port: u16) -> Self {
        self.push(Op::ExposedPort(port))
    }

    pub fn with_mounted_cache(self, path: impl Into<String>, volume: impl Into<String>) -> Self {
        self.push(Op::MountedCache {
            path: path.into(),
            volume: volume.into(),
        })
    }

    pub fn with_registry_auth(
        mut self,
        address: impl Into<String>,
        username: impl Into<String>,
        secret: SecretString,
    ) -> Self {
        self.registry_auth = Some(RegistryAuth {
            address: address.into(),
            username: username.into(),
            secret,
        });
        self
    }

    /// Last working directory set, if any.
    pub fn workdir(&self) -> Option<&str> {
        self.ops.iter().rev().find_map(|op| match op {
            Op::Workdir(path) => Some(path.as_str()),
            _ => None,
        })
    }

    pub fn entrypoint(&self) -> Option<&[String]> {
        self.ops.iter().rev().find_map(|op| match op {
            Op::Entrypoint(args) => Some(args.as_slice()),
            _ => None,
        })
    }

    pub fn env(&self, key: &str) -> Option<&str> {
        self.ops.iter().rev().find_map(|op| match op {
            Op::Env { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn exposed_ports(&self) -> Vec<u16> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::ExposedPort(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn execs(&self) -> Vec<&[String]> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Exec { args } => Some(args.as_slice()),
                _ => None,
            })
            .collect()
    }
}
