mod build;
mod doctor;
mod gates;
mod plan;
mod publish;
mod serve;

use std::path::{Path, PathBuf};

use monoship_build::{Container, ImageBuilder, ServeOptions, Variant};
use monoship_core::{DependencyClosure, LockfileDocument, MonoshipConfig};

pub use build::build;
pub use doctor::doctor;
pub use gates::{gate, verify};
pub use plan::plan;
pub use publish::{PublishArgs, publish};
pub use serve::serve;

/// A target package resolved against its repository.
pub(crate) struct Project {
    pub root: PathBuf,
    pub config: MonoshipConfig,
    pub closure: DependencyClosure,
}

impl Project {
    pub fn load(root: &Path, package: &str) -> anyhow::Result<Self> {
        let config = MonoshipConfig::load(root)?;
        let lockfile = LockfileDocument::load(root)?;
        let closure = lockfile.closure(package)?;

        tracing::debug!(
            package,
            members = ?closure.members().keys().collect::<Vec<_>>(),
            "resolved local dependency closure"
        );

        Ok(Self {
            root: root.to_path_buf(),
            config,
            closure,
        })
    }

    /// Serve options from config, overridden by any flags given.
    pub fn serve_options(&self, port: Option<u16>, host: Option<String>) -> ServeOptions {
        let defaults = ServeOptions::from_config(&self.config);
        ServeOptions {
            port: port.unwrap_or(defaults.port),
            host: host.unwrap_or(defaults.host),
        }
    }

    pub fn container(&self, variant: Variant, serve: &ServeOptions) -> anyhow::Result<Container> {
        let builder = ImageBuilder::new(&self.config, &self.root);
        Ok(builder.build(variant, &self.closure, serve)?)
    }
}
