//! The three image variants as one parameterized layer pipeline.
//!
//! ```text
//! builder image
//!   ├─ uv binary, uv env, cache volume
//!   ├─ manifests only (uv.lock, pyproject.toml) ── uv sync --no-install-workspace
//!   ├─ closure sources (filtered)
//!   ├─ uv sync --inexact [--no-editable]
//!   └─ workdir, entrypoint, port            ── dev / slim
//!
//! distroless image
//!   └─ code dir + site-packages copied from slim  ── distroless
//! ```
//!
//! Third-party installation only sees the manifests, so editing source
//! code never invalidates it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use monoship_core::{DependencyClosure, MonoshipConfig};

use crate::assemble::{AssembleError, assemble_sources};
use crate::excludes::{ExcludeError, ExcludeSet};
use crate::layer::{Container, Directory, DirectorySource, FileSource};

/// Where the `uv` binary is placed in the builder image.
pub const UV_BIN: &str = "/usr/local/bin/uv";

/// Mount point of the persistent uv download cache.
pub const UV_CACHE_DIR: &str = "/root/.cache/uv";

/// Files making up the dependency-only build context.
pub const MANIFEST_FILES: &[&str] = &["uv.lock", "pyproject.toml"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// Editable installs with tests; used for quality gates and local dev.
    Dev,
    /// Non-editable runtime image on the builder base.
    #[default]
    Slim,
    /// Slim output recomposed onto a shell-less runtime base.
    Distroless,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Dev, Variant::Slim, Variant::Distroless];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Slim => "slim",
            Self::Distroless => "distroless",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" | "editable" => Ok(Self::Dev),
            "slim" => Ok(Self::Slim),
            "distroless" => Ok(Self::Distroless),
            other => Err(format!(
                "unknown variant '{other}' (expected dev, slim, or distroless)"
            )),
        }
    }
}

/// Port and host the application binds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOptions {
    pub port: u16,
    pub host: String,
}

impl ServeOptions {
    pub fn from_config(config: &MonoshipConfig) -> Self {
        Self {
            port: config.serve.port,
            host: config.serve.host.clone(),
        }
    }
}

/// Knobs that distinguish the variants; everything else is shared.
#[derive(Debug, Clone)]
pub struct PipelineTemplate {
    pub base_image: String,
    pub code_dir: String,
    pub excludes: ExcludeSet,
    pub editable: bool,
    /// Recompose the result onto this image, dropping the build toolchain.
    pub strip_onto: Option<String>,
}

impl PipelineTemplate {
    pub fn for_variant(variant: Variant, config: &MonoshipConfig) -> Result<Self, ExcludeError> {
        let extra = &config.excludes.extra;
        let template = match variant {
            Variant::Dev => Self {
                base_image: config.image.builder_image(),
                code_dir: config.image.dev_code_dir.clone(),
                excludes: ExcludeSet::development(extra)?,
                editable: true,
                strip_onto: None,
            },
            Variant::Slim => Self {
                base_image: config.image.builder_image(),
                code_dir: config.image.code_dir.clone(),
                excludes: ExcludeSet::production(extra)?,
                editable: false,
                strip_onto: None,
            },
            Variant::Distroless => Self {
                base_image: config.image.builder_image(),
                code_dir: config.image.code_dir.clone(),
                excludes: ExcludeSet::production(extra)?,
                editable: false,
                strip_onto: Some(config.image.distroless_image.clone()),
            },
        };
        Ok(template)
    }
}

/// Builds layered images for one target package.
pub struct ImageBuilder<'a> {
    config: &'a MonoshipConfig,
    repo_root: &'a Path,
}

impl<'a> ImageBuilder<'a> {
    pub fn new(config: &'a MonoshipConfig, repo_root: &'a Path) -> Self {
        Self { config, repo_root }
    }

    pub fn build(
        &self,
        variant: Variant,
        closure: &DependencyClosure,
        serve: &ServeOptions,
    ) -> Result<Container, PipelineError> {
        let template = PipelineTemplate::for_variant(variant, self.config)?;
        tracing::info!(
            package = %closure.target(),
            variant = %variant,
            members = closure.len(),
            "building image pipeline"
        );
        self.run(&template, closure, serve)
    }

    pub fn run(
        &self,
        template: &PipelineTemplate,
        closure: &DependencyClosure,
        serve: &ServeOptions,
    ) -> Result<Container, PipelineError> {
        let package = closure.target();
        let code_dir = template.code_dir.trim_end_matches('/');
        let package_dir = format!("{code_dir}/{}", closure.target_path().trim_matches('/'));
        let image = &self.config.image;

        // Stable: toolchain and third-party dependencies.
        let uv = Container::from_image(&image.uv_image);
        let mut builder = Container::from_image(&template.base_image)
            .with_file(UV_BIN, uv.file("/uv"))
            .with_env_variable("UV_PROJECT_ENVIRONMENT", "/usr/local/")
            .with_env_variable("UV_PYTHON", "/usr/local/bin/python")
            .with_env_variable("UV_COMPILE_BYTECODE", "1")
            .with_env_variable("UV_LINK_MODE", "copy")
            .with_env_variable("UV_FROZEN", "1");
        for (key, value) in &image.env {
            builder = builder.with_env_variable(key, value);
        }

        let manifests = MANIFEST_FILES.iter().fold(Directory::new(), |dir, name| {
            dir.with_file(*name, FileSource::Host(PathBuf::from(*name)))
        });

        builder = builder
            .with_mounted_cache(UV_CACHE_DIR, image.cache_volume())
            .with_directory(code_dir, DirectorySource::Inline(manifests))
            .with_workdir(code_dir)
            .with_exec(["uv", "sync", "--no-install-workspace", "--package", package]);

        // Fast-changing: first-party sources and the link/install step.
        builder = assemble_sources(
            builder,
            self.repo_root,
            closure,
            &template.excludes,
            code_dir,
        )?;

        let mut install = vec!["uv", "sync", "--inexact"];
        if !template.editable {
            install.push("--no-editable");
        }
        install.extend(["--package", package]);
        builder = builder.with_exec(install);

        let container = match &template.strip_onto {
            None => builder,
            Some(runtime) => {
                let site_packages = image.site_packages();
                tracing::debug!(runtime = %runtime, "recomposing onto runtime image");
                let mut runtime = Container::from_image(runtime)
                    .with_directory(code_dir, builder.directory(code_dir))
                    .with_directory(&site_packages, builder.directory(&site_packages))
                    .with_env_variable("PYTHONPATH", &site_packages);
                for (key, value) in &image.env {
                    runtime = runtime.with_env_variable(key, value);
                }
                runtime
            }
        };

        Ok(container
            .with_workdir(package_dir)
            .with_entrypoint(image.entrypoint_for(package, serve.port, &serve.host))
            .with_exposed_port(serve.port))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Excludes(#[from] ExcludeError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
}
