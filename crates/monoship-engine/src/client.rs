use std::fmt;
use std::path::Path;

use monoship_build::bundle::{self, BundleError};
use monoship_build::{Container, DockerfileGenerator};
use monoship_core::ImageReference;
use secrecy::ExposeSecret;

use crate::docker::DockerError;
use crate::executor::{DockerExecutor, RealExecutor};

/// Local image ID returned by `docker build`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageId(String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Docker operations client, parameterized over the executor for testability.
pub struct DockerClient<E: DockerExecutor = RealExecutor> {
    executor: E,
}

impl DockerClient<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor,
        }
    }
}

impl Default for DockerClient<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DockerExecutor> DockerClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    // ── Build ──

    /// Render `container`, bundle its context into a temp dir, and build it.
    pub async fn build(
        &self,
        container: &Container,
        repo_root: &Path,
    ) -> Result<ImageId, BuildError> {
        let rendered = DockerfileGenerator::new(container).render();

        let tmp = tempfile::Builder::new()
            .prefix("monoship-ctx-")
            .tempdir()
            .map_err(|e| BuildError::TempDir { source: e })?;
        let context = bundle::create_bundle(&tmp.path().join("context"), repo_root, &rendered)?;

        let context_str = context
            .to_str()
            .ok_or_else(|| BuildError::InvalidPath(context.clone()))?;
        let dockerfile = context.join("Dockerfile");
        let dockerfile_str = dockerfile
            .to_str()
            .ok_or_else(|| BuildError::InvalidPath(dockerfile.clone()))?;

        tracing::info!(base = %container.base(), "building image");
        let output = self
            .executor
            .exec(&args(["build", "--quiet", "--file", dockerfile_str, context_str]))
            .await
            .map_err(|e| BuildError::Build { source: e })?;

        let id = output.trim();
        if id.is_empty() {
            return Err(BuildError::NoImageId);
        }

        tracing::info!(image = %id, "image built");
        Ok(ImageId::new(id))
    }

    // ── Run ──

    /// Run `command` in a throwaway container from `image` and capture stdout.
    ///
    /// An empty command runs the image's own entrypoint.
    pub async fn stdout(&self, image: &ImageId, command: &[String]) -> Result<String, DockerError> {
        let mut cmd = args(["run", "--rm"]);
        match command.split_first() {
            Some((program, rest)) => {
                cmd.extend(["--entrypoint".to_owned(), program.clone()]);
                cmd.push(image.to_string());
                cmd.extend(rest.iter().cloned());
            }
            None => cmd.push(image.to_string()),
        }

        self.executor.exec(&cmd).await
    }

    /// Run `image` as a local service, publishing `port` on the host.
    pub async fn serve(&self, image: &ImageId, port: u16) -> Result<(), ServeError> {
        let mapping = format!("{port}:{port}");
        tracing::info!(image = %image, port, "starting service");
        self.executor
            .exec_streaming(&args(["run", "--rm", "--publish", &mapping, image.as_str()]))
            .await
            .map_err(|e| ServeError::Run { source: e })
    }

    // ── Publish ──

    /// Push `image` to `reference`, logging in first if `container`
    /// carries registry auth. Returns the pushed repo digest.
    pub async fn publish(
        &self,
        container: &Container,
        image: &ImageId,
        reference: &ImageReference,
    ) -> Result<String, PublishError> {
        let target = reference.to_string();

        if let Some(auth) = container.registry_auth() {
            tracing::info!(registry = %auth.address, username = %auth.username, "logging in");
            self.executor
                .exec_with_stdin(
                    &args([
                        "login",
                        &auth.address,
                        "--username",
                        &auth.username,
                        "--password-stdin",
                    ]),
                    auth.secret.expose_secret().as_bytes(),
                )
                .await
                .map_err(|e| PublishError::Login {
                    registry: auth.address.clone(),
                    source: e,
                })?;
        }

        self.executor
            .exec(&args(["tag", image.as_str(), &target]))
            .await
            .map_err(|e| PublishError::Push {
                reference: target.clone(),
                source: e,
            })?;

        tracing::info!(reference = %target, "pushing image");
        self.executor
            .exec(&args(["push", "--quiet", &target]))
            .await
            .map_err(|e| PublishError::Push {
                reference: target.clone(),
                source: e,
            })?;

        let digests = self
            .executor
            .exec(&args([
                "image",
                "inspect",
                "--format",
                "{{range .RepoDigests}}{{println .}}{{end}}",
                &target,
            ]))
            .await
            .map_err(|e| PublishError::Digest {
                reference: target.clone(),
                source: e,
            })?;

        repo_digest(&digests, &target)
            .map(str::to_owned)
            .ok_or(PublishError::MissingDigest { reference: target })
    }

    // ── Doctor ──

    /// Run all diagnostic checks without early return.
    pub async fn doctor(&self) -> DoctorReport {
        let mut report = DoctorReport::default();

        match self
            .executor
            .exec(&args(["version", "--format", "{{.Client.Version}}"]))
            .await
        {
            Ok(v) => report.docker = CheckResult::ok(v.trim()),
            Err(e) => report.docker = CheckResult::fail(&e.to_string()),
        }

        match self
            .executor
            .exec(&args(["info", "--format", "{{.ServerVersion}}"]))
            .await
        {
            Ok(v) if !v.trim().is_empty() => report.daemon = CheckResult::ok(v.trim()),
            _ => report.daemon = CheckResult::fail("docker daemon not reachable"),
        }

        match self.executor.exec(&args(["buildx", "version"])).await {
            Ok(v) => {
                let version = v.lines().next().unwrap_or_default().trim();
                report.buildkit = CheckResult::ok(version);
            }
            Err(_) => {
                report.buildkit =
                    CheckResult::fail("buildx not available (cache mounts need BuildKit)")
            }
        }

        report
    }
}

// ── Helper ──

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

/// Pick the `repo@sha256:...` line whose repository is `reference` without
/// its tag. An image pushed to several registries lists one line per repo.
fn repo_digest<'a>(digests: &'a str, reference: &str) -> Option<&'a str> {
    let repository = match reference.rsplit_once(':') {
        Some((repo, tag)) if !tag.contains('/') => repo,
        _ => reference,
    };
    let wanted = normalize_repository(repository);
    digests.lines().map(str::trim).find(|line| {
        line.split_once('@')
            .is_some_and(|(repo, _)| normalize_repository(repo) == wanted)
    })
}

/// Docker Hub repos appear in `RepoDigests` without `docker.io/library/`.
fn normalize_repository(repo: &str) -> String {
    let repo = repo.to_lowercase();
    let repo = repo.strip_prefix("docker.io/").unwrap_or(&repo);
    repo.strip_prefix("library/").unwrap_or(repo).to_owned()
}

// ── Doctor types ──

#[derive(Debug, Default)]
pub struct DoctorReport {
    pub docker: CheckResult,
    pub daemon: CheckResult,
    pub buildkit: CheckResult,
    pub lockfile: CheckResult,
    pub config_file: CheckResult,
}

impl DoctorReport {
    pub fn all_passed(&self) -> bool {
        [
            &self.docker,
            &self.daemon,
            &self.buildkit,
            &self.lockfile,
            &self.config_file,
        ]
        .iter()
        .all(|check| check.passed)
    }
}

impl fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("Docker CLI", &self.docker),
            ("Docker daemon", &self.daemon),
            ("BuildKit", &self.buildkit),
            ("uv.lock", &self.lockfile),
            ("monoship.toml", &self.config_file),
        ];
        for (label, check) in rows {
            writeln!(f, "  [{}] {label:<14} {}", check.icon(), check.detail)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn ok(detail: &str) -> Self {
        Self {
            passed: true,
            detail: detail.to_owned(),
        }
    }

    pub fn fail(detail: &str) -> Self {
        Self {
            passed: false,
            detail: detail.to_owned(),
        }
    }

    pub fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}

// ── Error types ──

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("failed to create temporary build context")]
    TempDir { source: std::io::Error },

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error("build context path is not valid UTF-8: {0}")]
    InvalidPath(std::path::PathBuf),

    #[error("docker build failed")]
    Build { source: DockerError },

    #[error("docker build produced no image ID")]
    NoImageId,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("registry login to {registry} failed")]
    Login {
        registry: String,
        source: DockerError,
    },

    #[error("failed to push {reference}")]
    Push {
        reference: String,
        source: DockerError,
    },

    #[error("pushed {reference} but could not read its digest")]
    Digest {
        reference: String,
        source: DockerError,
    },

    #[error("pushed {reference} but the image lists no digest for that repository")]
    MissingDigest { reference: String },
}


#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("failed to run service container")]
    Run { source: DockerError },
}
