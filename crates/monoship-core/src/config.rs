use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// File name of the optional configuration at the repository root.
pub const CONFIG_FILE_NAME: &str = "monoship.toml";

/// monoship.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonoshipConfig {
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub serve: ServeConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub gates: GatesConfig,
    #[serde(default)]
    pub excludes: ExcludesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Python minor version shared by the builder and distroless images
    #[serde(default = "default_python_version")]
    pub python_version: String,
    /// Builder image (defaults to `python:{python_version}-slim`)
    pub builder_image: Option<String>,
    /// Shell-less runtime image for the distroless variant
    #[serde(default = "default_distroless_image")]
    pub distroless_image: String,
    /// Image the `uv` binary is copied from
    #[serde(default = "default_uv_image")]
    pub uv_image: String,
    /// Where sources are assembled in runtime images
    #[serde(default = "default_code_dir")]
    pub code_dir: String,
    /// Where sources are assembled in the editable dev image
    #[serde(default = "default_dev_code_dir")]
    pub dev_code_dir: String,
    /// Application command; `{package}` is replaced by the target package.
    /// `--port` and `--host` are appended.
    #[serde(default = "default_entrypoint")]
    pub entrypoint: Vec<String>,
    /// Static environment variables baked into every variant.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry host to publish to
    #[serde(default = "default_registry")]
    pub address: String,
    /// `namespace/repository` image name
    pub image: Option<String>,
    #[serde(default = "default_tag")]
    pub tag: String,
    /// Hosts that receive credentials when publishing
    #[serde(default = "default_credentialed_hosts")]
    pub credentialed_hosts: Vec<String>,
    /// Anonymous, ephemeral destination used by `publish --dev`
    #[serde(default = "default_dev_address")]
    pub dev_address: String,
    #[serde(default = "default_dev_repository")]
    pub dev_repository: String,
    #[serde(default = "default_dev_tag")]
    pub dev_tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatesConfig {
    #[serde(default = "default_test_command")]
    pub test: Vec<String>,
    #[serde(default = "default_typecheck_command")]
    pub typecheck: Vec<String>,
    #[serde(default = "default_lint_command")]
    pub lint: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludesConfig {
    /// Extra glob patterns appended to both development and production sets
    #[serde(default)]
    pub extra: Vec<String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            python_version: default_python_version(),
            builder_image: None,
            distroless_image: default_distroless_image(),
            uv_image: default_uv_image(),
            code_dir: default_code_dir(),
            dev_code_dir: default_dev_code_dir(),
            entrypoint: default_entrypoint(),
            env: BTreeMap::new(),
        }
    }
}

impl ImageConfig {
    pub fn builder_image(&self) -> String {
        self.builder_image
            .clone()
            .unwrap_or_else(|| format!("python:{}-slim", self.python_version))
    }

    /// Third-party package directory inside the builder image.
    pub fn site_packages(&self) -> String {
        format!(
            "/usr/local/lib/python{}/site-packages",
            self.python_version
        )
    }

    /// Cache volume key for downloaded third-party packages.
    pub fn cache_volume(&self) -> String {
        format!("uv-cache-python{}", self.python_version)
    }

    /// Entrypoint for `package` listening on `port`/`host`.
    pub fn entrypoint_for(&self, package: &str, port: u16, host: &str) -> Vec<String> {
        let mut args: Vec<String> = self
            .entrypoint
            .iter()
            .map(|a| a.replace("{package}", package))
            .collect();
        args.extend([
            "--port".to_owned(),
            port.to_string(),
            "--host".to_owned(),
            host.to_owned(),
        ]);
        args
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            address: default_registry(),
            image: None,
            tag: default_tag(),
            credentialed_hosts: default_credentialed_hosts(),
            dev_address: default_dev_address(),
            dev_repository: default_dev_repository(),
            dev_tag: default_dev_tag(),
        }
    }
}

impl Default for GatesConfig {
    fn default() -> Self {
        Self {
            test: default_test_command(),
            typecheck: default_typecheck_command(),
            lint: default_lint_command(),
        }
    }
}

impl MonoshipConfig {
    /// Load from monoship.toml at the given path, or return defaults if not found.
    pub fn load(repo_root: &std::path::Path) -> crate::Result<Self> {
        let config_path = repo_root.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path,
                source: e,
            })
        } else {
            tracing::debug!(path = %config_path.display(), "no config file; using defaults");
            Ok(Self::default())
        }
    }
}

fn default_python_version() -> String {
    // distroless python3-debian12 ships 3.11
    "3.11".to_owned()
}

fn default_distroless_image() -> String {
    "gcr.io/distroless/python3-debian12".to_owned()
}

fn default_uv_image() -> String {
    "ghcr.io/astral-sh/uv:latest".to_owned()
}

fn default_code_dir() -> String {
    "/code".to_owned()
}

fn default_dev_code_dir() -> String {
    "/src".to_owned()
}

fn default_entrypoint() -> Vec<String> {
    ["python", "-m", "fastapi", "run", "src/{package}"]
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}

fn default_port() -> u16 {
    8080
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

fn default_registry() -> String {
    "ghcr.io".to_owned()
}

fn default_tag() -> String {
    "latest".to_owned()
}

fn default_credentialed_hosts() -> Vec<String> {
    vec!["ghcr.io".to_owned()]
}

fn default_dev_address() -> String {
    "ttl.sh".to_owned()
}

fn default_dev_repository() -> String {
    "monoship".to_owned()
}

fn default_dev_tag() -> String {
    "20m".to_owned()
}

fn default_test_command() -> Vec<String> {
    vec!["pytest".to_owned()]
}

fn default_typecheck_command() -> Vec<String> {
    vec!["pyright".to_owned()]
}

fn default_lint_command() -> Vec<String> {
    vec!["ruff".to_owned(), "check".to_owned()]
}
