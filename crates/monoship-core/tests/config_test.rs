use monoship_core::MonoshipConfig;
use tempfile::TempDir;

#[test]
fn load_returns_defaults_when_no_config_file() {
    let tmp = TempDir::new().unwrap();
    let config = MonoshipConfig::load(tmp.path()).unwrap();

    assert_eq!(config.image.python_version, "3.11");
    assert_eq!(config.image.builder_image(), "python:3.11-slim");
    assert_eq!(config.image.distroless_image, "gcr.io/distroless/python3-debian12");
    assert_eq!(config.image.uv_image, "ghcr.io/astral-sh/uv:latest");
    assert_eq!(config.image.code_dir, "/code");
    assert_eq!(config.image.dev_code_dir, "/src");
    assert_eq!(config.serve.port, 8080);
    assert_eq!(config.serve.host, "0.0.0.0");
    assert_eq!(config.registry.address, "ghcr.io");
    assert_eq!(config.registry.tag, "latest");
    assert!(config.registry.image.is_none());
    assert_eq!(config.registry.credentialed_hosts, vec!["ghcr.io"]);
    assert_eq!(config.registry.dev_address, "ttl.sh");
    assert_eq!(config.gates.test, vec!["pytest"]);
    assert_eq!(config.gates.typecheck, vec!["pyright"]);
    assert_eq!(config.gates.lint, vec!["ruff", "check"]);
    assert!(config.excludes.extra.is_empty());
}

#[test]
fn load_parses_full_config() {
    let tmp = TempDir::new().unwrap();
    let toml = r#"
[image]
python_version = "3.12"
distroless_image = "cgr.dev/chainguard/python:latest"
code_dir = "/app"
entrypoint = ["python", "-m", "uvicorn", "{package}.main:app"]

[image.env]
APP_ENV = "production"

[serve]
port = 9000
host = "127.0.0.1"

[registry]
address = "registry.example.com"
image = "team/service"
tag = "v2"
credentialed_hosts = ["registry.example.com"]

[gates]
test = ["pytest", "-x"]
lint = ["ruff", "check", "--fix"]

[excludes]
extra = ["**/*.log"]
"#;
    std::fs::write(tmp.path().join("monoship.toml"), toml).unwrap();

    let config = MonoshipConfig::load(tmp.path()).unwrap();

    assert_eq!(config.image.builder_image(), "python:3.12-slim");
    assert_eq!(config.image.site_packages(), "/usr/local/lib/python3.12/site-packages");
    assert_eq!(config.image.cache_volume(), "uv-cache-python3.12");
    assert_eq!(config.image.code_dir, "/app");
    assert_eq!(config.image.dev_code_dir, "/src");
    assert_eq!(config.image.env.get("APP_ENV").map(String::as_str), Some("production"));
    assert_eq!(config.serve.port, 9000);
    assert_eq!(config.registry.image.as_deref(), Some("team/service"));
    assert_eq!(config.registry.dev_tag, "20m");
    assert_eq!(config.gates.test, vec!["pytest", "-x"]);
    assert_eq!(config.gates.typecheck, vec!["pyright"]);
    assert_eq!(config.excludes.extra, vec!["**/*.log"]);
}

#[test]
fn explicit_builder_image_wins() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("monoship.toml"),
        "[image]\nbuilder_image = \"python:3.11-bookworm\"\n",
    )
    .unwrap();

    let config = MonoshipConfig::load(tmp.path()).unwrap();
    assert_eq!(config.image.builder_image(), "python:3.11-bookworm");
}

#[test]
fn entrypoint_substitutes_package_and_appends_bind() {
    let config = MonoshipConfig::default();
    assert_eq!(
        config.image.entrypoint_for("app", 8080, "0.0.0.0"),
        vec![
            "python", "-m", "fastapi", "run", "src/app", "--port", "8080", "--host", "0.0.0.0"
        ]
    );
}

#[test]
fn load_rejects_invalid_toml() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("monoship.toml"), "[serve]\nport = \"eighty\"\n").unwrap();

    let err = MonoshipConfig::load(tmp.path()).unwrap_err();
    assert!(err.to_string().contains("failed to parse config"), "got: {err}");
}
