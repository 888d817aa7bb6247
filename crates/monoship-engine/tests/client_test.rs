use mockall::mock;
use monoship_build::Container;
use monoship_core::{GatesConfig, ImageReference};
use monoship_engine::client::{CheckResult, DockerClient, ImageId, PublishError, ServeError};
use monoship_engine::docker::DockerError;
use monoship_engine::executor::DockerExecutor;
use monoship_engine::gates::{Gate, GateError, QualityGateRunner};

mock! {
    Executor {}

    impl DockerExecutor for Executor {
        async fn exec(&self, args: &[String]) -> Result<String, DockerError>;
        async fn exec_streaming(&self, args: &[String]) -> Result<(), DockerError>;
        async fn exec_with_stdin(
            &self,
            args: &[String],
            stdin_data: &[u8],
        ) -> Result<String, DockerError>;
    }
}

fn failed(exit_code: i32, stdout: &str) -> DockerError {
    DockerError::CommandFailed {
        args: vec![],
        exit_code: Some(exit_code),
        stdout: stdout.to_owned(),
        stderr: String::new(),
    }
}

fn not_found() -> DockerError {
    DockerError::NotFound {
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
    }
}

fn image() -> ImageId {
    ImageId::new("sha256:abc123")
}

// ── Run Tests ──

#[tokio::test]
async fn stdout_overrides_entrypoint_with_first_argument() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| {
            *args == ["run", "--rm", "--entrypoint", "pytest", "sha256:abc123", "-q"]
        })
        .times(1)
        .returning(|_| Ok("1 passed\n".to_owned()));

    let client = DockerClient::with_executor(mock);
    let out = client
        .stdout(&image(), &["pytest".to_owned(), "-q".to_owned()])
        .await
        .unwrap();
    assert_eq!(out, "1 passed\n");
}

#[tokio::test]
async fn stdout_without_command_uses_image_entrypoint() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| *args == ["run", "--rm", "sha256:abc123"])
        .times(1)
        .returning(|_| Ok(String::new()));

    let client = DockerClient::with_executor(mock);
    client.stdout(&image(), &[]).await.unwrap();
}

#[tokio::test]
async fn serve_publishes_port() {
    let mut mock = MockExecutor::new();
    mock.expect_exec_streaming()
        .withf(|args| {
            args.contains(&"8080:8080".to_owned())
                && args.last().map(String::as_str) == Some("sha256:abc123")
        })
        .times(1)
        .returning(|_| Ok(()));

    let client = DockerClient::with_executor(mock);
    client.serve(&image(), 8080).await.unwrap();
}

#[tokio::test]
async fn serve_failure_is_reported() {
    let mut mock = MockExecutor::new();
    mock.expect_exec_streaming()
        .returning(|_| Err(failed(125, "")));

    let client = DockerClient::with_executor(mock);
    let err = client.serve(&image(), 8080).await.unwrap_err();
    assert!(matches!(err, ServeError::Run { .. }));
}

// ── Publish Tests ──

#[tokio::test]
async fn publish_with_auth_logs_in_via_stdin() {
    let mut mock = MockExecutor::new();

    mock.expect_exec_with_stdin()
        .withf(|args, stdin| {
            args.contains(&"login".to_owned())
                && args.contains(&"ghcr.io".to_owned())
                && args.contains(&"octocat".to_owned())
                && args.contains(&"--password-stdin".to_owned())
                && *stdin == *b"s3cret"
        })
        .times(1)
        .returning(|_, _| Ok("Login Succeeded\n".to_owned()));

    mock.expect_exec()
        .withf(|args| args[0] == "tag")
        .times(1)
        .returning(|_| Ok(String::new()));

    mock.expect_exec()
        .withf(|args| args[0] == "push" && args.contains(&"ghcr.io/acme/app:v1".to_owned()))
        .times(1)
        .returning(|_| Ok(String::new()));

    mock.expect_exec()
        .withf(|args| args.contains(&"inspect".to_owned()))
        .times(1)
        .returning(|_| {
            Ok("docker.io/acme/app@sha256:aaa\nghcr.io/acme/app@sha256:def\n".to_owned())
        });

    let container = Container::from_image("python:3.11-slim").with_registry_auth(
        "ghcr.io",
        "octocat",
        "s3cret".to_owned().into(),
    );
    let reference = ImageReference::new("ghcr.io", Some("acme"), "app", "v1");

    let client = DockerClient::with_executor(mock);
    let digest = client.publish(&container, &image(), &reference).await.unwrap();
    assert_eq!(digest, "ghcr.io/acme/app@sha256:def");
}

#[tokio::test]
async fn publish_without_auth_skips_login() {
    let mut mock = MockExecutor::new();
    mock.expect_exec_with_stdin().times(0);
    mock.expect_exec()
        .withf(|args| args[0] == "tag" || args[0] == "push")
        .times(2)
        .returning(|_| Ok(String::new()));
    mock.expect_exec()
        .withf(|args| args.contains(&"inspect".to_owned()))
        .returning(|_| Ok("ttl.sh/monoship@sha256:123\n".to_owned()));

    let container = Container::from_image("python:3.11-slim");
    let reference = ImageReference::new("ttl.sh", None, "monoship", "20m");

    let client = DockerClient::with_executor(mock);
    let digest = client.publish(&container, &image(), &reference).await.unwrap();
    assert_eq!(digest, "ttl.sh/monoship@sha256:123");
}

#[tokio::test]
async fn publish_login_failure_stops_before_push() {
    let mut mock = MockExecutor::new();
    mock.expect_exec_with_stdin()
        .returning(|_, _| Err(failed(1, "unauthorized")));
    mock.expect_exec().times(0);

    let container = Container::from_image("python:3.11-slim").with_registry_auth(
        "ghcr.io",
        "octocat",
        "wrong".to_owned().into(),
    );
    let reference = ImageReference::new("ghcr.io", Some("acme"), "app", "v1");

    let client = DockerClient::with_executor(mock);
    let err = client
        .publish(&container, &image(), &reference)
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::Login { ref registry, .. } if registry == "ghcr.io"));
}

#[tokio::test]
async fn publish_fails_when_pushed_repository_has_no_digest() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| args[0] == "tag" || args[0] == "push")
        .times(2)
        .returning(|_| Ok(String::new()));
    mock.expect_exec()
        .withf(|args| args.contains(&"inspect".to_owned()))
        .returning(|_| Ok("ghcr.io/acme/app@sha256:def\n".to_owned()));

    let container = Container::from_image("python:3.11-slim");
    let reference = ImageReference::new("ttl.sh", None, "monoship", "20m");

    let client = DockerClient::with_executor(mock);
    let err = client
        .publish(&container, &image(), &reference)
        .await
        .unwrap_err();
    assert!(
        matches!(err, PublishError::MissingDigest { ref reference } if reference == "ttl.sh/monoship:20m")
    );
}

#[tokio::test]
async fn publish_push_failure() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| args[0] == "tag")
        .returning(|_| Ok(String::new()));
    mock.expect_exec()
        .withf(|args| args[0] == "push")
        .returning(|_| Err(failed(1, "denied")));

    let container = Container::from_image("python:3.11-slim");
    let reference = ImageReference::new("ttl.sh", None, "monoship", "20m");

    let client = DockerClient::with_executor(mock);
    let err = client
        .publish(&container, &image(), &reference)
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::Push { .. }));
}

// ── Doctor Tests ──

#[tokio::test]
async fn doctor_all_checks_pass() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| args[0] == "version")
        .returning(|_| Ok("27.1.1\n".to_owned()));
    mock.expect_exec()
        .withf(|args| args[0] == "info")
        .returning(|_| Ok("27.1.1\n".to_owned()));
    mock.expect_exec()
        .withf(|args| args[0] == "buildx")
        .returning(|_| Ok("github.com/docker/buildx v0.16.1\n".to_owned()));

    let client = DockerClient::with_executor(mock);
    let mut report = client.doctor().await;
    report.lockfile = CheckResult::ok("3 workspace members");
    report.config_file = CheckResult::ok("Found");

    assert!(report.docker.passed);
    assert_eq!(report.docker.detail, "27.1.1");
    assert!(report.daemon.passed);
    assert_eq!(report.buildkit.detail, "github.com/docker/buildx v0.16.1");
    assert!(report.all_passed());
}

#[tokio::test]
async fn doctor_reports_every_failure() {
    let mut mock = MockExecutor::new();
    mock.expect_exec().returning(|_| Err(not_found()));

    let client = DockerClient::with_executor(mock);
    let report = client.doctor().await;

    assert!(!report.docker.passed);
    assert!(!report.daemon.passed);
    assert!(!report.buildkit.passed);
    assert!(!report.all_passed());
    assert!(report.to_string().contains("[NG] Docker CLI"));
}

// ── Quality Gate Tests ──

fn gate_mock(failing: Option<&'static str>) -> MockExecutor {
    let mut mock = MockExecutor::new();
    mock.expect_exec().returning(move |args| {
        let program = args[3].clone();
        if Some(program.as_str()) == failing {
            Err(failed(1, &format!("{program} found problems")))
        } else {
            Ok(format!("{program} ok"))
        }
    });
    mock
}

#[tokio::test]
async fn run_gates_collects_all_outputs() {
    let client = DockerClient::with_executor(gate_mock(None));
    let config = GatesConfig::default();
    let outputs = QualityGateRunner::new(&client, &config)
        .run_gates(&image())
        .await
        .unwrap();

    assert_eq!(outputs.test, "pytest ok");
    assert_eq!(outputs.typecheck, "pyright ok");
    assert_eq!(outputs.lint, "ruff ok");
}

#[tokio::test]
async fn run_gates_aborts_on_first_failure() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| args[3] == "pytest")
        .returning(|_| Ok("ok".to_owned()));
    mock.expect_exec()
        .withf(|args| args[3] == "pyright")
        .returning(|_| Err(failed(1, "2 errors")));
    mock.expect_exec()
        .withf(|args| args[3] == "ruff")
        .times(0);

    let client = DockerClient::with_executor(mock);
    let config = GatesConfig::default();
    let err = QualityGateRunner::new(&client, &config)
        .run_gates(&image())
        .await
        .unwrap_err();

    match err {
        GateError::GateFailed {
            gate,
            exit_code,
            output,
        } => {
            assert_eq!(gate, Gate::Typecheck);
            assert_eq!(exit_code, Some(1));
            assert_eq!(output, "2 errors");
        }
        other => panic!("expected GateFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn verify_runs_every_gate_despite_failures() {
    let client = DockerClient::with_executor(gate_mock(Some("pytest")));
    let config = GatesConfig::default();
    let report = QualityGateRunner::new(&client, &config)
        .verify(&image())
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 3);
    assert!(!report.all_passed());
    let failed: Vec<_> = report.failed().map(|o| o.gate).collect();
    assert_eq!(failed, vec![Gate::Test]);

    let text = report.to_string();
    assert!(text.contains("Pytest:\npytest found problems"));
    assert!(text.contains("Pyright:\npyright ok"));
    assert!(text.contains("Ruff:\nruff ok"));
}

#[tokio::test]
async fn verify_propagates_engine_errors() {
    let mut mock = MockExecutor::new();
    mock.expect_exec().returning(|_| Err(not_found()));

    let client = DockerClient::with_executor(mock);
    let config = GatesConfig::default();
    let err = QualityGateRunner::new(&client, &config)
        .verify(&image())
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::Engine { gate: Gate::Test, .. }));
}

#[tokio::test]
async fn verify_treats_docker_run_errors_as_engine_failures() {
    let mut mock = MockExecutor::new();
    mock.expect_exec().times(1).returning(|_| {
        Err(DockerError::CommandFailed {
            args: vec![],
            exit_code: Some(125),
            stdout: String::new(),
            stderr: "docker: Error response from daemon: No such image".to_owned(),
        })
    });

    let client = DockerClient::with_executor(mock);
    let config = GatesConfig::default();
    let err = QualityGateRunner::new(&client, &config)
        .verify(&image())
        .await
        .unwrap_err();

    match err {
        GateError::Engine { gate, source } => {
            assert_eq!(gate, Gate::Test);
            assert!(source.to_string().contains("No such image"));
        }
        other => panic!("expected Engine, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_gate_output_includes_stderr() {
    let mut mock = MockExecutor::new();
    mock.expect_exec()
        .withf(|args| args[3] == "pytest")
        .returning(|_| {
            Err(DockerError::CommandFailed {
                args: vec![],
                exit_code: Some(2),
                stdout: "collected 0 items\n".to_owned(),
                stderr: "ERROR: file or directory not found: tests\n".to_owned(),
            })
        });
    mock.expect_exec().returning(|_| Ok("ok".to_owned()));

    let client = DockerClient::with_executor(mock);
    let config = GatesConfig::default();
    let report = QualityGateRunner::new(&client, &config)
        .verify(&image())
        .await
        .unwrap();

    let pytest = &report.outcomes[0];
    assert_eq!(pytest.exit_code, Some(2));
    assert_eq!(
        pytest.output,
        "collected 0 items\nERROR: file or directory not found: tests"
    );
}
