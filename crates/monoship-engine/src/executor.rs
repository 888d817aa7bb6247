use crate::docker::DockerError;

/// Abstraction over docker CLI execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait DockerExecutor: Send + Sync {
    /// Execute a docker command and capture stdout.
    async fn exec(&self, args: &[String]) -> Result<String, DockerError>;

    /// Execute a docker command, streaming output to the terminal.
    async fn exec_streaming(&self, args: &[String]) -> Result<(), DockerError>;

    /// Execute a docker command with data piped to stdin.
    async fn exec_with_stdin(
        &self,
        args: &[String],
        stdin_data: &[u8],
    ) -> Result<String, DockerError>;
}

/// Real docker CLI executor (BuildKit enabled).
pub struct RealExecutor;

impl RealExecutor {
    fn command(args: &[String]) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("docker");
        cmd.args(args).env("DOCKER_BUILDKIT", "1");
        cmd
    }
}

fn finish(args: &[String], output: std::process::Output) -> Result<String, DockerError> {
    if output.status.success() {
        String::from_utf8(output.stdout).map_err(|e| DockerError::InvalidUtf8 { source: e })
    } else {
        Err(DockerError::CommandFailed {
            args: args.to_vec(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

impl DockerExecutor for RealExecutor {
    async fn exec(&self, args: &[String]) -> Result<String, DockerError> {
        use std::process::Stdio;

        tracing::debug!(?args, "docker");
        let output = Self::command(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| DockerError::NotFound { source: e })?;

        finish(args, output)
    }

    async fn exec_streaming(&self, args: &[String]) -> Result<(), DockerError> {
        use std::process::Stdio;

        tracing::debug!(?args, "docker (streaming)");
        let status = Self::command(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| DockerError::NotFound { source: e })?;

        if status.success() {
            Ok(())
        } else {
            Err(DockerError::CommandFailed {
                args: args.to_vec(),
                exit_code: status.code(),
                stdout: String::new(),
                stderr: format!("exit status: {status}"),
            })
        }
    }

    async fn exec_with_stdin(
        &self,
        args: &[String],
        stdin_data: &[u8],
    ) -> Result<String, DockerError> {
        use std::process::Stdio;
        use tokio::io::AsyncWriteExt;

        tracing::debug!(?args, "docker (stdin)");
        let mut child = Self::command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DockerError::NotFound { source: e })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(stdin_data)
                .await
                .map_err(|e| DockerError::StdinWrite { source: e })?;
            stdin
                .shutdown()
                .await
                .map_err(|e| DockerError::StdinWrite { source: e })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| DockerError::NotFound { source: e })?;

        finish(args, output)
    }
}
