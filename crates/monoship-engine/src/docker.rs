#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    #[error("docker CLI not found, install it from https://docs.docker.com/get-docker/")]
    NotFound { source: std::io::Error },

    #[error("docker command failed ({}): {args:?}\n{stderr}", format_exit(*exit_code))]
    CommandFailed {
        args: Vec<String>,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("docker output was not valid UTF-8")]
    InvalidUtf8 { source: std::string::FromUtf8Error },

    #[error("failed to write to docker stdin")]
    StdinWrite { source: std::io::Error },
}

impl DockerError {
    /// Exit code of a failed command, if it ran at all.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

fn format_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_owned(),
    }
}
