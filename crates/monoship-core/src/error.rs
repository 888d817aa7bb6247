use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── Lockfile ──
    #[error("failed to read lockfile {path}")]
    LockfileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed lockfile: {detail}")]
    MalformedLockfile { detail: String },

    #[error(
        "package '{package}' is not a workspace member; workspace members: {}",
        format_members(workspace_members)
    )]
    UnknownPackage {
        package: String,
        workspace_members: Vec<String>,
    },

    #[error("inconsistent lockfile: package '{package}' is referenced but has no [[package]] entry")]
    InconsistentLockfile { package: String },

    #[error("workspace member '{package}' has no editable source path in the lockfile")]
    MissingSourcePath { package: String },

    // ── Image references ──
    #[error("invalid image name {name:?}: {reason}")]
    InvalidImageName { name: String, reason: &'static str },
}

fn format_members(members: &[String]) -> String {
    if members.is_empty() {
        "(none)".to_owned()
    } else {
        members.join(", ")
    }
}
