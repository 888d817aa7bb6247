use std::path::{Path, PathBuf};
use std::process::Command;

use walkdir::WalkDir;

use crate::dockerfile::{ContextEntry, RenderedBuild};
use crate::excludes::ExcludeSet;

/// Materializes a rendered build into `context_dir`.
///
/// Writes the Dockerfile and every planned context entry. Host
/// directories are walked in file-name order and filtered through their
/// exclude set, matched both relative to the copied directory and
/// relative to the repository root. Symlinks are copied as links.
pub fn create_bundle(
    context_dir: &Path,
    repo_root: &Path,
    build: &RenderedBuild,
) -> Result<PathBuf, BundleError> {
    // Clean previous bundle
    if context_dir.exists() {
        std::fs::remove_dir_all(context_dir).map_err(|e| BundleError::Cleanup {
            path: context_dir.to_path_buf(),
            source: e,
        })?;
    }
    create_dir(context_dir)?;

    for entry in &build.context {
        let dst = context_dir.join(entry.name());
        match entry {
            ContextEntry::HostDirectory {
                source, excludes, ..
            } => copy_filtered(repo_root, source, &dst, excludes)?,
            ContextEntry::HostFile { source, .. } => {
                let src = repo_root.join(source);
                if !src.is_file() {
                    return Err(BundleError::SourceMissing { path: src });
                }
                if let Some(parent) = dst.parent() {
                    create_dir(parent)?;
                }
                copy_file(&src, &dst)?;
            }
            ContextEntry::InlineFile { content, .. } => {
                if let Some(parent) = dst.parent() {
                    create_dir(parent)?;
                }
                std::fs::write(&dst, content).map_err(|e| BundleError::Write {
                    path: dst.clone(),
                    source: e,
                })?;
            }
        }
    }

    let dockerfile = context_dir.join("Dockerfile");
    std::fs::write(&dockerfile, &build.dockerfile).map_err(|e| BundleError::Write {
        path: dockerfile,
        source: e,
    })?;

    tracing::debug!(
        context = %context_dir.display(),
        entries = build.context.len(),
        "build context bundled"
    );

    Ok(context_dir.to_path_buf())
}

fn copy_filtered(
    repo_root: &Path,
    relative: &Path,
    dst: &Path,
    excludes: &ExcludeSet,
) -> Result<(), BundleError> {
    let src_root = repo_root.join(relative);
    if !src_root.is_dir() {
        return Err(BundleError::SourceMissing { path: src_root });
    }
    create_dir(dst)?;

    let walker = WalkDir::new(&src_root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.path().strip_prefix(&src_root).is_ok_and(|inner| {
                !excludes.is_excluded(inner) && !excludes.is_excluded(&relative.join(inner))
            })
        });

    let mut copied = 0usize;
    for entry in walker {
        let entry = entry.map_err(|e| BundleError::Walk {
            path: src_root.clone(),
            source: e,
        })?;
        let inner = entry
            .path()
            .strip_prefix(&src_root)
            .map_err(|e| BundleError::StripPrefix {
                path: entry.path().to_path_buf(),
                source: e,
            })?;
        let target = dst.join(inner);

        if entry.path_is_symlink() {
            if let Some(parent) = target.parent() {
                create_dir(parent)?;
            }
            copy_symlink(entry.path(), &target)?;
            copied += 1;
        } else if entry.file_type().is_dir() {
            create_dir(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                create_dir(parent)?;
            }
            copy_file(entry.path(), &target)?;
            copied += 1;
        }
    }

    tracing::debug!(source = %relative.display(), files = copied, "copied source directory");
    Ok(())
}

fn create_dir(path: &Path) -> Result<(), BundleError> {
    std::fs::create_dir_all(path).map_err(|e| BundleError::Create {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Recreate `src` as a link with the same target; links are never followed.
fn copy_symlink(src: &Path, dst: &Path) -> Result<(), BundleError> {
    let link = std::fs::read_link(src).map_err(|e| BundleError::Symlink {
        path: src.to_path_buf(),
        source: e,
    })?;

    #[cfg(unix)]
    let created = std::os::unix::fs::symlink(&link, dst);
    #[cfg(windows)]
    let created = if src.is_dir() {
        std::os::windows::fs::symlink_dir(&link, dst)
    } else {
        std::os::windows::fs::symlink_file(&link, dst)
    };

    created.map_err(|e| BundleError::Symlink {
        path: src.to_path_buf(),
        source: e,
    })
}

fn copy_file(src: &Path, dst: &Path) -> Result<(), BundleError> {
    std::fs::copy(src, dst)
        .map(|_| ())
        .map_err(|e| BundleError::CopyFile {
            path: src.to_path_buf(),
            source: e,
        })
}

/// Checks whether the git working tree has uncommitted changes.
pub fn is_dirty(repo_root: &Path) -> Result<bool, BundleError> {
    let output = Command::new("git")
        .args(["status", "--porcelain"])
        .current_dir(repo_root)
        .output()
        .map_err(|e| BundleError::GitCommand {
            detail: "failed to execute git status".to_owned(),
            source: e,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BundleError::GitFailed {
            detail: format!(
                "git status exited with {}: {}",
                output.status,
                stderr.trim()
            ),
        });
    }

    Ok(!output.stdout.is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("failed to clean up build context {path}")]
    Cleanup {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create directory {path}")]
    Create {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("source not found: {path}")]
    SourceMissing { path: std::path::PathBuf },
    #[error("failed to walk {path}")]
    Walk {
        path: std::path::PathBuf,
        source: walkdir::Error,
    },
    #[error("walked path {path} is outside its source directory")]
    StripPrefix {
        path: std::path::PathBuf,
        source: std::path::StripPrefixError,
    },
    #[error("failed to copy file {path}")]
    CopyFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to recreate symlink {path}")]
    Symlink {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}")]
    Write {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("git command failed: {detail}")]
    GitCommand {
        detail: String,
        source: std::io::Error,
    },
    #[error("git failed: {detail}")]
    GitFailed { detail: String },
}
