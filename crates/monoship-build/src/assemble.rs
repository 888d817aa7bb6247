use std::path::{Path, PathBuf};

use monoship_core::DependencyClosure;

use crate::excludes::ExcludeSet;
use crate::layer::{Container, DirectorySource};

/// Copy every closure member's source tree into `container` under `target_dir`.
///
/// Members are visited in name order (one directory op each) so the
/// resulting layer sequence is reproducible. Each member lands at
/// `target_dir/<relative source path>`, keeping the repository layout.
///
/// # Errors
///
/// [`AssembleError::SourcePathNotFound`] if a member's source directory is
/// missing under `repo_root`.
pub fn assemble_sources(
    container: Container,
    repo_root: &Path,
    closure: &DependencyClosure,
    excludes: &ExcludeSet,
    target_dir: &str,
) -> Result<Container, AssembleError> {
    let mut container = container;
    let target_dir = target_dir.trim_end_matches('/');

    for (package, relative) in closure.iter() {
        let source = repo_root.join(relative);
        if !source.is_dir() {
            return Err(AssembleError::SourcePathNotFound {
                package: package.to_owned(),
                path: source,
            });
        }

        let destination = format!("{target_dir}/{}", relative.trim_matches('/'));
        tracing::debug!(package, from = %relative, to = %destination, "assembling sources");

        container = container.with_directory(
            destination,
            DirectorySource::Host {
                path: PathBuf::from(relative),
                excludes: excludes.clone(),
            },
        );
    }

    Ok(container)
}

#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("source path for package '{package}' not found: {path}")]
    SourcePathNotFound { package: String, path: PathBuf },
}
