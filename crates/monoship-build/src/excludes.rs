//! Glob filters applied when copying host directories into a build context.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Patterns excluded from every build context.
pub const BASE_EXCLUDES: &[&str] = &[
    ".env",
    ".envrc",
    ".git",
    "**/.venv",
    "**/__pycache__",
    "**/.pytest_cache",
    "**/.ruff_cache",
    "**/.mypy_cache",
    ".dagger/sdk",
];

/// Additionally excluded from images that are published for production.
pub const PRODUCTION_EXCLUDES: &[&str] = &["**/tests"];

/// A compiled set of exclude globs.
///
/// A path is excluded when it, or any of its ancestors, matches.
#[derive(Debug, Clone)]
pub struct ExcludeSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl ExcludeSet {
    pub fn new<I, S>(patterns: I) -> Result<Self, ExcludeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = Glob::new(pattern).map_err(|e| ExcludeError::InvalidPattern {
                pattern: pattern.clone(),
                source: e,
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| ExcludeError::InvalidPattern {
            pattern: patterns.join(", "),
            source: e,
        })?;
        Ok(Self { patterns, set })
    }

    /// Exclusions for the editable dev image (tests kept).
    pub fn development(extra: &[String]) -> Result<Self, ExcludeError> {
        Self::new(
            BASE_EXCLUDES
                .iter()
                .map(|p| (*p).to_owned())
                .chain(extra.iter().cloned()),
        )
    }

    /// Exclusions for slim and distroless images (tests dropped).
    pub fn production(extra: &[String]) -> Result<Self, ExcludeError> {
        Self::new(
            BASE_EXCLUDES
                .iter()
                .chain(PRODUCTION_EXCLUDES)
                .map(|p| (*p).to_owned())
                .chain(extra.iter().cloned()),
        )
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_excluded(&self, relative: &Path) -> bool {
        relative
            .ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .any(|p| self.set.is_match(p))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExcludeError {
    #[error("invalid exclude pattern {pattern:?}")]
    InvalidPattern {
        pattern: String,
        source: globset::Error,
    },
}
