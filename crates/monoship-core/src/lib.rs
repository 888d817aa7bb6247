//! Core types and configuration for monoship.
//!
//! This crate defines the `monoship.toml` schema ([`MonoshipConfig`]),
//! `uv.lock` parsing with local dependency closure resolution
//! ([`LockfileDocument`], [`DependencyClosure`]), image references
//! ([`ImageReference`]), and shared error types.

pub mod config;
pub mod error;
pub mod lockfile;
pub mod reference;

pub use config::{
    ExcludesConfig, GatesConfig, ImageConfig, MonoshipConfig, RegistryConfig, ServeConfig,
};
pub use error::{Error, Result};
pub use lockfile::{
    DependencyClosure, DependencyRef, LockfileDocument, PackageRecord, resolve_closure,
};
pub use reference::{ImageReference, reference};
