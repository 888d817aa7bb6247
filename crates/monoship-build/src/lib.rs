//! Layered image pipelines, source assembly, and Dockerfile rendering.
//!
//! # Build pipeline
//!
//! ```text
//! monoship build <package>
//!   1. Closure     ── LockfileDocument::closure()      (monoship-core)
//!   2. Layers      ── ImageBuilder::build()  → Container
//!   3. Dockerfile  ── DockerfileGenerator::render()
//!   4. Context     ── bundle::create_bundle()  → temp dir
//!   5. Engine      ── docker build              (monoship-engine)
//! ```
//!
//! # Context strategy
//!
//! The build context never mirrors the repository. It holds:
//! - the manifests (`uv.lock`, `pyproject.toml`) on their own, so the
//!   third-party install layer is keyed by them alone
//! - one filtered copy per closure member, under a neutral `ctx/NNNN` name
//! - the generated `Dockerfile`

pub mod assemble;
pub mod bundle;
pub mod dockerfile;
pub mod excludes;
pub mod layer;
pub mod pipeline;
pub mod registry;

pub use assemble::{AssembleError, assemble_sources};
pub use dockerfile::{ContextEntry, DockerfileGenerator, RenderedBuild};
pub use excludes::{ExcludeError, ExcludeSet};
pub use layer::{Container, Directory, DirectorySource, FileSource, Op, RegistryAuth};
pub use pipeline::{ImageBuilder, PipelineError, PipelineTemplate, ServeOptions, Variant};
pub use registry::{RegistryCredentials, attach_credentials};
