//! Render a [`Container`] as a multi-stage Dockerfile plus a context plan.
//!
//! Containers referenced through `FromContainer` sources become named
//! stages (`stage0`, `stage1`, …); identical stages are emitted once.
//! Host files and directories are placed in the build context under
//! sequential names (`ctx/0000`, …) so layer cache keys depend on file
//! contents only, never on where the repository lives on the host.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::excludes::ExcludeSet;
use crate::layer::{Container, Directory, DirectorySource, FileSource, Op};

const SYNTAX_HEADER: &str = "# syntax=docker/dockerfile:1";

/// Something that must exist in the build context before `docker build`.
#[derive(Debug, Clone)]
pub enum ContextEntry {
    /// Copy `source` (relative to the repo root) to `name`, filtered.
    HostDirectory {
        name: String,
        source: PathBuf,
        excludes: ExcludeSet,
    },
    HostFile {
        name: String,
        source: PathBuf,
    },
    InlineFile {
        name: String,
        content: String,
    },
}

impl ContextEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::HostDirectory { name, .. }
            | Self::HostFile { name, .. }
            | Self::InlineFile { name, .. } => name,
        }
    }
}

/// A rendered Dockerfile and everything its `COPY` lines expect.
#[derive(Debug, Clone)]
pub struct RenderedBuild {
    pub dockerfile: String,
    pub context: Vec<ContextEntry>,
}

/// Generates a BuildKit Dockerfile from a layer chain.
pub struct DockerfileGenerator<'a> {
    container: &'a Container,
}

impl<'a> DockerfileGenerator<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub fn render(&self) -> RenderedBuild {
        let mut renderer = Renderer::default();
        let body = renderer.body(self.container);

        let mut dockerfile = String::from(SYNTAX_HEADER);
        dockerfile.push('\n');
        for stage in &renderer.stages {
            dockerfile.push_str(&format!(
                "\nFROM {} AS {}\n{}",
                stage.base, stage.name, stage.body
            ));
        }
        dockerfile.push_str(&format!("\nFROM {}\n{}", self.container.base(), body));

        tracing::debug!(
            stages = renderer.stages.len(),
            context_entries = renderer.context.len(),
            "dockerfile rendered"
        );

        RenderedBuild {
            dockerfile,
            context: renderer.context,
        }
    }
}

struct Stage {
    name: String,
    base: String,
    body: String,
}

#[derive(Default)]
struct Renderer {
    stages: Vec<Stage>,
    context: Vec<ContextEntry>,
    /// Dedup key → allocated context directory.
    allocated: HashMap<String, String>,
}

impl Renderer {
    fn body(&mut self, container: &Container) -> String {
        let mut out = String::new();
        let mut mounts: Vec<(String, String)> = Vec::new();

        for op in container.ops() {
            match op {
                Op::File { path, source } => self.file(&mut out, path, source),
                Op::Directory { path, source } => self.directory(&mut out, path, source),
                Op::Exec { args } if args.is_empty() => {}
                Op::Exec { args } => {
                    out.push_str("RUN ");
                    for (target, volume) in &mounts {
                        out.push_str(&format!(
                            "--mount=type=cache,id={volume},target={target} "
                        ));
                    }
                    out.push_str(&json_array(args));
                    out.push('\n');
                }
                Op::Env { key, value } => {
                    out.push_str(&format!("ENV {key}={}\n", env_value(value)));
                }
                Op::Workdir(path) => out.push_str(&format!("WORKDIR {path}\n")),
                Op::Entrypoint(args) => {
                    out.push_str(&format!("ENTRYPOINT {}\n", json_array(args)));
                }
                Op::ExposedPort(port) => out.push_str(&format!("EXPOSE {port}\n")),
                Op::MountedCache { path, volume } => {
                    mounts.retain(|(p, _)| p != path);
                    mounts.push((path.clone(), volume.clone()));
                }
            }
        }

        out
    }

    fn stage(&mut self, container: &Container) -> String {
        let body = self.body(container);
        if let Some(existing) = self
            .stages
            .iter()
            .find(|s| s.base == container.base() && s.body == body)
        {
            return existing.name.clone();
        }

        let name = format!("stage{}", self.stages.len());
        self.stages.push(Stage {
            name: name.clone(),
            base: container.base().to_owned(),
            body,
        });
        name
    }

    /// Allocate (or reuse) a context directory for `key`.
    fn allocate(&mut self, key: String) -> (String, bool) {
        if let Some(name) = self.allocated.get(&key) {
            return (name.clone(), false);
        }
        let name = format!("ctx/{:04}", self.allocated.len());
        self.allocated.insert(key, name.clone());
        (name, true)
    }

    fn file(&mut self, out: &mut String, path: &str, source: &FileSource) {
        let file_name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_owned());

        match source {
            FileSource::Host(src) => {
                let (dir, fresh) = self.allocate(format!("file:{}", src.display()));
                let name = format!("{dir}/{file_name}");
                if fresh {
                    self.context.push(ContextEntry::HostFile {
                        name: name.clone(),
                        source: src.clone(),
                    });
                }
                out.push_str(&format!("COPY {}\n", json_array(&[name.as_str(), path])));
            }
            FileSource::Inline(content) => {
                let (dir, fresh) = self.allocate(format!("inline:{path}:{content}"));
                let name = format!("{dir}/{file_name}");
                if fresh {
                    self.context.push(ContextEntry::InlineFile {
                        name: name.clone(),
                        content: content.clone(),
                    });
                }
                out.push_str(&format!("COPY {}\n", json_array(&[name.as_str(), path])));
            }
            FileSource::FromContainer {
                container,
                path: src,
            } => {
                let stage = self.stage(container);
                out.push_str(&format!(
                    "COPY --from={stage} {}\n",
                    json_array(&[src.as_str(), path])
                ));
            }
        }
    }

    fn directory(&mut self, out: &mut String, path: &str, source: &DirectorySource) {
        let dest = dir_path(path);

        match source {
            DirectorySource::Host {
                path: src,
                excludes,
            } => {
                let key = format!("dir:{}:{}", src.display(), excludes.patterns().join(","));
                let (name, fresh) = self.allocate(key);
                if fresh {
                    self.context.push(ContextEntry::HostDirectory {
                        name: name.clone(),
                        source: src.clone(),
                        excludes: excludes.clone(),
                    });
                }
                out.push_str(&format!(
                    "COPY {}\n",
                    json_array(&[dir_path(&name).as_str(), dest.as_str()])
                ));
            }
            DirectorySource::Inline(dir) => self.inline_directory(out, &dest, dir),
            DirectorySource::FromContainer {
                container,
                path: src,
            } => {
                let stage = self.stage(container);
                out.push_str(&format!(
                    "COPY --from={stage} {}\n",
                    json_array(&[dir_path(src).as_str(), dest.as_str()])
                ));
            }
        }
    }

    fn inline_directory(&mut self, out: &mut String, dest: &str, dir: &Directory) {
        let key = dir
            .files()
            .iter()
            .map(|(rel, source)| match source {
                FileSource::Host(p) => format!("{rel}=host:{}", p.display()),
                FileSource::Inline(content) => format!("{rel}=inline:{content}"),
                FileSource::FromContainer { .. } => String::new(),
            })
            .collect::<Vec<_>>()
            .join(";");
        let (name, fresh) = self.allocate(format!("inline-dir:{key}"));

        let mut from_containers = Vec::new();
        for (rel, source) in dir.files() {
            let entry_name = format!("{name}/{rel}");
            match source {
                FileSource::Host(p) if fresh => self.context.push(ContextEntry::HostFile {
                    name: entry_name,
                    source: p.clone(),
                }),
                FileSource::Inline(content) if fresh => {
                    self.context.push(ContextEntry::InlineFile {
                        name: entry_name,
                        content: content.clone(),
                    });
                }
                FileSource::FromContainer { container, path } => {
                    from_containers.push((rel, container, path));
                }
                _ => {}
            }
        }

        out.push_str(&format!(
            "COPY {}\n",
            json_array(&[dir_path(&name).as_str(), dest])
        ));
        for (rel, container, src) in from_containers {
            let stage = self.stage(container);
            let target = format!("{dest}{rel}");
            out.push_str(&format!(
                "COPY --from={stage} {}\n",
                json_array(&[src.as_str(), target.as_str()])
            ));
        }
    }
}

/// Directory form of a path: exactly one trailing slash.
fn dir_path(path: &str) -> String {
    format!("{}/", path.trim_end_matches('/'))
}

fn json_string(s: &str) -> String {
    serde_json::Value::String(s.to_owned()).to_string()
}

/// Double-quoted ENV value; `$` is escaped so BuildKit stores it literally.
fn env_value(s: &str) -> String {
    json_string(s).replace('$', "\\$")
}

fn json_array<S: AsRef<str>>(items: &[S]) -> String {
    serde_json::Value::Array(
        items
            .iter()
            .map(|s| serde_json::Value::String(s.as_ref().to_owned()))
            .collect(),
    )
    .to_string()
}
