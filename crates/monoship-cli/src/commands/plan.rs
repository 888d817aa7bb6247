use std::path::Path;

use monoship_build::{ContextEntry, DockerfileGenerator, Variant};

use super::Project;

/// Print the Dockerfile and build-context plan; nothing touches docker.
pub fn plan(root: &Path, package: &str, variant: Variant) -> anyhow::Result<()> {
    let project = Project::load(root, package)?;
    let serve = project.serve_options(None, None);
    let container = project.container(variant, &serve)?;
    let rendered = DockerfileGenerator::new(&container).render();

    print!("{}", rendered.dockerfile);
    println!();
    println!("# Build context:");
    for entry in &rendered.context {
        match entry {
            ContextEntry::HostDirectory { name, source, .. } => {
                println!("#   {name} <- {}/", source.display());
            }
            ContextEntry::HostFile { name, source } => {
                println!("#   {name} <- {}", source.display());
            }
            ContextEntry::InlineFile { name, .. } => println!("#   {name} (generated)"),
        }
    }
    Ok(())
}
