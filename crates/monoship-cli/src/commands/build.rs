use std::path::Path;

use monoship_build::Variant;
use monoship_engine::DockerClient;

use super::Project;

pub async fn build(root: &Path, package: &str, variant: Variant) -> anyhow::Result<()> {
    let project = Project::load(root, package)?;
    let serve = project.serve_options(None, None);
    let container = project.container(variant, &serve)?;

    println!("Building {package} ({variant})...");
    let image = DockerClient::new().build(&container, &project.root).await?;

    println!();
    println!("{image}");
    Ok(())
}
