use std::path::Path;

use monoship_build::Variant;
use monoship_engine::DockerClient;

use super::Project;

pub async fn serve(
    root: &Path,
    package: &str,
    variant: Variant,
    port: Option<u16>,
    host: Option<String>,
) -> anyhow::Result<()> {
    let project = Project::load(root, package)?;
    let serve = project.serve_options(port, host);
    let container = project.container(variant, &serve)?;
    let client = DockerClient::new();

    println!("Building {package} ({variant})...");
    let image = client.build(&container, &project.root).await?;

    println!("Serving {package} on http://localhost:{}", serve.port);
    client.serve(&image, serve.port).await?;
    Ok(())
}
