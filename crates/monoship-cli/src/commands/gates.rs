use std::path::Path;

use monoship_build::Variant;
use monoship_engine::{DockerClient, Gate, ImageId, QualityGateRunner};

use super::Project;

/// Gates run against the editable dev image, which keeps tests and dev tools.
async fn build_gate_image(project: &Project, client: &DockerClient) -> anyhow::Result<ImageId> {
    let serve = project.serve_options(None, None);
    let container = project.container(Variant::Dev, &serve)?;

    println!("Building {} (dev)...", project.closure.target());
    Ok(client.build(&container, &project.root).await?)
}

pub async fn verify(root: &Path, package: &str) -> anyhow::Result<()> {
    let project = Project::load(root, package)?;
    let client = DockerClient::new();
    let image = build_gate_image(&project, &client).await?;

    let report = QualityGateRunner::new(&client, &project.config.gates)
        .verify(&image)
        .await?;
    print!("{report}");

    if !report.all_passed() {
        let failed: Vec<String> = report.failed().map(|o| o.gate.to_string()).collect();
        anyhow::bail!("quality gates failed: {}", failed.join(", "));
    }

    Ok(())
}

pub async fn gate(root: &Path, package: &str, gate: Gate) -> anyhow::Result<()> {
    let project = Project::load(root, package)?;
    let client = DockerClient::new();
    let image = build_gate_image(&project, &client).await?;

    let output = QualityGateRunner::new(&client, &project.config.gates)
        .run_gate(&image, gate)
        .await?;
    print!("{output}");
    Ok(())
}
