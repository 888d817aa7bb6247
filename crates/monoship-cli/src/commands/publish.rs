use std::path::Path;

use monoship_build::{RegistryCredentials, Variant, attach_credentials, bundle};
use monoship_core::ImageReference;
use monoship_engine::DockerClient;
use secrecy::SecretString;

use super::Project;

pub struct PublishArgs {
    pub variant: Variant,
    pub registry: Option<String>,
    pub image: Option<String>,
    pub tag: Option<String>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub dev: bool,
    pub allow_dirty: bool,
}

/// Build the package image and push it.
pub async fn publish(root: &Path, package: &str, args: PublishArgs) -> anyhow::Result<()> {
    // Ephemeral dev pushes skip the dirty check.
    if !args.dev && !args.allow_dirty && bundle::is_dirty(root)? {
        anyhow::bail!(
            "uncommitted changes detected.\n\
             Commit your changes, or use `monoship publish --allow-dirty` to publish anyway."
        );
    }

    let project = Project::load(root, package)?;
    let registry = &project.config.registry;

    let (reference, credentials) = if args.dev {
        let reference = ImageReference::new(
            &registry.dev_address,
            None,
            &registry.dev_repository,
            &registry.dev_tag,
        );
        (reference, RegistryCredentials::default())
    } else {
        let address = args.registry.as_deref().unwrap_or(&registry.address);
        let image = args
            .image
            .as_deref()
            .or(registry.image.as_deref())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "no image name: pass --image <namespace/repository> or set [registry].image in monoship.toml"
                )
            })?;
        let tag = args.tag.as_deref().unwrap_or(&registry.tag);
        let reference = ImageReference::from_image_name(address, image, tag)?;
        (
            reference,
            RegistryCredentials::new(args.username, args.password),
        )
    };

    let serve = project.serve_options(None, None);
    let container = project.container(args.variant, &serve)?;
    let container = attach_credentials(
        container,
        &reference.registry_host(),
        &credentials,
        &registry.credentialed_hosts,
    );

    let client = DockerClient::new();

    println!("Building {package} ({})...", args.variant);
    let image = client.build(&container, &project.root).await?;

    println!("Publishing {reference}...");
    let digest = client.publish(&container, &image, &reference).await?;

    println!();
    println!("Published: {digest}");
    Ok(())
}
