mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use monoship_build::Variant;
use monoship_engine::Gate;
use secrecy::SecretString;

#[derive(Parser)]
#[command(
    name = "monoship",
    about = "Build, verify, and publish container images for uv monorepo packages"
)]
#[command(version)]
struct Cli {
    /// Repository root containing uv.lock
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an image for a workspace package and print its ID
    Build {
        /// Workspace package name
        package: String,
        /// Image variant: dev, slim, or distroless
        #[arg(long, default_value_t = Variant::Slim)]
        variant: Variant,
    },
    /// Print the generated Dockerfile without building
    Plan {
        /// Workspace package name
        package: String,
        /// Image variant: dev, slim, or distroless
        #[arg(long, default_value_t = Variant::Slim)]
        variant: Variant,
    },
    /// Run tests, type-check, and lint, reporting every result
    Verify {
        /// Workspace package name
        package: String,
    },
    /// Run only the test gate
    Test {
        /// Workspace package name
        package: String,
    },
    /// Run only the type-check gate
    Typecheck {
        /// Workspace package name
        package: String,
    },
    /// Run only the lint gate
    Lint {
        /// Workspace package name
        package: String,
    },
    /// Build and run an image as a local service
    Serve {
        /// Workspace package name
        package: String,
        /// Image variant: dev, slim, or distroless
        #[arg(long, default_value_t = Variant::Slim)]
        variant: Variant,
        /// Port the application listens on (default from monoship.toml)
        #[arg(long)]
        port: Option<u16>,
        /// Address the application binds to (default from monoship.toml)
        #[arg(long)]
        host: Option<String>,
    },
    /// Build and push an image to a registry
    Publish {
        /// Workspace package name
        package: String,
        /// Image variant: dev, slim, or distroless
        #[arg(long, default_value_t = Variant::Slim)]
        variant: Variant,
        /// Registry host (default from monoship.toml)
        #[arg(long)]
        registry: Option<String>,
        /// Image name as namespace/repository (default from monoship.toml)
        #[arg(long)]
        image: Option<String>,
        /// Image tag (default from monoship.toml)
        #[arg(long)]
        tag: Option<String>,
        /// Registry username
        #[arg(long, env = "MONOSHIP_REGISTRY_USERNAME")]
        username: Option<String>,
        /// Registry password or token
        #[arg(long, env = "MONOSHIP_REGISTRY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Push anonymously to the ephemeral dev registry instead
        #[arg(long, conflicts_with_all = ["registry", "image", "tag"])]
        dev: bool,
        /// Allow publishing with uncommitted changes
        #[arg(long)]
        allow_dirty: bool,
    },
    /// Check docker, BuildKit, and repository readiness
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "failed to load .env"),
    }

    let cli = Cli::parse();
    let root = cli.root;

    match cli.command {
        Commands::Build { package, variant } => commands::build(&root, &package, variant).await?,
        Commands::Plan { package, variant } => commands::plan(&root, &package, variant)?,
        Commands::Verify { package } => commands::verify(&root, &package).await?,
        Commands::Test { package } => commands::gate(&root, &package, Gate::Test).await?,
        Commands::Typecheck { package } => {
            commands::gate(&root, &package, Gate::Typecheck).await?
        }
        Commands::Lint { package } => commands::gate(&root, &package, Gate::Lint).await?,
        Commands::Serve {
            package,
            variant,
            port,
            host,
        } => commands::serve(&root, &package, variant, port, host).await?,
        Commands::Publish {
            package,
            variant,
            registry,
            image,
            tag,
            username,
            password,
            dev,
            allow_dirty,
        } => {
            let args = commands::PublishArgs {
                variant,
                registry,
                image,
                tag,
                username,
                password: password.map(SecretString::from),
                dev,
                allow_dirty,
            };
            commands::publish(&root, &package, args).await?
        }
        Commands::Doctor => commands::doctor(&root).await?,
    }

    Ok(())
}
