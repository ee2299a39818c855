use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use cloud_image_refs::client::ArmClient;
use cloud_image_refs::{ImageReference, ImageSource, OsKind, endpoints};

/// Env var that may hold the endpoint definitions as JSON instead of the file.
const ENDPOINTS_ENV: &str = "CLOUD_IMAGE_REFS_ENDPOINTS";

fn construct_endpoints_file_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("resources")
        .join("endpoints.json")
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Default log level; `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify an image reference and print its provider forms.
    Parse {
        reference: String,
    },
    /// Also ask the provider which OS the image carries.
    Resolve(ResolveArgs),
}

#[derive(Args)]
struct ResolveArgs {
    reference: String,

    /// Region used for marketplace lookups.
    #[arg(long)]
    region: String,

    /// Name of the management endpoint to talk to.
    #[arg(long, default_value = "azure")]
    cloud: String,

    /// Endpoint definitions file (defaults to the bundled one).
    #[arg(long)]
    endpoints: Option<PathBuf>,

    #[arg(long, env = "AZURE_SUBSCRIPTION_ID")]
    subscription: String,

    /// Bearer token for the management API.
    #[arg(long, env = "AZURE_ACCESS_TOKEN", hide_env_values = true)]
    token: String,
}

/// A tiny wrapper to render the parsed reference cleanly
fn print_reference(image: &ImageReference) -> Result<()> {
    let native = serde_json::to_string(&image.to_provider_reference())
        .context("encode provider image reference")?;

    println!("\n=== Image ===");
    println!("Kind:       {}", image.kind());
    println!("Canonical:  {image}");
    println!("Max count:  {}", image.maximum_instance_count());
    println!("Native:     {native}");
    Ok(())
}

fn init_endpoints(path: Option<PathBuf>) -> Result<()> {
    if std::env::var_os(ENDPOINTS_ENV).is_some() {
        endpoints::init_from_env(ENDPOINTS_ENV)?;
        return Ok(());
    }

    let path = path.unwrap_or_else(construct_endpoints_file_path);
    endpoints::init_from_file(&path)
        .with_context(|| format!("load endpoints from {}", path.display()))
}

async fn resolve(args: ResolveArgs) -> Result<OsKind> {
    let image = ImageReference::parse(&args.reference)?;
    print_reference(&image)?;

    init_endpoints(args.endpoints)?;
    let endpoint = endpoints::by_name(&args.cloud)?;
    let client = ArmClient::from_endpoint(endpoint, &args.subscription, &args.token)?;

    info!(image = %image, region = %args.region, cloud = endpoint.name(), "resolving image OS");
    let os = image.resolve_os(&client, &args.region).await?;
    Ok(os)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(cli.log_level.parse().unwrap_or(Level::INFO).into())
                .from_env_lossy(),
        )
        .with_target(true)
        .init();

    match cli.command {
        Command::Parse { reference } => {
            let image = ImageReference::parse(&reference)?;
            print_reference(&image)?;
        }
        Command::Resolve(args) => {
            let os = resolve(args).await?;
            println!("OS:         {os}");
        }
    }

    Ok(())
}
