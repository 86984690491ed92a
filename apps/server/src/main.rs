use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use usergate_auth::hash_password;
use usergate_config::load as load_config;
use usergate_gateway::create_router;
use usergate_runtime::{seed, telemetry, BackendServices};

#[derive(Parser)]
#[command(name = "usergate-server")]
#[command(about = "User management service (serves HTTP by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// JSON file with users to load at startup
        #[arg(long)]
        seed: Option<PathBuf>,
    },
    /// Print an argon2 hash for a password
    HashPassword { password: String },
    /// Validate a seed file and list the users it defines
    CheckSeed { path: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve { seed: None }) {
        Commands::Serve { seed } => run_server(seed).await,
        Commands::HashPassword { password } => {
            let hash = hash_password(&password).map_err(|err| anyhow!("failed to hash password: {err}"))?;
            println!("{hash}");
            Ok(())
        }
        Commands::CheckSeed { path } => check_seed(path).await,
    }
}

async fn run_server(seed: Option<PathBuf>) -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("starting usergate");

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config, seed.as_deref())
        .await
        .context("failed to initialise backend services")?;

    let app = create_router(services.gateway_state());

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(usergate_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("usergate shut down");
    Ok(())
}

async fn check_seed(path: PathBuf) -> anyhow::Result<()> {
    let file = seed::load_seed(&path)?;
    let services = BackendServices::initialise(&Default::default(), None)
        .await
        .context("failed to initialise backend services")?;
    let users = seed::apply_seed(&services.directory, file).await?;

    println!("=== USERS ===");
    if users.is_empty() {
        println!("No users defined in {}", path.display());
        return Ok(());
    }

    println!("Found {} users:", users.len());
    println!(
        "{:<5} {:<20} {:<30} {:<10} {:<10}",
        "ID", "Username", "Email", "Confirmed", "Blocked"
    );
    println!("{}", "-".repeat(80));
    for user in users {
        println!(
            "{:<5} {:<20} {:<30} {:<10} {:<10}",
            user.id,
            user.username,
            user.email,
            user.is_confirmed(),
            user.is_blocked()
        );
    }

    Ok(())
}
