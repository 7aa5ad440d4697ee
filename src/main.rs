use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repo_api::{api, db};

#[derive(Parser)]
#[command(name = "repo-api")]
#[command(about = "Registry of users, projects and their components")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Apply pending database migrations and exit
    Migrate {
        /// Path to the SQLite database file
        #[arg(long)]
        database: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Port for HTTP API
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Address to bind
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Path to the SQLite database file (defaults to the platform data dir)
    #[arg(long)]
    database: Option<PathBuf>,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            port: 8080,
            bind: IpAddr::from([127, 0, 0, 1]),
            database: None,
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "repo_api=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_database(path: Option<PathBuf>) -> anyhow::Result<db::Database> {
    let db = match path {
        Some(path) => db::Database::open(path)?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let db = open_database(args.database)?;
    let security = api::SecurityConfig::from_env();
    if security.api_key.is_some() {
        tracing::info!("API key authentication enabled");
    }

    let app = api::create_router_with_security(db, security);

    let listener = tokio::net::TcpListener::bind((args.bind, args.port)).await?;
    tracing::info!("repo-api listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve(args)) => serve(args).await?,
        Some(Commands::Migrate { database }) => {
            open_database(database)?;
            tracing::info!("Database is up to date");
        }
        None => serve(ServeArgs::default()).await?,
    }

    Ok(())
}
