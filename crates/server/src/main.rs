//! Hallkeep server
//!
//! Loads configuration, opens the database, optionally seeds fixtures and
//! serves the HTTP API until interrupted.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use hallkeep_api::AppState;
use hallkeep_core::{Database, Fixtures, TokenIssuer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::Config;

const DEFAULT_FILTER: &str = "hallkeep=info,tower_http=info";

#[derive(Debug, Parser)]
#[command(name = "hallkeep-server", version, about = "Hostel maintenance request service")]
struct Args {
    /// Path to a TOML config file
    #[arg(long, env = "HALLKEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Seed halls, rooms and users from a fixture file before serving
    #[arg(long, value_name = "FIXTURES")]
    seed: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `hallkeep_core=trace`; RUST_LOG wins if set
    #[arg(long)]
    log_level: Option<String>,
}

fn init_logging(log_level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.unwrap_or(DEFAULT_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

fn open_database(config: &Config) -> Result<Database, Box<dyn std::error::Error>> {
    let path = config.database_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::open(&path)?;
    info!(path = %path.display(), schema_version = db.schema_version(), "Database opened");
    Ok(db)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(args.config.as_deref())?;
    let db = open_database(&config)?;
    let password_policy = config.auth.password_policy();

    if let Some(path) = &args.seed {
        let report = Fixtures::load(path)?.seed(&db, &password_policy)?;
        info!(
            fixtures = %path.display(),
            users_created = report.users_created,
            users_skipped = report.users_skipped,
            "Seeding finished"
        );
    }

    let tokens = TokenIssuer::new(&config.signing_secret(), config.auth.token_ttl_minutes)?;
    let state = AppState::new(db, tokens, config.query, password_policy);
    let app = hallkeep_api::router(state, &config.server.allowed_origins);

    let listener = tokio::net::TcpListener::bind(config.server.bind).await?;
    info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    info!("Starting Hallkeep {}", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
