//! RecipeGen API Server
//!
//! Stores per-user recipes, syncs them with offline clients and proxies
//! recipe generation to Gemini.
//!
//! # Configuration
//!
//! Environment variables (override the config file):
//! - `RECIPEGEN_PORT`: Port to listen on (default: 8080)
//! - `RECIPEGEN_DATABASE_PATH`: SQLite database file (default: ~/.local/share/recipegen/recipegen.db)
//! - `RECIPEGEN_JWT_SECRET`: Token signing secret (required)
//! - `RECIPEGEN_GEMINI_API_KEY`: Gemini API key (generation fails without it)
//! - `RECIPEGEN_GEMINI_BASE_URL`, `RECIPEGEN_GEMINI_MODEL`
//! - `RECIPEGEN_CONFIG`: Path to config file (default: ~/.config/recipegen/config.yaml)
//!
//! # Config File Format
//!
//! ```yaml
//! port: 8080
//! database_path: /var/lib/recipegen/recipegen.db
//! jwt_secret: "change-me"
//! gemini_api_key: "..."
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recipegen::config::Config;
use recipegen::db::init_db;
use recipegen::server::{router, AppState};

#[derive(Parser)]
#[command(name = "recipegen-server")]
#[command(version)]
#[command(about = "RecipeGen API server", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short)]
    config: Option<PathBuf>,
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(cli.config)?;

    if config.gemini_api_key.is_none() {
        tracing::warn!("No Gemini API key configured; generation endpoints will fail");
    }

    tracing::info!("Database: {}", config.database_path.display());
    let pool = init_db(&config.database_path).await?;

    let app = router(AppState::from_config(pool, &config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recipegen=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
