use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use horizon::{api, auth, config::Config};
use horizon_core::db::Database;

#[derive(Parser)]
#[command(name = "horizon")]
#[command(about = "Personal productivity server: goals, tasks, and energy journaling")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Horizon server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Database file path (overrides HORIZON_DB)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Mint a development bearer token for a user
    Token {
        /// User id (the token's subject)
        #[arg(long)]
        user_id: Uuid,

        /// Email claim
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "horizon=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Some(Commands::Serve { port, db }) => serve(port, db, config).await?,
        Some(Commands::Token { user_id, email }) => {
            // 30-day development token
            let token = auth::issue_token(&config.auth_secret, user_id, &email, 30 * 24 * 3600)?;
            println!("{token}");
        }
        None => serve(3000, None, config).await?,
    }

    Ok(())
}

async fn serve(port: u16, db_override: Option<PathBuf>, config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting Horizon server on port {}", port);

    let db = match db_override.or_else(|| config.db_path.clone()) {
        Some(path) => Database::open(path)?,
        None => Database::open_default()?,
    };
    db.migrate()?;

    let app = api::create_router(db, config);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Horizon server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
