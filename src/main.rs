use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sekolah_admin::api::{self, AppState};
use sekolah_admin::db::Database;
use sekolah_admin::integrations::{GoogleClient, GoogleConfig};

#[derive(Parser)]
#[command(name = "skadmin")]
#[command(about = "School administration workflows: reports, budget plans, memos")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Path to the SQLite database (defaults to the platform data dir)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Apply schema migrations and exit
    Migrate {
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "sekolah_admin=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port, db }) => serve(port, db).await,
        Some(Commands::Migrate { db }) => {
            let path = db.unwrap_or_else(Database::default_path);
            let db = Database::open(&path)?;
            db.migrate()?;
            println!("database ready at {}", path.display());
            Ok(())
        }
        None => serve(3000, None).await,
    }
}

async fn serve(port: u16, db_path: Option<PathBuf>) -> anyhow::Result<()> {
    let db = match db_path {
        Some(path) => Database::open(path)?,
        None => Database::open_default()?,
    };
    db.migrate()?;

    let google = GoogleConfig::from_env().map(|config| Arc::new(GoogleClient::new(config)));
    if google.is_none() {
        tracing::info!("google integration disabled (GOOGLE_CLIENT_ID not set)");
    }

    let app = api::create_router(AppState { db, google });

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    tracing::info!("listening on http://127.0.0.1:{port}");

    axum::serve(listener, app).await?;
    Ok(())
}
