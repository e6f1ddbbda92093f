use std::time::Duration;

use clap::{Parser, Subcommand};
use sea_orm::DatabaseConnection;
use seatmap::migration::{Migrator, MigratorTrait};
use seatmap::{connect, router, seed, AppState, SeaOrmStore, Settings};
use tokio::{
    net::TcpListener,
    signal::ctrl_c,
    task::{AbortHandle, JoinHandle},
};
use tower_sessions::ExpiredDeletion;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How often expired admin sessions are purged.
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Parser)]
#[command(name = "seatmap")]
#[command(about = "Crowdsourced map of public benches and gazebos")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Apply migrations and serve the HTTP API (default)
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Insert roles, default users and dictionaries
    Seed,
    /// Delete every row from every table
    Clean,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    let db = connect(&settings).await?;
    info!("Connected to database");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            Migrator::up(&db, None).await?;
            serve(db, settings).await?;
        }
        Command::Migrate => {
            Migrator::up(&db, None).await?;
            info!("Migrations applied");
        }
        Command::Seed => {
            seed::seed_all(&db, settings.bcrypt_cost).await?;
            info!("Seeding finished");
        }
        Command::Clean => {
            seed::clean(&db).await?;
            info!("Database cleaned");
        }
    }
    Ok(())
}

async fn serve(
    db: DatabaseConnection,
    settings: Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    tokio::fs::create_dir_all(&settings.upload_dir).await?;
    let cleanup = spawn_session_cleanup(SeaOrmStore::new(db.clone()));

    let addr = settings.bind_addr;
    let app = router(AppState::new(db, settings));

    let listener = TcpListener::bind(addr).await?;
    info!("Server starting on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup.abort_handle()))
        .await?;

    info!("Server stopped");
    Ok(())
}

fn spawn_session_cleanup(store: SeaOrmStore) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(err) = store.delete_expired().await {
                error!("expired session cleanup failed: {err}");
            }
        }
    })
}

async fn shutdown_signal(cleanup: AbortHandle) {
    let ctrl_c = async {
        if let Err(err) = ctrl_c().await {
            error!("failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                error!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    cleanup.abort();
}
