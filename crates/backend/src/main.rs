pub mod domain;
pub mod handlers;
pub mod routes;
pub mod shared;
pub mod system;
pub mod usecases;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sea_orm::DatabaseConnection;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;

use shared::app_state::AppState;
use shared::config::Config;
use usecases::u501_import_equipment::hooks::CompletionNotifier;
use usecases::u501_import_equipment::{
    BanditApiClient, CatalogService, EquipmentSource, ImportExecutor, ProgressTracker,
};

#[derive(Parser)]
#[command(name = "equipment-sync")]
#[command(about = "Imports Bandit equipment into local equipment records")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server and the scheduled import worker (default)
    Serve {
        /// Listen port, overrides [server] port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one import in this process with a progress bar
    Import,

    /// Trigger an import on a running server and follow its progress
    Poll {
        /// Server base URL
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = shared::config::load_config(cli.config.as_deref())?;
    system::tracing::initialize(Path::new(&config.server.log_dir))?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config, port).await,
        Commands::Import => import_once(config).await,
        Commands::Poll { url } => poll(&url).await,
    }
}

async fn open_database(config: &Config) -> Result<DatabaseConnection> {
    let db_path = shared::config::get_database_path(config)?;
    shared::data::db::initialize_database(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("db init failed: {e}"))
}

fn build_executor(
    config: &Config,
    db: &DatabaseConnection,
    source: Arc<dyn EquipmentSource>,
    interactive: bool,
) -> ImportExecutor {
    let ttl = config.import.progress_ttl_minutes;
    let tracker = if interactive {
        ProgressTracker::interactive(db.clone(), ttl)
    } else {
        ProgressTracker::new(db.clone(), ttl)
    };
    ImportExecutor::new(db.clone(), source, Arc::new(tracker), config)
        .with_observer(Arc::new(CompletionNotifier))
}

async fn serve(config: Config, port: Option<u16>) -> Result<()> {
    let db = open_database(&config).await?;
    let source: Arc<dyn EquipmentSource> = Arc::new(BanditApiClient::new(&config.bandit_api)?);
    let executor = Arc::new(build_executor(&config, &db, source.clone(), false));

    if let Some(worker) =
        system::tasks::worker::ScheduledImportWorker::from_config(executor.clone(), &config.import.schedule)?
    {
        tokio::spawn(async move {
            worker.run_loop().await;
        });
    } else {
        tracing::info!("Import schedule is empty, scheduled imports are disabled");
    }

    let state = AppState {
        catalog: Arc::new(CatalogService::new(db.clone(), source)),
        executor,
        db,
    };
    let app = routes::configure_routes(state);

    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    tracing::info!("Attempting to bind server to http://{}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            tracing::info!("Server successfully bound to {}", addr);
            listener
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(
                    "Error: Port {} is already in use. Please ensure no other process is using this port.",
                    port
                );
            } else {
                tracing::error!("Failed to bind to port {}. Error: {}", port, e);
            }
            return Err(e.into());
        }
    };

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

async fn import_once(config: Config) -> Result<()> {
    let db = open_database(&config).await?;
    let source: Arc<dyn EquipmentSource> = Arc::new(BanditApiClient::new(&config.bandit_api)?);
    let executor = build_executor(&config, &db, source, true);

    let response = executor.run().await?;
    println!("{}", response.message);
    Ok(())
}

async fn poll(url: &str) -> Result<()> {
    let response = usecases::u501_import_equipment::poller::poll_import(url, |progress| {
        if let Some(line) = progress.display_line() {
            println!("{}", line);
        }
    })
    .await?;
    println!("{}", response.message);
    Ok(())
}
