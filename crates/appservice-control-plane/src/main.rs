//! AppService Control Plane Server

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use appservice_control_plane::{
    http, AppService, AppState, Config, ProcessExecutor, StaticCatalog, TaskStore,
};

/// AppService control plane server.
#[derive(Parser, Debug)]
#[command(name = "appservice-control-plane", about = "AppService task orchestration server")]
struct Args {
    /// HTTP server address
    #[arg(long, default_value = "[::1]:50052")]
    http_addr: String,

    /// JSON file with the app catalog
    #[arg(long)]
    catalog: Option<String>,

    /// Directory for per-task files of launched apps
    #[arg(long, default_value = "appservice-work")]
    work_dir: String,

    /// Largest page returned by task enumeration
    #[arg(long, default_value_t = appservice_control_plane::store::DEFAULT_MAX_PAGE_SIZE)]
    max_page_size: usize,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            http_addr: args.http_addr,
            catalog_path: args.catalog,
            work_dir: args.work_dir,
            max_page_size: args.max_page_size,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("appservice=info".parse()?)
                .add_directive("appservice_control_plane=info".parse()?),
        )
        .with_target(true)
        .init();

    // Load config
    let config = Config::from(Args::parse());
    let http_addr: SocketAddr = config.http_addr.parse()?;

    let catalog = match &config.catalog_path {
        Some(path) => StaticCatalog::from_file(path)?,
        None => {
            warn!("No catalog file given - no apps can be started");
            StaticCatalog::default()
        }
    };

    let executor = ProcessExecutor::new(&config.work_dir)?;
    info!(work_dir = %config.work_dir, "Process executor ready");

    // Create shared state
    let state = AppState::with_store(
        TaskStore::with_max_page_size(config.max_page_size),
        Arc::new(catalog),
        Arc::new(executor),
    );
    let service = Arc::new(AppService::new(state));

    let router = http::create_router(service);
    let listener = TcpListener::bind(http_addr).await?;

    info!(http_addr = %http_addr, "Starting AppService control plane");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("AppService control plane stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
