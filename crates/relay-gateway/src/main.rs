//! wa-relay: WhatsApp webhook relay
//!
//! Usage:
//!   wa-relay           - Start the relay (HTTP API + scheduler)
//!   wa-relay --help    - Show help
//!   wa-relay --version - Show version

use relay_api::AppState;
use relay_catalog::{CatalogCache, CatalogProvider, CatalogRefresher, CatalogResolver};
use relay_core::{Config, FileTenantDirectory, Store, TenantDirectory};
use relay_inbound::Classifier;
use relay_schedule::EventScheduler;
use relay_whatsapp::{Dispatcher, ProviderSenderFactory};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Run mode
enum RunMode {
    Server,
    Help,
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match parse_args() {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("wa-relay {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting wa-relay...");
    run_server(config).await
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

/// Print help message
fn print_help() {
    println!("wa-relay - multi-tenant WhatsApp webhook relay");
    println!();
    println!("Usage:");
    println!("  wa-relay             Start the relay");
    println!("  wa-relay --help      Show this help message");
    println!("  wa-relay --version   Show version");
    println!();
    println!("Configuration is read from ./relay.toml when present.");
    println!();
    println!("Environment Variables:");
    println!("  PORT                     HTTP port (default: 3000)");
    println!("  ALLOWED_ORIGINS          Comma-separated CORS origins (default: any)");
    println!("  DB_PATH                  SQLite database (default: data/wa-relay.db)");
    println!("  TENANTS_DIR              Tenant JSON directory (default: data/tenants)");
    println!("  SCHEDULER_ENABLED        Arm delayed follow-ups (default: true)");
    println!("  UPSELL_DELAY_SECS        Delay between review and upsell (default: 5)");
    println!("  CATALOG_REFRESH_ENABLED  Refresh product APIs in the background (default: true)");
    println!("  RUST_LOG                 Log filter (default: info)");
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    let store = Arc::new(
        Store::open(&config.storage.db_path)
            .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?,
    );
    tracing::info!("Store opened at {}", config.storage.db_path);

    let tenants: Arc<dyn TenantDirectory> = Arc::new(FileTenantDirectory::new(&config.tenants.dir));
    match tenants.list().await {
        Ok(list) => tracing::info!("Loaded {} tenants from {}", list.len(), config.tenants.dir),
        Err(e) => tracing::warn!("Failed to list tenants in {}: {}", config.tenants.dir, e),
    }

    // Catalog: cached with background refresh, or resolved on every use
    let mut refresher = None;
    let catalog: Arc<dyn CatalogProvider> = if config.catalog.refresh_enabled {
        let cache = Arc::new(CatalogCache::new(CatalogResolver::default()));
        refresher = Some(CatalogRefresher::new(cache.clone(), tenants.clone()).start());
        cache
    } else {
        tracing::info!("Catalog refresh is disabled");
        Arc::new(CatalogResolver::default())
    };

    let dispatcher = Dispatcher::new(Arc::new(ProviderSenderFactory::default()), store.clone());

    let scheduler = EventScheduler::new(tenants.clone(), catalog.clone(), dispatcher, store.clone())
        .with_upsell_delay(Duration::from_secs(config.scheduler.upsell_delay_secs))
        .with_arming(config.scheduler.enabled);

    if config.scheduler.enabled {
        let restored = scheduler
            .restore()
            .map_err(|e| anyhow::anyhow!("Failed to restore scheduled actions: {}", e))?;
        tracing::info!("Event scheduler ready ({} actions restored)", restored);
    } else {
        tracing::info!("Event scheduler arming is disabled");
    }

    let state = AppState {
        tenants,
        catalog,
        store: store.clone(),
        scheduler: scheduler.clone(),
        classifier: Classifier::new(store),
    };

    let app = relay_api::app(state, config.server.allowed_origins.as_deref());

    tracing::info!("wa-relay initialized successfully");
    tracing::info!("Press Ctrl+C to exit");

    relay_api::start_server(config.server.port, app, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        tracing::info!("Shutting down...");
    })
    .await?;

    scheduler.shutdown();
    if let Some(handle) = refresher {
        handle.stop().await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
