//! Service Uptime Monitor Binary

use actix_web::{web, App, HttpServer};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uptime_monitor::config::StoreBackend;
use uptime_monitor::{api, Config, Result, StatusMonitor, StatusPageConfig};

#[derive(Debug, Parser)]
#[command(name = "uptime_monitor", version, about = "Probe services and serve their uptime")]
struct Cli {
    /// Path to the service catalogue JSON
    #[arg(long, global = true, env = "STATUS_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the status API and the periodic health check scheduler
    Serve {
        /// Address to bind the status API to
        #[arg(long, env = "LISTEN_ADDR")]
        listen: Option<String>,

        /// Seconds between health check cycles
        #[arg(long, env = "CHECK_INTERVAL_SECONDS")]
        interval: Option<u64>,
    },
    /// Run one health check cycle and print the results as JSON
    Check,
}

#[actix_web::main]
async fn main() -> Result<()> {
    // Initialize tracing
    initialize_tracing();

    info!("Starting uptime monitor v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let mut config = Config::from_env();

    if let Some(path) = cli.config {
        config.services_path = path;
    }
    if let Command::Serve { listen, interval } = &cli.command {
        if let Some(listen) = listen {
            config.listen_addr = listen.clone();
        }
        if let Some(seconds) = interval {
            config.check_interval = Duration::from_secs(*seconds);
        }
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    let catalog = match StatusPageConfig::load(&config.services_path) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Failed to load service catalogue: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Monitor configuration - Services: {}, Store: {:?}, Interval: {}s",
        catalog.services.len(),
        config.store.backend,
        config.check_interval.as_secs()
    );
    if config.store.backend == StoreBackend::Memory {
        warn!("Using the in-memory store; recorded history is lost on exit");
    }

    let monitor = StatusMonitor::from_config(&config, catalog)?;

    match cli.command {
        Command::Check => {
            let outcome = monitor.check_all().await;
            println!("{}", serde_json::to_string_pretty(&outcome.results)?);
            match outcome.recording.await {
                Ok(written) => info!("Recorded {} data points", written),
                Err(e) => error!("Recording task failed: {}", e),
            }
            Ok(())
        }
        Command::Serve { .. } => serve(monitor, &config).await,
    }
}

async fn serve(monitor: StatusMonitor, config: &Config) -> Result<()> {
    let data = web::Data::new(monitor);

    let scheduler = data.clone();
    let period = config.check_interval;
    actix_web::rt::spawn(async move {
        scheduler
            .runner()
            .run_until(period, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to wait for shutdown signal: {}", e);
                }
            })
            .await;
    });

    info!("Status API listening on {}", config.listen_addr);
    HttpServer::new(move || App::new().app_data(data.clone()).configure(api::configure))
        .bind(config.listen_addr.as_str())?
        .run()
        .await?;

    info!("Uptime monitor shutdown complete");
    Ok(())
}

/// Initialize structured logging
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
