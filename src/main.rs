//! api-cacher service.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                            API CACHER                             │
//!   │                                                                   │
//!   │  ┌───────────┐   ┌──────────────┐   ┌──────────┐   ┌───────────┐  │
//!   │  │ scheduler │──▶│ rate limiter │──▶│ upstream │──▶│ classifier│  │──── Upstream
//!   │  └─────┬─────┘   └──────────────┘   └──────────┘   └─────┬─────┘  │     API
//!   │        │                                                 │        │
//!   │        ▼                                                 ▼        │
//!   │  ┌───────────┐   ┌──────────────┐              ┌──────────────┐   │
//!   │  │  events   │◀──│ health state │◀─────────────│ cache store  │   │
//!   │  │ broadcast │   │   machine    │              │ live+backup  │   │
//!   │  └─────┬─────┘   └──────┬───────┘              └──────┬───────┘   │
//!   │        │                │                             │           │
//!   │        ▼                ▼                             ▼           │
//!   │  ┌────────────────────────────────────────────────────────────┐   │
//!   │  │        http: /events (SSE) /status /data /backup /config    │   │
//!   │  └────────────────────────────────────────────────────────────┘   │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use api_cacher::config::{CacherConfig, ConfigOverrides, ConfigReloader, ConfigWatcher};
use api_cacher::lifecycle::{shutdown_on_signal, Application, Shutdown};
use api_cacher::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "api-cacher", version)]
#[command(about = "Rate-limited upstream API fetcher with a local cache and status API")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the listener bind address.
    #[arg(long)]
    bind: Option<String>,

    /// Override the directory holding persisted state.
    #[arg(long)]
    state_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // A missing .env is normal.
    let dotenv = dotenvy::dotenv();

    // Flags win over the file on startup and on every hot reload.
    let (bind, state_dir) = (args.bind.clone(), args.state_dir.clone());
    let overrides: ConfigOverrides = Arc::new(move |config: &mut CacherConfig| {
        if let Some(bind) = &bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(state_dir) = &state_dir {
            config.storage.state_dir = state_dir.clone();
        }
    });
    let reloader = ConfigReloader::new(&args.config, overrides);
    let config = reloader.reload()?;

    logging::init_tracing(&config.observability.log_level);
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-cacher starting");
    tracing::info!(
        endpoint = %config.upstream.endpoint_url,
        description = %config.upstream.api_description,
        fetch_interval_secs = config.schedule.fetch_interval_seconds,
        rate_limit_enabled = config.schedule.rate_limit_enabled,
        test_mode = config.upstream.test_mode,
        bind_address = %config.listener.bind_address,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let app = Application::build(config, shutdown.clone())?;

    // Keep the watcher alive for the life of the process.
    let _watcher = if args.config.exists() {
        match ConfigWatcher::new(reloader, app.config_sender()).run() {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!(error = %e, "Config hot reload disabled");
                None
            }
        }
    } else {
        None
    };

    tokio::spawn(shutdown_on_signal(shutdown));
    app.run(listener).await?;

    Ok(())
}
