//! wellmind-server – entry point.
//!
//! Startup order:
//! 1. Load `.env` and parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Open the SQLite database and run pending migrations.
//! 4. Build the completion provider (when a credential is configured).
//! 5. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod entities;
mod error;
mod middleware;
mod probe;
mod routes;
mod schemas;
mod services;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::config::Config;
use crate::entities::SqliteStore;
use crate::services::{CohereClient, CompletionProvider, ConversationPipeline, FallbackResponder};
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "wellmind-server", version, about = "Mental-health support chat backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Check the provider credential against every model in the priority list
    ProbeProvider,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── 1. Configuration ───────────────────────────────────────────────────────
    dotenvy::dotenv().ok();
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    init_tracing(&cfg);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cfg).await,
        Command::ProbeProvider => probe::run(&cfg).await,
    }
}

fn init_tracing(cfg: &Config) {
    // Warn loudly if the configured value is not a valid filter expression.
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: WELLMIND_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn serve(cfg: Config) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "wellmind-server starting");
    info!(config = ?cfg, "configuration loaded");
    cfg.validate()?;

    // ── 3. Database ────────────────────────────────────────────────────────────
    let store = Arc::new(
        SqliteStore::connect(&cfg.database_url)
            .await
            .with_context(|| format!("failed to open database {}", cfg.database_url))?,
    );
    info!(database_url = %cfg.database_url, "database ready");

    // ── 4. Completion provider ─────────────────────────────────────────────────
    let provider: Option<Arc<dyn CompletionProvider>> = match cfg.provider_config() {
        Some(provider_cfg) => {
            let models = provider_cfg.models.len();
            let client = CohereClient::new(provider_cfg).context("failed to build provider client")?;
            info!(models, "completion provider configured");
            Some(Arc::new(client))
        }
        None => {
            warn!("COHERE_API_KEY not set; every reply will come from the local fallback");
            None
        }
    };

    let pipeline = ConversationPipeline::new(Arc::clone(&store), provider, FallbackResponder::new());
    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        store,
        pipeline: Arc::new(pipeline),
    });

    // ── 5. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg
        .bind_address
        .parse()
        .with_context(|| format!("invalid WELLMIND_BIND '{}'", cfg.bind_address))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("wellmind-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
