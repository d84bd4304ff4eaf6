//! dream-server – entry point.
//!
//! Startup order:
//! 1. Load `.env` (if present) and parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Open the SQLite database and run pending migrations.
//! 4. Build the model provider client and the dream analyzer.
//! 5. Build the Axum router and start the HTTP server with graceful shutdown.

mod analyzer;
mod config;
mod entities;
mod error;
mod extract;
mod middleware;
mod routes;
mod schemas;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::analyzer::{openai, DreamAnalyzer};
use crate::config::Config;
use crate::entities::SqliteStore;
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "dream-server", version, about = "Dream interpretation API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run migrations, then serve HTTP (the default).
    Serve,
    /// Create or upgrade the database schema and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    init_tracing(&cfg);
    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!(error = %e, "failed to load .env file");
        }
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(cfg).await,
        Commands::Migrate => migrate(&cfg).await,
    }
}

fn init_tracing(cfg: &Config) {
    // Build the log-level filter, warning loudly if the configured value is
    // not a valid tracing filter expression.
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: DREAM_LOG='{}' is not a valid tracing filter ({}); \
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

async fn migrate(cfg: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::connect(&cfg.database_url, 1).await?;
    let before = store.table_names().await?;
    info!(database_url = %cfg.database_url, tables = ?before, "applying migrations");

    store.migrate().await?;

    let after = store.table_names().await?;
    info!(tables = ?after, "database schema is up to date");
    store.close().await;
    Ok(())
}

async fn serve(cfg: Config) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "dream-server starting");

    // ── 3. Database ────────────────────────────────────────────────────────────
    let store = SqliteStore::connect(&cfg.database_url, cfg.database_max_connections).await?;
    store.migrate().await?;
    info!(database_url = %cfg.database_url, "database ready");

    // ── 4. Model provider ──────────────────────────────────────────────────────
    if cfg.openai_api_key.is_none() {
        warn!(
            api_base = %cfg.openai_api_base,
            "OPENAI_API_KEY is not set; requests are sent without credentials"
        );
    }
    let client = openai::http_client()?;
    let analyzer = DreamAnalyzer::new(openai::backend_from_config(&cfg, client));
    info!(
        backend = analyzer.backend_name(),
        model = %cfg.model,
        api_base = %cfg.openai_api_base,
        "dream analyzer ready"
    );

    // ── 5. Shared application state ────────────────────────────────────────────
    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        store: Arc::new(store),
        analyzer: Arc::new(analyzer),
    });

    // ── 6. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.store.close().await;
    info!("dream-server stopped");
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
            Ok(mut s) => { s.recv().await; }
            Err(e)    => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c   => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
