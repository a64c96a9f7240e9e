#![forbid(unsafe_code)]

//! `template-broadcast`: template broadcast service binary.
//!
//! Bootstraps configuration and credentials, opens the contact database,
//! wires the provider client, template catalog and dispatcher, and serves
//! the operator HTTP surface until a shutdown signal arrives.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use template_broadcast::config::GlobalConfig;
use template_broadcast::dispatch::dispatcher::BroadcastDispatcher;
use template_broadcast::dispatch::payload::PayloadBuilder;
use template_broadcast::http::{server, AppState};
use template_broadcast::persistence::contact_repo::ContactRepo;
use template_broadcast::persistence::db;
use template_broadcast::provider::catalog::TemplateCatalog;
use template_broadcast::provider::client::GraphClient;
use template_broadcast::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "template-broadcast", about = "Template broadcast service", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the HTTP port from the configuration file.
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("template-broadcast bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    config.load_credentials().await?;
    let config = Arc::new(config);
    info!("configuration loaded");

    // ── Initialize database ─────────────────────────────
    let db = Arc::new(db::connect(&config.db_path).await?);
    info!(path = %config.db_path.display(), "database connected");

    // ── Provider, catalog, dispatcher ───────────────────
    let client = Arc::new(GraphClient::new(config.provider.clone())?);
    let catalog = Arc::new(TemplateCatalog::new(
        Arc::clone(&client) as _,
        config.broadcast.catalog_ttl(),
        config.provider.template_timeout(),
    ));
    let builder = Arc::new(PayloadBuilder::new(config.template_images.clone())?);

    let ct = CancellationToken::new();
    let dispatcher = BroadcastDispatcher::new(
        Arc::clone(&catalog),
        Arc::clone(&client) as _,
        ContactRepo::new(Arc::clone(&db)),
        builder,
        config.broadcast.send_interval(),
        ct.clone(),
    );

    let state = Arc::new(AppState {
        config: Arc::clone(&config),
        db,
        catalog,
        dispatcher: dispatcher.clone(),
        provider: Some(client),
    });

    // ── Start HTTP surface ──────────────────────────────
    let http_ct = ct.clone();
    let http_state = Arc::clone(&state);
    let http_handle = tokio::spawn(async move {
        if let Err(err) = server::serve(http_state, http_ct).await {
            error!(%err, "http server failed");
        }
    });

    info!(port = config.http_port, "template-broadcast ready");

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    // Any running broadcast observes the cancelled token at its next
    // boundary; already-persisted statuses stay as they are.
    dispatcher.progress().wait_idle().await;
    let _ = http_handle.await;
    info!("template-broadcast shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
