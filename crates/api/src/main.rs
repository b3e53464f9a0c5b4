//! Cadence - two-way Google Calendar sync service.
//!
//! `cadence serve` runs the HTTP surface plus background work; the other
//! subcommands are one-shot operator actions.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use cadence_api::utils::logging::init_tracing;
use cadence_api::{router, AppContext};
use cadence_core::TenantDirectory;
use cadence_domain::{SyncMode, Tenant, TenantId};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "cadence", version, about = "Two-way calendar sync for appointments")]
struct Cli {
    /// Configuration file (TOML or JSON). Probed from well-known paths when omitted.
    #[arg(long, global = true, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the webhook and API, with scheduled jobs in the background.
    Serve,
    /// Reconcile one tenant, or every active tenant.
    Sync {
        /// Discard stored cursors and pull everything.
        #[arg(long)]
        full: bool,
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Open a push channel and run the initial full reconciliation.
    Register {
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Stop and forget push channels.
    Unregister {
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Renew channels close to expiry.
    Renew,
    /// Apply the database schema.
    Migrate,
    /// Manage tenants.
    Tenant {
        #[command(subcommand)]
        action: TenantAction,
    },
}

#[derive(Debug, Subcommand)]
enum TenantAction {
    Add { name: String },
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = cadence_infra::config::load_with(cli.config.clone())
        .context("failed to load configuration")?;
    init_tracing(&config.logging);
    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(err) => tracing::debug!(error = %err, "No .env file loaded"),
    }

    let ctx = Arc::new(AppContext::new(config).await.context("failed to initialize")?);

    match cli.command {
        Command::Serve => serve(ctx).await,
        Command::Sync { full, tenant } => sync(&ctx, full, tenant.as_deref()).await,
        Command::Register { tenant } => register(&ctx, tenant.as_deref()).await,
        Command::Unregister { tenant } => unregister(&ctx, tenant.as_deref()).await,
        Command::Renew => renew(&ctx).await,
        Command::Migrate => {
            // AppContext::new already applied the schema.
            println!("schema up to date ({})", ctx.config.database.path);
            Ok(())
        }
        Command::Tenant { action: TenantAction::Add { name } } => {
            let tenant = ctx.tenants.create(&name).await?;
            println!("{}\t{}", tenant.id, tenant.name);
            Ok(())
        }
        Command::Tenant { action: TenantAction::List } => {
            for tenant in ctx.tenants.list().await? {
                let state = if tenant.active { "active" } else { "inactive" };
                println!("{}\t{}\t{}", tenant.id, state, tenant.name);
            }
            Ok(())
        }
    }
}

async fn serve(ctx: Arc<AppContext>) -> Result<()> {
    let bind_address = ctx.config.webhook.bind_address.clone();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;

    ctx.start_background().await?;
    info!(address = %bind_address, "Cadence listening");

    let served = axum::serve(listener, router(Arc::clone(&ctx)))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    ctx.shutdown().await?;
    served.context("server error")
}

async fn sync(ctx: &AppContext, full: bool, tenant: Option<&str>) -> Result<()> {
    let services = ctx.sync_services()?;
    let mode = if full { SyncMode::Full } else { SyncMode::Incremental };

    match tenant {
        Some(raw) => {
            let tenant = require_tenant(ctx, raw).await?;
            let report = services.sync.sync_tenant(tenant.id, mode).await?;
            println!("{}\t{}", tenant.name, report.outcome.summary);
        }
        None => {
            let report = services.sync.sync_all(mode).await?;
            for synced in &report.synced {
                println!("{}\t{}", synced.tenant_id, synced.outcome.summary);
            }
            for failure in &report.failures {
                println!("{}\tfailed: {}", failure.tenant_id, failure.error);
            }
            if !report.is_clean() {
                bail!("{} tenant(s) failed to sync", report.failures.len());
            }
        }
    }
    Ok(())
}

async fn register(ctx: &AppContext, tenant: Option<&str>) -> Result<()> {
    let services = ctx.sync_services()?;
    let tenants = match tenant {
        Some(raw) => vec![require_tenant(ctx, raw).await?],
        None => ctx.tenants.active_tenants().await?,
    };

    let mut failed = 0usize;
    for tenant in tenants {
        match services.channels.register(tenant.id).await {
            Ok(registration) => println!(
                "{}\tchannel {} expires {}\t{}",
                tenant.name,
                registration.channel.channel_id,
                registration.channel.expires_at.to_rfc3339(),
                registration.outcome.summary
            ),
            Err(err) => {
                failed += 1;
                warn!(tenant_id = %tenant.id, error = %err, "Channel registration failed");
                println!("{}\tfailed: {err}", tenant.name);
            }
        }
    }

    if failed > 0 {
        bail!("{failed} registration(s) failed");
    }
    Ok(())
}

async fn unregister(ctx: &AppContext, tenant: Option<&str>) -> Result<()> {
    let services = ctx.sync_services()?;
    let tenants = match tenant {
        Some(raw) => vec![require_tenant(ctx, raw).await?],
        None => ctx.tenants.list().await?,
    };

    let ids: Vec<TenantId> = tenants.iter().map(|tenant| tenant.id).collect();
    let report = services.channels.unregister_tenants(&ids).await;
    println!("removed {} channel(s)", report.removed);
    for failure in &report.failures {
        println!("{}\tfailed: {}", failure.tenant_id, failure.error);
    }

    if !report.is_clean() {
        bail!("{} tenant(s) failed to unregister", report.failures.len());
    }
    Ok(())
}

async fn renew(ctx: &AppContext) -> Result<()> {
    let report = ctx.sync_services()?.channels.renew_expiring(Utc::now()).await?;
    println!("renewed {} channel(s)", report.renewed);
    for failure in &report.failed {
        println!("failed: {failure}");
    }
    if !report.failed.is_empty() {
        bail!("{} renewal(s) failed", report.failed.len());
    }
    Ok(())
}

async fn require_tenant(ctx: &AppContext, raw: &str) -> Result<Tenant> {
    let id: TenantId = raw.parse().with_context(|| format!("invalid tenant id: {raw}"))?;
    match ctx.tenants.get(&id).await? {
        Some(tenant) => Ok(tenant),
        None => bail!("tenant {id} not found"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
