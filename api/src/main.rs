//! Franchise API server
//!
//! # Usage
//!
//! ```bash
//! franchise-api --config franchise.toml --listen 0.0.0.0:8080
//! franchise-api --seed dev-seed.json
//! RUST_LOG=franchise::audit=info,info franchise-api
//! ```

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use franchise_api::seed::Seed;
use franchise_api::{build_router, ApiState, Backends};
use franchise_tenant::{AuditSink, InMemorySessionStore, InMemoryStore, JsonLinesAuditSink, TenancyConfig, TracingAuditSink};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "franchise-api")]
#[command(version)]
#[command(about = "Tenant-isolated franchise directory API", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, env = "FRANCHISE_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long, env = "FRANCHISE_LISTEN", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Seed data (JSON) for the in-memory store
    #[arg(long, env = "FRANCHISE_SEED")]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TenancyConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => {
            let config = TenancyConfig::default().with_env(std::env::vars());
            config.validate()?;
            config
        }
    };

    let store = Arc::new(InMemoryStore::new());
    for tenant in &config.tenants {
        store.insert_tenant(tenant.clone());
    }

    let sessions = Arc::new(InMemorySessionStore::new());
    if let Some(path) = &cli.seed {
        let ttl = config.session.ttl().context("session.ttl_secs out of range")?;
        let issued = Seed::load(path)?.apply(&store, sessions.as_ref(), ttl, Utc::now()).await?;
        for session in issued {
            tracing::info!(principal_id = %session.principal.id(), token = %session.token, "seed session issued");
        }
    }

    let audit: Arc<dyn AuditSink> = match &config.audit.path {
        Some(path) => Arc::new(
            JsonLinesAuditSink::open(path).with_context(|| format!("opening audit log {}", path.display()))?,
        ),
        None => Arc::new(TracingAuditSink),
    };

    let state = ApiState::new(&config, Backends::in_memory(store, sessions, audit));
    let app = build_router(state);

    tracing::info!(
        tenants = config.tenants.len(),
        fallback_hosts = ?config.hosts.fallback_hosts,
        "Franchise API listening on {}",
        cli.listen
    );

    let listener = tokio::net::TcpListener::bind(cli.listen).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
