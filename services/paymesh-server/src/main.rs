//! PayMesh Server
//!
//! REST server for the PayMesh settlement engine: the credit ledger, the
//! escrow flow, webhook ingestion, the stale-hold reaper, and the capability
//! handshake.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults
//! paymesh-server
//!
//! # Start with environment overrides
//! PAYMESH_PORT=8080 PAYMESH_TOKEN_SECRET=... paymesh-server
//! ```
//!
//! The stale-hold sweep and the reconciliation pass are driven by an
//! external scheduler hitting `GET /sweep` and `GET /reconcile` with the
//! `X-Cron-Secret` header.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use paymesh_api::{create_router, ApiConfig, AppState};
use paymesh_capability::{AgentCandidate, MemoryIndex, TokenService};
use paymesh_escrow::{EscrowFlow, MemoryArtifactStore, MemoryProcessor};
use paymesh_ledger::CreditLedger;

/// PayMesh settlement server
#[derive(Parser, Debug)]
#[command(name = "paymesh-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, env = "PAYMESH_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "PAYMESH_PORT", default_value_t = 8000)]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "PAYMESH_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Shared secret for signing capability tokens
    #[arg(long, env = "PAYMESH_TOKEN_SECRET", default_value = "dev-token-secret-change-me")]
    token_secret: String,

    /// Shared secret for webhook body signatures
    #[arg(long, env = "PAYMESH_WEBHOOK_SECRET", default_value = "dev-webhook-secret")]
    webhook_secret: String,

    /// Shared secret the scheduler presents on /sweep and /reconcile
    #[arg(long, env = "PAYMESH_CRON_SECRET", default_value = "dev-cron-secret")]
    cron_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone())),
        )
        .init();

    let state = build_state(&args).await;
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("paymesh-server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// Wire the core components
///
/// The processor, artifact store, and discovery index are in-memory stand-ins
/// for their external counterparts; swapping in real SDK-backed
/// implementations of the same traits is the deployment step.
async fn build_state(args: &Args) -> Arc<AppState> {
    let processor = Arc::new(MemoryProcessor::new());
    let artifacts = Arc::new(MemoryArtifactStore::new());
    let flow = Arc::new(EscrowFlow::new(processor, artifacts));

    let index = Arc::new(MemoryIndex::new());
    seed_index(&index).await;

    Arc::new(AppState::new(
        CreditLedger::new(),
        flow,
        TokenService::new(&args.token_secret),
        index,
        ApiConfig::new(&args.webhook_secret, &args.cron_secret),
    ))
}

/// Seed the in-memory discovery index with a few live agents
async fn seed_index(index: &MemoryIndex) {
    for (identity, endpoint, capability) in [
        ("did:mesh:rfp-bidder", "http://localhost:8002/bid", "gov.rfp.bidder"),
        ("did:mesh:repo-master", "http://localhost:8001/manage", "dev.git.manage"),
        ("did:mesh:infra-scout", "http://localhost:8005/scout", "cloud.aws.monitor"),
    ] {
        index
            .register(AgentCandidate {
                identity: identity.to_string(),
                endpoint: endpoint.to_string(),
                capabilities: vec![capability.to_string()],
            })
            .await;
    }
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => tracing::error!("failed to listen for shutdown signal: {e}"),
    }
}
