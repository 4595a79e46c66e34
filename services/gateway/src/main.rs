//! `agenttrust-gateway` — the binary that wires components A-G into one
//! running process (§2, §6).
//!
//! The agent-facing mTLS endpoint (REST + gRPC, dispatched by
//! [`agenttrust_gateway::dispatcher::RequestDispatcher`]) is the only
//! network listener this binary starts. The console-facing registration
//! surface (`RendezvousRouter::start_session`) is an in-process API, not a
//! network listener — whatever process embeds a `ConsoleSessionManager`
//! calls it directly, the way `services/aethercore-node`'s counterpart
//! modules called straight into library crates rather than over the
//! network. The actual wiring lives in the library crate so the
//! integration tests under `tests/` can assemble and serve the identical
//! stack against a test configuration.

use std::sync::Arc;
use std::time::Duration;

use agenttrust_core::Config;
use agenttrust_gateway::serve;
use agenttrust_identity::IdentityCache;
use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = parse_config_path();
    let config = Config::load_with_defaults(config_path.as_deref())
        .context("failed to load gateway configuration")?;

    if config.logging.format == "json" {
        agenttrust_core::logging::init_json();
    } else {
        agenttrust_core::logging::init();
    }

    info!(addr = %config.listen.agent_endpoint_address, "starting agent trust gateway");

    let assembled = match agenttrust_gateway::assemble(&config) {
        Ok(assembled) => assembled,
        Err(err) => {
            log_startup_error(&err);
            return Err(err);
        }
    };
    spawn_cache_eviction_task(Arc::clone(&assembled.identity_cache));

    let listener = TcpListener::bind(&config.listen.agent_endpoint_address)
        .await
        .with_context(|| format!("binding {}", config.listen.agent_endpoint_address))?;

    serve::run(listener, assembled.acceptor, assembled.dispatcher).await;
    Ok(())
}

fn spawn_cache_eviction_task(cache: Arc<IdentityCache>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);
            cache.evict_expired(now);
        }
    });
}

fn parse_config_path() -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            return iter.next().cloned();
        }
    }
    None
}

fn log_startup_error(err: &anyhow::Error) {
    error!(%err, "gateway failed to start");
}
