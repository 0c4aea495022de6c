/// Gatherly - event lifecycle and moderation service
///
/// Backend service for a social events platform: event creation and
/// participation, report filing and resolution, event blocking, audit
/// logging, and role-based authorization.
mod api;
mod authz;
mod bus;
mod config;
mod context;
mod db;
mod directory;
mod error;
mod jobs;
mod membership;
mod metrics;
mod moderation;
mod rate_limit;
mod server;

use config::ServerConfig;
use context::AppContext;
use error::ServiceResult;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ServiceResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatherly=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Log domain events as they flow through the bus
    spawn_bus_logger(&ctx);

    // Start background jobs
    let ctx = Arc::new(ctx);
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

/// Subscribe a logging sink to the domain event bus
fn spawn_bus_logger(ctx: &AppContext) {
    let mut rx = ctx.bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            tracing::debug!(
                "domain event: {}",
                serde_json::to_string(&event).unwrap_or_else(|_| "<unencodable>".into())
            );
        }
    });
}
