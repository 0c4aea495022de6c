/// Rate Limiting System
use crate::error::{ServiceError, ServiceResult};
use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests per second for read endpoints
    pub read_rps: u32,
    /// Requests per second for write endpoints
    pub write_rps: u32,
    /// Requests per second for moderation endpoints
    pub moderation_rps: u32,
    /// Burst size
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            read_rps: 100,
            write_rps: 25,
            moderation_rps: 10,
            burst_size: 50,
        }
    }
}

/// Rate limiter manager with one quota per endpoint class
#[derive(Clone)]
pub struct RateLimiter {
    read: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    write: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    moderation: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let read_quota = Quota::per_second(
            NonZeroU32::new(config.read_rps).unwrap_or(NonZeroU32::new(100).unwrap()),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::new(50).unwrap()));

        let write_quota = Quota::per_second(
            NonZeroU32::new(config.write_rps).unwrap_or(NonZeroU32::new(25).unwrap()),
        )
        .allow_burst(
            NonZeroU32::new(config.burst_size / 2).unwrap_or(NonZeroU32::new(25).unwrap()),
        );

        let moderation_quota = Quota::per_second(
            NonZeroU32::new(config.moderation_rps).unwrap_or(NonZeroU32::new(10).unwrap()),
        )
        .allow_burst(
            NonZeroU32::new(config.burst_size / 5).unwrap_or(NonZeroU32::new(10).unwrap()),
        );

        Self {
            read: Arc::new(GovernorLimiter::direct(read_quota)),
            write: Arc::new(GovernorLimiter::direct(write_quota)),
            moderation: Arc::new(GovernorLimiter::direct(moderation_quota)),
        }
    }

    pub fn check_read(&self) -> ServiceResult<()> {
        match self.read.check() {
            Ok(_) => Ok(()),
            Err(_) => Err(ServiceError::RateLimitExceeded {
                retry_after: std::time::Duration::from_secs(1),
            }),
        }
    }

    pub fn check_write(&self) -> ServiceResult<()> {
        match self.write.check() {
            Ok(_) => Ok(()),
            Err(_) => Err(ServiceError::RateLimitExceeded {
                retry_after: std::time::Duration::from_secs(1),
            }),
        }
    }

    pub fn check_moderation(&self) -> ServiceResult<()> {
        match self.moderation.check() {
            Ok(_) => Ok(()),
            Err(_) => Err(ServiceError::RateLimitExceeded {
                retry_after: std::time::Duration::from_secs(1),
            }),
        }
    }
}

/// Classify a request path into an endpoint class
fn is_moderation_path(path: &str) -> bool {
    path.contains("/resolve")
        || path.contains("/block")
        || path.contains("/unblock")
        || path.contains("/restore")
        || path.contains("/role")
        || path.starts_with("/audit")
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<crate::context::AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let path = request.uri().path();

    // Operational endpoints stay reachable for probes and scrapers
    if !ctx.config.rate_limit.enabled || path == "/health" || path == "/metrics" {
        return Ok(next.run(request).await);
    }

    let result = if is_moderation_path(path) {
        ctx.rate_limiter.check_moderation()
    } else if *request.method() == Method::GET {
        ctx.rate_limiter.check_read()
    } else {
        ctx.rate_limiter.check_write()
    };

    match result {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => Err(StatusCode::TOO_MANY_REQUESTS),
    }
}
