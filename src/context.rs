/// Application context and dependency injection
use crate::{
    authz::AuthzGate,
    bus::EventBus,
    config::ServerConfig,
    db,
    directory::{EventDirectory, UserDirectory},
    error::ServiceResult,
    moderation::{AuditLog, ModerationEngine, ReportManager},
    rate_limit::{RateLimitConfig, RateLimiter},
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub event_directory: Arc<EventDirectory>,
    pub user_directory: Arc<UserDirectory>,
    pub membership: Arc<crate::membership::MembershipManager>,
    pub report_manager: Arc<ReportManager>,
    pub audit_log: Arc<AuditLog>,
    pub authz: Arc<AuthzGate>,
    pub moderation: Arc<ModerationEngine>,
    pub rate_limiter: Arc<RateLimiter>,
    pub bus: EventBus,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ServiceResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directory if it doesn't exist
        if !config.storage.data_directory.exists() {
            tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        }

        // Initialize database
        let pool = db::create_pool(&config.storage.database, db::DatabaseOptions::default())
            .await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig {
            read_rps: config.rate_limit.read_rps,
            write_rps: config.rate_limit.write_rps,
            moderation_rps: config.rate_limit.moderation_rps,
            burst_size: config.rate_limit.burst_size,
        }));

        Ok(Self::assemble(Arc::new(config), pool, rate_limiter))
    }

    fn assemble(
        config: Arc<ServerConfig>,
        pool: SqlitePool,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        let bus = EventBus::default();

        let event_directory = Arc::new(EventDirectory::new(pool.clone()));
        let user_directory = Arc::new(UserDirectory::new(pool.clone()));
        let membership = Arc::new(crate::membership::MembershipManager::new(
            pool.clone(),
            bus.clone(),
        ));
        let report_manager = Arc::new(ReportManager::new(pool.clone()));
        let audit_log = Arc::new(AuditLog::new(pool.clone()));
        let authz = Arc::new(AuthzGate::new(
            Arc::clone(&user_directory),
            config.authorization.admin_ids.clone(),
        ));
        let moderation = Arc::new(ModerationEngine::new(
            pool.clone(),
            Arc::clone(&event_directory),
            Arc::clone(&user_directory),
            Arc::clone(&report_manager),
            Arc::clone(&audit_log),
            Arc::clone(&authz),
            bus.clone(),
        ));

        Self {
            config,
            db: pool,
            event_directory,
            user_directory,
            membership,
            report_manager,
            audit_log,
            authz,
            moderation,
            rate_limiter,
            bus,
        }
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }

    /// Context over an in-memory database, for tests
    #[cfg(test)]
    pub(crate) async fn test_context() -> Self {
        use crate::config::{
            AuthorizationConfig, LoggingConfig, RateLimitSettings, ServiceConfig, StorageConfig,
        };

        let config = ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 0,
                request_timeout_secs: 30,
            },
            storage: StorageConfig {
                data_directory: ":memory:".into(),
                database: ":memory:".into(),
            },
            authorization: AuthorizationConfig {
                admin_ids: vec!["root-admin".to_string()],
            },
            rate_limit: RateLimitSettings {
                enabled: false,
                read_rps: 100,
                write_rps: 25,
                moderation_rps: 10,
                burst_size: 50,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        };

        let pool = db::test_pool().await;
        let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig::default()));
        Self::assemble(Arc::new(config), pool, rate_limiter)
    }
}
