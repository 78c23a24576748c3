/// Application context and dependency injection
use crate::{
    account::AccountManager,
    config::ServerConfig,
    db,
    error::PointsResult,
    points::PointsService,
    rate_limit::RateLimiter,
    seed,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub points_service: Arc<PointsService>,
    pub rate_limiter: RateLimiter,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> PointsResult<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.storage.data_directory).await?;

        let db = db::create_pool(
            &config.storage.database,
            db::DatabaseOptions {
                max_connections: config.storage.max_connections,
                ..Default::default()
            },
        )
        .await?;

        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let ctx = Self::with_pool(config, db);

        seed::run(&ctx).await?;

        Ok(ctx)
    }

    /// Wire services around an already migrated pool
    pub fn with_pool(config: ServerConfig, db: SqlitePool) -> Self {
        let config = Arc::new(config);

        let account_manager = Arc::new(AccountManager::new(db.clone(), Arc::clone(&config)));
        let points_service = Arc::new(PointsService::new(db.clone()));
        let rate_limiter = RateLimiter::new(&config.rate_limit);

        Self {
            config,
            db,
            account_manager,
            points_service,
            rate_limiter,
        }
    }

    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
