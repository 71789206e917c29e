/// Application context and dependency injection
use crate::{
    app_auth::AppAuthManager,
    config::ServerConfig,
    db,
    error::BankResult,
    ledger::{AccountLocks, LedgerStore, TransactionEngine},
    mailer::Mailer,
    minter::IdentifierMinter,
    pos::PosService,
    rate_limit::RateLimiter,
    web_auth::WebAuthGateway,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub ledger: Arc<LedgerStore>,
    pub engine: Arc<TransactionEngine>,
    pub app_auth: Arc<AppAuthManager>,
    pub web_auth: Arc<WebAuthGateway>,
    pub pos: Arc<PosService>,
    // Rate limiter
    pub rate_limiter: Arc<RateLimiter>,
    // Email mailer
    pub mailer: Arc<Mailer>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> BankResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directory if it doesn't exist
        if !config.storage.data_directory.exists() {
            tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        }

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        tracing::info!("Database ready at {:?}", config.storage.database);

        let ctx = Self::with_pool(config, db)?;
        if !ctx.web_auth.has_users().await? {
            tracing::warn!("No web users yet, the first registration becomes admin");
        }

        Ok(ctx)
    }

    /// Wire every service onto an existing, migrated pool
    pub fn with_pool(config: ServerConfig, db: SqlitePool) -> BankResult<Self> {
        let minter = IdentifierMinter::new(config.minting.max_attempts);
        let mailer = Mailer::new(config.email.clone())?;

        let ledger = LedgerStore::new(db.clone(), minter.clone());
        let engine = TransactionEngine::new(db.clone(), AccountLocks::new(), minter.clone());
        let app_auth =
            AppAuthManager::new(db.clone(), ledger.clone(), minter.clone(), mailer.clone());
        let web_auth = WebAuthGateway::new(db.clone(), minter);
        let pos = PosService::new(db.clone(), ledger.clone(), &config.authentication);
        let rate_limiter = RateLimiter::new(&config.rate_limit);

        if mailer.is_configured() {
            tracing::info!("OTP delivery by email enabled");
        } else {
            tracing::info!("Email not configured, OTPs will be logged");
        }

        Ok(Self {
            config: Arc::new(config),
            db,
            ledger: Arc::new(ledger),
            engine: Arc::new(engine),
            app_auth: Arc::new(app_auth),
            web_auth: Arc::new(web_auth),
            pos: Arc::new(pos),
            rate_limiter: Arc::new(rate_limiter),
            mailer: Arc::new(mailer),
        })
    }

    /// Context over a private in-memory database, for tests
    pub async fn for_testing() -> BankResult<Self> {
        let db = db::memory_pool().await?;
        Self::with_pool(ServerConfig::for_testing(), db)
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
