/// Application context and dependency injection
use crate::{
    account::AccountManager,
    auth::{ledger::TokenLedger, login::LoginOrchestrator, otc::OtcStore, TokenIssuer},
    config::ServerConfig,
    db,
    directory::DirectoryManager,
    error::ApiResult,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub otc_store: Arc<OtcStore>,
    pub token_issuer: Arc<TokenIssuer>,
    pub token_ledger: Arc<TokenLedger>,
    pub login: Arc<LoginOrchestrator>,
    pub directory: Arc<DirectoryManager>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        // Malformed TTL specs or a weak signing key are fatal here,
        // before any request is served.
        config.validate()?;

        let pool = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let account_manager = Arc::new(AccountManager::new(pool.clone()));
        let otc_store = Arc::new(OtcStore::new(pool.clone()));
        let token_issuer = Arc::new(TokenIssuer::new(
            config.authentication.jwt_secret.clone(),
            config.authentication.token_ttl.clone(),
        ));
        let token_ledger = Arc::new(TokenLedger::new(pool.clone()));

        let login = Arc::new(LoginOrchestrator::new(
            Arc::clone(&account_manager),
            Arc::clone(&otc_store),
            Arc::clone(&token_issuer),
            Arc::clone(&token_ledger),
        ));

        let directory = Arc::new(DirectoryManager::new(pool.clone()));

        Ok(Self {
            config: Arc::new(config),
            db: pool,
            account_manager,
            otc_store,
            token_issuer,
            token_ledger,
            login,
            directory,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
