use std::time::Duration;

use configs::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::debug;

use crate::errors::ModelError;

/// Open a pooled connection using the `[database]` settings.
pub async fn connect_with_config(cfg: &DatabaseConfig) -> Result<DatabaseConnection, ModelError> {
    if cfg.url.trim().is_empty() {
        return Err(ModelError::Validation("database url required".into()));
    }
    let mut opt = ConnectOptions::new(cfg.url.clone());
    opt.max_connections(cfg.max_connections)
        .min_connections(cfg.min_connections)
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(cfg.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(cfg.max_lifetime_secs))
        .sqlx_logging(cfg.sqlx_logging);
    debug!(max = cfg.max_connections, min = cfg.min_connections, "connecting database pool");
    Database::connect(opt).await.map_err(|e| ModelError::Db(e.to_string()))
}
