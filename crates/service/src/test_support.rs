#![cfg(test)]
use configs::DatabaseConfig;
use sea_orm::{EntityTrait, IntoActiveModel};
use serde::Serialize;

use crate::config::ServiceConfig;
use crate::record_service::RecordService;
use crate::session::SessionProvider;

/// In-memory SQLite with every fixture table created. One pooled connection,
/// so every session sees the same database.
pub async fn memory_provider() -> Result<SessionProvider, anyhow::Error> {
    common::utils::logging::init_test_logging();
    let cfg = DatabaseConfig {
        url: "sqlite::memory:".into(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let provider = SessionProvider::connect(&cfg).await?;
    models::schema::create_all(provider.connection()).await?;
    Ok(provider)
}

pub async fn service<E>(config: ServiceConfig) -> Result<RecordService<E>, anyhow::Error>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel> + Serialize + Send + Sync,
    E::ActiveModel: Send,
{
    Ok(RecordService::new(memory_provider().await?, config)?)
}
