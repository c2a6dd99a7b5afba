

use configs::DatabaseConfig;
use sea_orm::DatabaseConnection;

/// Fresh in-memory database with every fixture table created.
pub(crate) async fn memory_db() -> anyhow::Result<DatabaseConnection> {
    let cfg = DatabaseConfig {
        url: "sqlite::memory:".into(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let db = crate::db::connect_with_config(&cfg).await?;
    crate::schema::create_all(&db).await?;
    Ok(db)
}
