//! Table bootstrap straight from entity definitions.
//!
//! Used by tests and local tooling; production schemas are managed elsewhere.

use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, Schema};

use crate::errors::ModelError;
use crate::{author, book, person};

/// `CREATE TABLE IF NOT EXISTS` for one entity.
pub async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), ModelError> {
    let backend = db.get_database_backend();
    let mut stmt = Schema::new(backend).create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await.map_err(|e| ModelError::Db(e.to_string()))?;
    Ok(())
}

/// Tables for every entity in this crate, parents first.
pub async fn create_all(db: &DatabaseConnection) -> Result<(), ModelError> {
    create_table(db, author::Entity).await?;
    create_table(db, book::Entity).await?;
    create_table(db, person::Entity).await?;
    Ok(())
}
