//! Eager loading of related records into results.
//!
//! A relation loader is registered under a name on the service config and
//! runs when a caller lists that name in `populate`. Loaders work on the
//! serialized records, so one loader type serves every entity pair.

use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, IdenStatic, QueryFilter};
use serde::Serialize;
use serde_json::Value;

use crate::errors::{ServiceError, ServiceResult};
use crate::query::column_value;

#[async_trait]
pub trait Populate: Send + Sync {
    /// Attach related records to each record under `name`.
    async fn populate(&self, db: &DatabaseConnection, name: &str, records: &mut [Value]) -> ServiceResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cardinality {
    /// record[local] references related[remote]; attaches one object or null
    BelongsTo,
    /// related[remote] references record[local]; attaches an array
    HasMany,
}

/// Relation to entity `R` joined on `record[local] == related[remote]`.
pub struct Related<R: EntityTrait> {
    cardinality: Cardinality,
    local: String,
    remote: R::Column,
    _entity: PhantomData<fn() -> R>,
}

impl<R: EntityTrait> Related<R> {
    /// `local` is the foreign-key field on the served record, `remote` the
    /// referenced column on `R` (usually its primary key).
    pub fn belongs_to(local: impl Into<String>, remote: R::Column) -> Self {
        Self { cardinality: Cardinality::BelongsTo, local: local.into(), remote, _entity: PhantomData }
    }

    /// `local` is the served record's key, `remote` the foreign-key column on `R`.
    pub fn has_many(local: impl Into<String>, remote: R::Column) -> Self {
        Self { cardinality: Cardinality::HasMany, local: local.into(), remote, _entity: PhantomData }
    }
}

#[async_trait]
impl<R> Populate for Related<R>
where
    R: EntityTrait,
    R::Model: Serialize + Send + Sync,
{
    async fn populate(&self, db: &DatabaseConnection, name: &str, records: &mut [Value]) -> ServiceResult<()> {
        let mut keys: Vec<Value> = Vec::new();
        for record in records.iter() {
            match record.get(&self.local) {
                Some(Value::Null) | None => {}
                Some(k) if !keys.contains(k) => keys.push(k.clone()),
                Some(_) => {}
            }
        }

        let related: Vec<Value> = if keys.is_empty() {
            Vec::new()
        } else {
            let values = keys
                .iter()
                .map(|k| column_value(self.remote, k))
                .collect::<ServiceResult<Vec<_>>>()?;
            R::find()
                .filter(self.remote.is_in(values))
                .all(db)
                .await
                .map_err(ServiceError::storage)?
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<_, _>>()
                .map_err(|e| ServiceError::storage(format!("serialize {name}: {e}")))?
        };

        let remote = self.remote.as_str();
        for record in records.iter_mut() {
            let key = record.get(&self.local).cloned().unwrap_or(Value::Null);
            let matches = related.iter().filter(|r| !key.is_null() && r.get(remote) == Some(&key));
            let attached = match self.cardinality {
                Cardinality::BelongsTo => matches.cloned().next().unwrap_or(Value::Null),
                Cardinality::HasMany => Value::Array(matches.cloned().collect()),
            };
            if let Value::Object(map) = record {
                map.insert(name.to_string(), attached);
            }
        }
        Ok(())
    }
}
