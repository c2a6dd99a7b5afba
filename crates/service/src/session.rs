//! Per-operation repository handles.
//!
//! `SessionProvider` hands out a fresh `Repository` for every service call.
//! A repository never outlives the operation that opened it, so nothing a
//! call loads is visible to a concurrent call.

use std::marker::PhantomData;

use configs::DatabaseConfig;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use crate::errors::{ServiceError, ServiceResult};
use crate::query::filter::MAX_COUNT;
use crate::query::{column, SortOrder, StorageOptions};

#[derive(Clone, Debug)]
pub struct SessionProvider {
    db: DatabaseConnection,
}

impl SessionProvider {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }

    /// Open the `[database]` pool and wrap it.
    pub async fn connect(cfg: &DatabaseConfig) -> ServiceResult<Self> {
        let db = models::db::connect_with_config(cfg).await?;
        Ok(Self::new(db))
    }

    /// Fresh repository handle for one operation on `E`.
    pub fn open<E: EntityTrait>(&self) -> Repository<E> {
        let session = Uuid::new_v4();
        debug!(%session, table = E::default().table_name(), "open repository session");
        Repository { db: self.db.clone(), session, _entity: PhantomData }
    }

    pub fn connection(&self) -> &DatabaseConnection { &self.db }
}

/// Repository for `E` bound to one operation.
pub struct Repository<E> {
    db: DatabaseConnection,
    session: Uuid,
    _entity: PhantomData<E>,
}

impl<E> Repository<E>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel> + Send + Sync,
    E::ActiveModel: ActiveModelBehavior + Send,
{
    pub fn session(&self) -> Uuid { self.session }

    pub fn connection(&self) -> &DatabaseConnection { &self.db }

    pub async fn find_one(&self, cond: Condition) -> ServiceResult<Option<E::Model>> {
        E::find().filter(cond).one(&self.db).await.map_err(ServiceError::storage)
    }

    /// Rows matching `cond` with ordering, offset and limit from `opts`.
    ///
    /// `tiebreak` is appended to the ordering so paging is stable. An offset
    /// without a limit reads to the end; SQLite needs an explicit `LIMIT`
    /// before `OFFSET`.
    pub async fn find(&self, cond: Condition, opts: &StorageOptions, tiebreak: E::Column) -> ServiceResult<Vec<E::Model>> {
        let select = Self::ordered(E::find().filter(cond), opts, tiebreak)?;
        let limit = match (opts.offset, opts.limit) {
            (Some(_), None) => Some(MAX_COUNT),
            (_, limit) => limit,
        };
        select
            .offset(opts.offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(ServiceError::storage)
    }

    /// `find` plus the total number of rows matching `cond`, ignoring
    /// offset and limit.
    pub async fn find_and_count(
        &self,
        cond: Condition,
        opts: &StorageOptions,
        tiebreak: E::Column,
    ) -> ServiceResult<(Vec<E::Model>, u64)> {
        let total = self.count(cond.clone()).await?;
        let rows = self.find(cond, opts, tiebreak).await?;
        Ok((rows, total))
    }

    pub async fn count(&self, cond: Condition) -> ServiceResult<u64> {
        E::find().filter(cond).count(&self.db).await.map_err(ServiceError::storage)
    }

    /// Every row matching `cond`, ordered by `tiebreak`.
    pub async fn find_all(&self, cond: Condition, tiebreak: E::Column) -> ServiceResult<Vec<E::Model>> {
        E::find()
            .filter(cond)
            .order_by(tiebreak, Order::Asc)
            .all(&self.db)
            .await
            .map_err(ServiceError::storage)
    }

    /// Insert all records in one transaction.
    pub async fn persist_inserts(&self, records: Vec<E::ActiveModel>) -> ServiceResult<Vec<E::Model>> {
        let txn = self.db.begin().await.map_err(ServiceError::storage)?;
        let mut saved = Vec::with_capacity(records.len());
        for am in records {
            saved.push(am.insert(&txn).await.map_err(ServiceError::storage)?);
        }
        txn.commit().await.map_err(ServiceError::storage)?;
        debug!(session = %self.session, count = saved.len(), "inserted records");
        Ok(saved)
    }

    /// Write changed fields of all records in one transaction.
    pub async fn persist_updates(&self, records: Vec<E::ActiveModel>) -> ServiceResult<Vec<E::Model>> {
        let txn = self.db.begin().await.map_err(ServiceError::storage)?;
        let mut saved = Vec::with_capacity(records.len());
        for am in records {
            saved.push(am.update(&txn).await.map_err(ServiceError::storage)?);
        }
        txn.commit().await.map_err(ServiceError::storage)?;
        debug!(session = %self.session, count = saved.len(), "updated records");
        Ok(saved)
    }

    /// Delete every row matching `cond`, returning the affected row count.
    pub async fn delete_where(&self, cond: Condition) -> ServiceResult<u64> {
        let res = E::delete_many().filter(cond).exec(&self.db).await.map_err(ServiceError::storage)?;
        debug!(session = %self.session, rows = res.rows_affected, "deleted records");
        Ok(res.rows_affected)
    }

    fn ordered(mut select: Select<E>, opts: &StorageOptions, tiebreak: E::Column) -> ServiceResult<Select<E>> {
        for key in opts.order_by.iter().flatten() {
            let col = column::<E>(&key.field)?;
            let order = match key.order {
                SortOrder::Asc => Order::Asc,
                SortOrder::Desc => Order::Desc,
            };
            select = select.order_by(col, order);
        }
        Ok(select.order_by(tiebreak, Order::Asc))
    }
}
