//! Record service: get / find / create / update / patch / remove over one
//! entity, driven by the caller filter dialect.
//!
//! Every call opens its own repository session. Multi-step calls (update,
//! patch and remove) read and write in separate storage calls; a failure
//! between the two leaves whatever the first step observed untouched.

use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, IdenStatic, IntoActiveModel, ModelTrait};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::config::{Method, ServiceConfig};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{self, EventHub, ServiceEvent};
use crate::merge;
use crate::pagination::{resolve, Mode, PaginationConfig};
use crate::params::{Id, Params};
use crate::query::{column, translate, CallerFilter, Translation};
use crate::result::{FindResult, OneOrMany, Paginated};
use crate::session::{Repository, SessionProvider};

/// How records leave the service: relations to attach and fields to keep.
#[derive(Debug, Default)]
struct Shape {
    fields: Option<Vec<String>>,
    populate: Vec<String>,
}

pub struct RecordService<E: EntityTrait> {
    provider: SessionProvider,
    config: ServiceConfig,
    id: E::Column,
    events: EventHub,
}

impl<E> RecordService<E>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel> + Serialize + Send + Sync,
    E::ActiveModel: Send,
{
    /// Fails with `Config` when `id_field` is not a column of `E`.
    pub fn new(provider: SessionProvider, config: ServiceConfig) -> ServiceResult<Self> {
        config.validate()?;
        let id = column::<E>(&config.id_field).map_err(|_| {
            ServiceError::Config(format!("{}: id field '{}' is not a column", config.name, config.id_field))
        })?;
        let events = EventHub::new(config.name.clone(), config.events.clone());
        Ok(Self { provider, config, id, events })
    }

    pub fn config(&self) -> &ServiceConfig { &self.config }

    /// Identity key as it appears in returned records.
    pub fn id_field(&self) -> String { self.id.as_str().to_owned() }

    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> { self.events.subscribe() }

    /// Emit one of the custom events configured for this service.
    pub fn emit(&self, event: &str, data: Value) -> ServiceResult<()> { self.events.emit(event, data) }

    #[instrument(skip_all, fields(service = %self.config.name))]
    pub async fn get(&self, id: impl Into<Id>, params: Option<&Params>) -> ServiceResult<Value> {
        let id = id.into();
        let (translation, shape) = self.prepare(params)?;
        let repo = self.provider.open::<E>();
        let model = self.load(&repo, &id, &translation).await?;
        self.render_one(repo.connection(), model, &shape).await
    }

    #[instrument(skip_all, fields(service = %self.config.name))]
    pub async fn find(&self, params: Option<&Params>) -> ServiceResult<FindResult> {
        let repo = self.provider.open::<E>();
        let Some(params) = params else {
            let rows = repo.find_all(Condition::all(), self.id).await?;
            return Ok(FindResult::All(self.render(repo.connection(), rows, &Shape::default()).await?));
        };

        let (translation, shape) = self.prepare(Some(params))?;
        let caller = params.options.clone().unwrap_or_default();
        let caller_limit = translation.limit.or(caller.limit);
        let mut opts = caller.over(translation.options);
        let paging = PaginationConfig::for_call(self.config.paginate, params.paginate);
        let resolved = resolve(caller_limit, opts.offset, &paging);
        opts.limit = resolved.limit;
        debug!(mode = ?resolved.mode, limit = ?resolved.limit, skip = ?resolved.skip, "resolved pagination");

        let cond = translation.condition;
        match resolved.mode {
            Mode::CountOnly => {
                let total = repo.count(cond).await?;
                Ok(FindResult::Page(Paginated { total, limit: 0, skip: resolved.skip_or_zero(), data: Vec::new() }))
            }
            Mode::Paginated => {
                let (rows, total) = repo.find_and_count(cond, &opts, self.id).await?;
                let data = self.render(repo.connection(), rows, &shape).await?;
                Ok(FindResult::Page(Paginated {
                    total,
                    limit: resolved.limit.unwrap_or(total),
                    skip: resolved.skip_or_zero(),
                    data,
                }))
            }
            Mode::Plain => {
                let rows = repo.find(cond, &opts, self.id).await?;
                Ok(FindResult::All(self.render(repo.connection(), rows, &shape).await?))
            }
        }
    }

    /// Create one record from an object payload or several from an array.
    #[instrument(skip_all, fields(service = %self.config.name))]
    pub async fn create(&self, data: Value, params: Option<&Params>) -> ServiceResult<OneOrMany> {
        let (payloads, many) = match &data {
            Value::Array(items) => {
                self.ensure_multi(Method::Create)?;
                (items.iter().collect::<Vec<_>>(), true)
            }
            other => (vec![other], false),
        };
        let (_, shape) = self.prepare(params)?;
        let records = payloads
            .into_iter()
            .map(|p| merge::build::<E>(merge::payload_object(p)?))
            .collect::<ServiceResult<Vec<_>>>()?;
        if records.is_empty() {
            return Ok(OneOrMany::Many(Vec::new()));
        }

        let repo = self.provider.open::<E>();
        let saved = repo.persist_inserts(records).await?;
        let out = self.render(repo.connection(), saved, &shape).await?;
        info!(count = out.len(), "records created");
        self.events.publish(events::CREATED, &out);
        Ok(if many { OneOrMany::Many(out) } else { OneOrMany::One(single(out)?) })
    }

    /// Merge `data` onto the record addressed by `id` (and `params.query`).
    #[instrument(skip_all, fields(service = %self.config.name))]
    pub async fn update(&self, id: impl Into<Id>, data: Value, params: Option<&Params>) -> ServiceResult<Value> {
        let id = id.into();
        let out = self.merge_one(&id, &data, params).await?;
        self.events.publish(events::UPDATED, std::slice::from_ref(&out));
        Ok(out)
    }

    /// With an id, merge onto that record. Without one, merge onto every
    /// record matching `params.where` (or `params.query`).
    #[instrument(skip_all, fields(service = %self.config.name))]
    pub async fn patch(&self, id: Option<Id>, data: Value, params: Option<&Params>) -> ServiceResult<OneOrMany> {
        if let Some(id) = id {
            let out = self.merge_one(&id, &data, params).await?;
            self.events.publish(events::PATCHED, std::slice::from_ref(&out));
            return Ok(OneOrMany::One(out));
        }

        self.ensure_multi(Method::Patch)?;
        let payload = merge::payload_object(&data)?;
        let cond = self.selector(params)?;
        let (_, shape) = self.prepare(params)?;

        let repo = self.provider.open::<E>();
        let rows = repo.find_all(cond, self.id).await?;
        if rows.is_empty() {
            debug!("batch patch matched nothing");
            return Err(ServiceError::NotFound(format!("{}: cannot patch query, no matching records", self.config.name)));
        }
        let mut changed = Vec::with_capacity(rows.len());
        for model in rows {
            let mut am = model.into_active_model();
            merge::merge::<E>(&mut am, payload, Some(self.id))?;
            changed.push(am);
        }
        let saved = repo.persist_updates(changed).await?;
        let out = self.render(repo.connection(), saved, &shape).await?;
        info!(count = out.len(), "records patched");
        self.events.publish(events::PATCHED, &out);
        Ok(OneOrMany::Many(out))
    }

    /// With an id, delete that record. Without one, delete every record
    /// matching `params.where` (or `params.query`). Returns the records as
    /// they were read just before deletion.
    #[instrument(skip_all, fields(service = %self.config.name))]
    pub async fn remove(&self, id: Option<Id>, params: Option<&Params>) -> ServiceResult<OneOrMany> {
        if let Some(id) = id {
            let (translation, shape) = self.prepare(params)?;
            let repo = self.provider.open::<E>();
            let model = self.load(&repo, &id, &translation).await?;
            let key = model.get(self.id);
            let out = self.render_one(repo.connection(), model, &shape).await?;
            repo.delete_where(Condition::all().add(self.id.eq(key))).await?;
            self.events.publish(events::REMOVED, std::slice::from_ref(&out));
            return Ok(OneOrMany::One(out));
        }

        self.ensure_multi(Method::Remove)?;
        let cond = self.selector(params)?;
        let (_, shape) = self.prepare(params)?;

        let repo = self.provider.open::<E>();
        let rows = repo.find_all(cond, self.id).await?;
        if rows.is_empty() {
            return Ok(OneOrMany::Many(Vec::new()));
        }
        let keys: Vec<sea_orm::Value> = rows.iter().map(|m| m.get(self.id)).collect();
        let out = self.render(repo.connection(), rows, &shape).await?;
        let deleted = repo.delete_where(Condition::all().add(self.id.is_in(keys))).await?;
        info!(count = out.len(), deleted, "records removed");
        self.events.publish(events::REMOVED, &out);
        Ok(OneOrMany::Many(out))
    }

    async fn merge_one(&self, id: &Id, data: &Value, params: Option<&Params>) -> ServiceResult<Value> {
        let payload = merge::payload_object(data)?;
        let (translation, shape) = self.prepare(params)?;
        let repo = self.provider.open::<E>();
        let model = self.load(&repo, id, &translation).await?;
        let mut am = model.into_active_model();
        merge::merge::<E>(&mut am, payload, Some(self.id))?;
        let saved = repo.persist_updates(vec![am]).await?;
        let out = self.render(repo.connection(), saved, &shape).await?;
        single(out)
    }

    /// Record addressed by `id` and the translated query. A missing record,
    /// an id that does not fit the identity column and a failed lookup are
    /// all reported as `NotFound`.
    async fn load(&self, repo: &Repository<E>, id: &Id, translation: &Translation) -> ServiceResult<E::Model> {
        let key = match id.for_column(self.id) {
            Ok(v) => v,
            Err(e) => {
                debug!(%id, error = %e, "unusable id");
                return Err(ServiceError::not_found(&self.config.name));
            }
        };
        let cond = Condition::all().add(translation.condition.clone()).add(self.id.eq(key));
        match repo.find_one(cond).await {
            Ok(Some(model)) => Ok(model),
            Ok(None) => {
                debug!(%id, "no record");
                Err(ServiceError::not_found(&self.config.name))
            }
            Err(e) => {
                warn!(%id, error = %e, "lookup failed");
                Err(ServiceError::not_found(&self.config.name))
            }
        }
    }

    /// Translate `params.query` and work out the output shape. Runs before
    /// any storage access so malformed params never reach the database.
    fn prepare(&self, params: Option<&Params>) -> ServiceResult<(Translation, Shape)> {
        let translation = translate::<E>(params.and_then(|p| p.query.as_ref()))?;
        let caller = params.and_then(|p| p.options.as_ref());
        if let Some(opts) = caller {
            opts.validate::<E>()?;
        }

        let fields = caller
            .and_then(|o| o.fields.as_ref())
            .or(translation.options.fields.as_ref())
            .map(|names| {
                names
                    .iter()
                    .map(|n| column::<E>(n).map(|c| c.as_str().to_owned()))
                    .collect::<ServiceResult<Vec<_>>>()
            })
            .transpose()?;

        let populate = params
            .and_then(|p| p.populate.as_ref())
            .or(caller.and_then(|o| o.populate.as_ref()))
            .cloned()
            .unwrap_or_default();
        if let Some(unknown) = populate.iter().find(|n| !self.config.relations.contains_key(n.as_str())) {
            return Err(ServiceError::InvalidQuery(format!("unknown relation '{unknown}' on {}", self.config.name)));
        }

        Ok((translation, Shape { fields, populate }))
    }

    /// Storage filter for batch patch/remove. Specials in the selector are
    /// ignored; batch calls always address the full match set.
    fn selector(&self, params: Option<&Params>) -> ServiceResult<Condition> {
        let selector: Option<&CallerFilter> = params.and_then(Params::selector);
        Ok(translate::<E>(selector)?.condition)
    }

    fn ensure_multi(&self, method: Method) -> ServiceResult<()> {
        if self.config.multi.allows(method) {
            return Ok(());
        }
        Err(ServiceError::MethodNotAllowed(format!(
            "{} on multiple records is not allowed for {}",
            method.as_str(),
            self.config.name
        )))
    }

    async fn render_one(&self, db: &DatabaseConnection, model: E::Model, shape: &Shape) -> ServiceResult<Value> {
        single(self.render(db, vec![model], shape).await?)
    }

    async fn render(&self, db: &DatabaseConnection, models: Vec<E::Model>, shape: &Shape) -> ServiceResult<Vec<Value>> {
        let mut records = models
            .iter()
            .map(|m| serde_json::to_value(m).map_err(|e| ServiceError::storage(format!("serialize record: {e}"))))
            .collect::<ServiceResult<Vec<_>>>()?;

        for name in &shape.populate {
            if let Some(loader) = self.config.relations.get(name) {
                loader.populate(db, name, &mut records).await?;
            }
        }

        if let Some(fields) = &shape.fields {
            let id = self.id_field();
            for record in records.iter_mut() {
                if let Value::Object(map) = record {
                    map.retain(|k, _| *k == id || fields.contains(k) || shape.populate.contains(k));
                }
            }
        }
        Ok(records)
    }
}

fn single(mut records: Vec<Value>) -> ServiceResult<Value> {
    records
        .pop()
        .ok_or_else(|| ServiceError::Storage("write returned no record".into()))
}
