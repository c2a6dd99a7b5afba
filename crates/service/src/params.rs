//! Per-call parameters and record identifiers.

use sea_orm::ColumnTrait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::{ServiceError, ServiceResult};
use crate::pagination::Paginate;
use crate::query::{column_value, CallerFilter, StorageOptions};

/// Call parameters.
///
/// `query` is the caller filter dialect; `options` are native options merged
/// over the translated ones; `where` replaces `query` as the selector for
/// batch patch/remove.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Params {
    pub query: Option<CallerFilter>,
    pub options: Option<StorageOptions>,
    pub populate: Option<Vec<String>>,
    #[serde(rename = "where")]
    pub where_filter: Option<CallerFilter>,
    pub paginate: Option<Paginate>,
}

impl Params {
    pub fn from_json(value: Value) -> ServiceResult<Params> {
        serde_json::from_value(value).map_err(|e| ServiceError::InvalidQuery(format!("invalid params: {e}")))
    }

    pub fn query(query: Value) -> ServiceResult<Params> {
        match query {
            Value::Object(map) => Ok(Params { query: Some(map), ..Default::default() }),
            other => Err(ServiceError::InvalidQuery(format!("query must be an object, got {other}"))),
        }
    }

    pub fn with_options(mut self, options: StorageOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_populate<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.populate = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_paginate(mut self, paginate: Paginate) -> Self {
        self.paginate = Some(paginate);
        self
    }

    /// Selector for batch patch/remove: `where` wins over `query`.
    pub(crate) fn selector(&self) -> Option<&CallerFilter> {
        self.where_filter.as_ref().or(self.query.as_ref())
    }
}

/// Record identifier as a caller hands it over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Int(i64),
    Text(String),
}

impl Id {
    pub fn to_json(&self) -> Value {
        match self {
            Id::Int(n) => Value::from(*n),
            Id::Text(s) => Value::from(s.as_str()),
        }
    }

    /// Typed storage value for the identity column. Fails when the id does
    /// not fit the column (for instance a malformed uuid).
    pub(crate) fn for_column<C: ColumnTrait>(&self, col: C) -> ServiceResult<sea_orm::Value> {
        column_value(col, &self.to_json())
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Id::Int(n) => write!(f, "{n}"),
            Id::Text(s) => f.write_str(s),
        }
    }
}

impl From<i32> for Id {
    fn from(v: i32) -> Self { Id::Int(v.into()) }
}

impl From<i64> for Id {
    fn from(v: i64) -> Self { Id::Int(v) }
}

impl From<&str> for Id {
    fn from(v: &str) -> Self { Id::Text(v.to_string()) }
}

impl From<String> for Id {
    fn from(v: String) -> Self { Id::Text(v) }
}

impl From<Uuid> for Id {
    fn from(v: Uuid) -> Self { Id::Text(v.to_string()) }
}

impl TryFrom<&Value> for Id {
    type Error = ServiceError;

    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Number(n) => n
                .as_i64()
                .map(Id::Int)
                .ok_or_else(|| ServiceError::InvalidData(format!("id {n} is not an integer"))),
            Value::String(s) => Ok(Id::Text(s.clone())),
            other => Err(ServiceError::InvalidData(format!("unusable id {other}"))),
        }
    }
}
