//! Caller query translation.
//!
//! `translate` turns a caller filter into the storage-native filter
//! (`sea_orm::Condition`) and options. `$limit` is handed back untouched so
//! the pagination policy can decide the final limit.

pub mod condition;
pub mod filter;
pub mod value;

use sea_orm::{Condition, EntityTrait};
use serde::{Deserialize, Deserializer};

use crate::errors::ServiceResult;
pub use condition::{column, column_value, to_condition};
pub use filter::{CallerFilter, Clause, Comparison, Constraint, Filter, SortKey, SortOrder};

/// Native execution options applied to a select.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    #[serde(alias = "orderBy", deserialize_with = "de_order_by")]
    pub order_by: Option<Vec<SortKey>>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub fields: Option<Vec<String>>,
    pub populate: Option<Vec<String>>,
}

fn de_order_by<'de, D>(d: D) -> Result<Option<Vec<SortKey>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(d)?;
    if raw.is_null() {
        return Ok(None);
    }
    filter::parse_sort(&raw).map(Some).map_err(<D::Error as serde::de::Error>::custom)
}

impl StorageOptions {
    /// Overlay `self` on `base`; any value set on `self` wins.
    pub fn over(self, base: StorageOptions) -> StorageOptions {
        StorageOptions {
            order_by: self.order_by.or(base.order_by),
            offset: self.offset.or(base.offset),
            limit: self.limit.or(base.limit),
            fields: self.fields.or(base.fields),
            populate: self.populate.or(base.populate),
        }
    }

    /// Every referenced column must exist on `E` and counts must be bindable.
    pub fn validate<E: EntityTrait>(&self) -> ServiceResult<()> {
        if let Some(limit) = self.limit {
            filter::check_count("limit", limit)?;
        }
        if let Some(offset) = self.offset {
            filter::check_count("offset", offset)?;
        }
        for key in self.order_by.iter().flatten() {
            column::<E>(&key.field)?;
        }
        for field in self.fields.iter().flatten() {
            column::<E>(field)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Translation {
    pub filter: Filter,
    pub condition: Condition,
    pub options: StorageOptions,
    /// Caller `$limit`, resolved later by the pagination policy.
    pub limit: Option<u64>,
}

pub fn translate<E: EntityTrait>(query: Option<&CallerFilter>) -> ServiceResult<Translation> {
    let parsed = match query {
        Some(q) => filter::parse(q)?,
        None => filter::ParsedQuery::default(),
    };
    let condition = to_condition::<E>(&parsed.filter)?;
    let specials = parsed.specials;
    let options = StorageOptions {
        order_by: specials.sort,
        offset: specials.skip,
        limit: None,
        fields: specials.select,
        populate: None,
    };
    options.validate::<E>()?;
    Ok(Translation { filter: parsed.filter, condition, options, limit: specials.limit })
}
