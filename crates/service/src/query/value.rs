//! JSON scalars to typed `sea_orm::Value`s.
//!
//! The target variant comes from the column definition, so a value always
//! matches what the entity's `ActiveModel` and the database expect.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use sea_orm::sea_query::Nullable;
use sea_orm::{ColumnDef, ColumnType, Value};
use serde_json::Value as Json;
use uuid::Uuid;

fn typed<T>(json: &Json, expected: &str, parse: impl FnOnce(&Json) -> Option<T>) -> Result<Value, String>
where
    T: Into<Value> + Nullable,
{
    if json.is_null() {
        return Ok(T::null());
    }
    parse(json)
        .map(Into::into)
        .ok_or_else(|| format!("expected {expected}, got {json}"))
}

fn int<T: TryFrom<i64>>(json: &Json) -> Option<T> {
    match json {
        Json::Number(n) => n.as_i64().and_then(|v| T::try_from(v).ok()),
        Json::String(s) => s.trim().parse::<i64>().ok().and_then(|v| T::try_from(v).ok()),
        _ => None,
    }
}

fn uint<T: TryFrom<u64>>(json: &Json) -> Option<T> {
    match json {
        Json::Number(n) => n.as_u64().and_then(|v| T::try_from(v).ok()),
        Json::String(s) => s.trim().parse::<u64>().ok().and_then(|v| T::try_from(v).ok()),
        _ => None,
    }
}

fn float(json: &Json) -> Option<f64> {
    match json {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn boolean(json: &Json) -> Option<bool> {
    match json {
        Json::Bool(b) => Some(*b),
        Json::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn text(json: &Json) -> Option<String> {
    match json {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        Json::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn rfc3339(json: &Json) -> Option<DateTime<FixedOffset>> {
    json.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok())
}

/// Convert `json` for the column described by `def`.
///
/// `null` is only accepted for nullable columns.
pub fn to_value(def: &ColumnDef, json: &Json) -> Result<Value, String> {
    if json.is_null() && !def.is_null() {
        return Err("null is not allowed for a non-nullable column".into());
    }
    match def.get_column_type() {
        ColumnType::TinyInteger => typed::<i8>(json, "integer", int),
        ColumnType::SmallInteger => typed::<i16>(json, "integer", int),
        ColumnType::Integer => typed::<i32>(json, "integer", int),
        ColumnType::BigInteger => typed::<i64>(json, "integer", int),
        ColumnType::TinyUnsigned => typed::<u8>(json, "unsigned integer", uint),
        ColumnType::SmallUnsigned => typed::<u16>(json, "unsigned integer", uint),
        ColumnType::Unsigned => typed::<u32>(json, "unsigned integer", uint),
        ColumnType::BigUnsigned => typed::<u64>(json, "unsigned integer", uint),
        ColumnType::Float => typed::<f32>(json, "number", |j| float(j).map(|v| v as f32)),
        ColumnType::Double => typed::<f64>(json, "number", float),
        ColumnType::Boolean => typed::<bool>(json, "boolean", boolean),
        ColumnType::Uuid => typed::<Uuid>(json, "uuid", |j| j.as_str().and_then(|s| Uuid::parse_str(s).ok())),
        ColumnType::TimestampWithTimeZone => typed::<DateTime<FixedOffset>>(json, "RFC 3339 timestamp", rfc3339),
        ColumnType::Timestamp => {
            typed::<DateTime<Utc>>(json, "RFC 3339 timestamp", |j| rfc3339(j).map(|d| d.with_timezone(&Utc)))
        }
        ColumnType::DateTime => typed::<NaiveDateTime>(json, "timestamp", |j| {
            let s = j.as_str()?;
            rfc3339(j)
                .map(|d| d.naive_utc())
                .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok())
                .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok())
        }),
        ColumnType::Date => typed::<NaiveDate>(json, "date", |j| {
            j.as_str().and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        }),
        ColumnType::Json | ColumnType::JsonBinary => Ok(Value::Json(match json {
            Json::Null => None,
            other => Some(Box::new(other.clone())),
        })),
        ColumnType::String(_) | ColumnType::Char(_) | ColumnType::Text | ColumnType::Enum { .. } => {
            typed::<String>(json, "string", text)
        }
        other => Err(format!("unsupported column type {other:?}")),
    }
}
