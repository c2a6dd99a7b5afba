//! Caller filter dialect parsed into a tagged AST.
//!
//! The dialect is a JSON object mixing plain equality (`{"title": "dune"}`),
//! per-field operator objects (`{"age": {"$gte": 18, "$lt": 65}}`), logical
//! groups (`{"$or": [{..}, {..}]}`) and the reserved top-level keys
//! `$limit`, `$skip`, `$sort` and `$select`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ServiceError, ServiceResult};

pub type CallerFilter = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Eq(Value),
    Ne(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Cmp(Comparison, Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Field { name: String, constraint: Constraint },
    Or(Vec<Filter>),
    And(Vec<Filter>),
}

/// Conjunction of clauses. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub clauses: Vec<Clause>,
}

impl Filter {
    pub fn is_empty(&self) -> bool { self.clauses.is_empty() }

    pub fn field(name: impl Into<String>, constraint: Constraint) -> Self {
        Self { clauses: vec![Clause::Field { name: name.into(), constraint }] }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
}

/// Reserved top-level keys, stripped from the storage filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Specials {
    pub limit: Option<u64>,
    pub skip: Option<u64>,
    pub sort: Option<Vec<SortKey>>,
    pub select: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedQuery {
    pub filter: Filter,
    pub specials: Specials,
}

fn invalid(msg: impl Into<String>) -> ServiceError { ServiceError::InvalidQuery(msg.into()) }

pub fn parse(query: &CallerFilter) -> ServiceResult<ParsedQuery> {
    let mut specials = Specials::default();
    let filter = parse_clauses(query, true, &mut specials)?;
    Ok(ParsedQuery { filter, specials })
}

fn parse_clauses(map: &CallerFilter, top_level: bool, specials: &mut Specials) -> ServiceResult<Filter> {
    let mut clauses = Vec::with_capacity(map.len());
    for (key, value) in map {
        match key.as_str() {
            "$limit" | "$skip" | "$sort" | "$select" if !top_level => {
                return Err(invalid(format!("{key} is only allowed at the top level")));
            }
            "$limit" => specials.limit = Some(parse_count(key, value)?),
            "$skip" => specials.skip = Some(parse_count(key, value)?),
            "$sort" => specials.sort = Some(parse_sort(value)?),
            "$select" => specials.select = Some(parse_select(value)?),
            "$or" => clauses.push(Clause::Or(parse_groups(key, value, specials)?)),
            "$and" => clauses.push(Clause::And(parse_groups(key, value, specials)?)),
            op if op.starts_with('$') => return Err(invalid(format!("unknown query operator '{op}'"))),
            field => parse_field(field, value, &mut clauses)?,
        }
    }
    Ok(Filter { clauses })
}

fn parse_groups(key: &str, value: &Value, specials: &mut Specials) -> ServiceResult<Vec<Filter>> {
    let items = value
        .as_array()
        .ok_or_else(|| invalid(format!("{key} expects an array of filters")))?;
    if items.is_empty() {
        return Err(invalid(format!("{key} expects at least one filter")));
    }
    items
        .iter()
        .map(|item| {
            let map = item
                .as_object()
                .ok_or_else(|| invalid(format!("{key} entries must be objects")))?;
            parse_clauses(map, false, specials)
        })
        .collect()
}

fn parse_field(name: &str, value: &Value, out: &mut Vec<Clause>) -> ServiceResult<()> {
    match value {
        Value::Object(ops) => {
            if ops.is_empty() {
                return Err(invalid(format!("empty operator object for '{name}'")));
            }
            for (op, operand) in ops {
                let constraint = match op.as_str() {
                    "$in" => Constraint::In(list(name, op, operand)?),
                    "$nin" => Constraint::Nin(list(name, op, operand)?),
                    "$lt" => Constraint::Cmp(Comparison::Lt, ordered(name, op, operand)?),
                    "$lte" => Constraint::Cmp(Comparison::Lte, ordered(name, op, operand)?),
                    "$gt" => Constraint::Cmp(Comparison::Gt, ordered(name, op, operand)?),
                    "$gte" => Constraint::Cmp(Comparison::Gte, ordered(name, op, operand)?),
                    "$ne" => Constraint::Ne(scalar(name, op, operand)?),
                    other if other.starts_with('$') => {
                        return Err(invalid(format!("unknown operator '{other}' on '{name}'")));
                    }
                    _ => return Err(invalid(format!("'{name}' holds a nested object, not an operator"))),
                };
                out.push(Clause::Field { name: name.to_string(), constraint });
            }
        }
        Value::Array(_) => {
            return Err(invalid(format!("'{name}' cannot equal an array; use $in")));
        }
        scalar => out.push(Clause::Field { name: name.to_string(), constraint: Constraint::Eq(scalar.clone()) }),
    }
    Ok(())
}

fn scalar(name: &str, op: &str, v: &Value) -> ServiceResult<Value> {
    match v {
        Value::Array(_) | Value::Object(_) => Err(invalid(format!("{op} on '{name}' expects a scalar"))),
        other => Ok(other.clone()),
    }
}

fn ordered(name: &str, op: &str, v: &Value) -> ServiceResult<Value> {
    if v.is_null() {
        return Err(invalid(format!("{op} on '{name}' cannot compare against null")));
    }
    scalar(name, op, v)
}

fn list(name: &str, op: &str, v: &Value) -> ServiceResult<Vec<Value>> {
    let items = v
        .as_array()
        .ok_or_else(|| invalid(format!("{op} on '{name}' expects an array")))?;
    items.iter().map(|item| scalar(name, op, item)).collect()
}

/// Largest row count or offset the storage binders accept (`i64::MAX`).
pub const MAX_COUNT: u64 = i64::MAX as u64;

fn parse_count(key: &str, v: &Value) -> ServiceResult<u64> {
    let n = match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    let n = n.ok_or_else(|| invalid(format!("{key} must be a non-negative integer")))?;
    check_count(key, n)
}

/// Reject counts the database cannot bind.
pub fn check_count(key: &str, n: u64) -> ServiceResult<u64> {
    if n > MAX_COUNT {
        return Err(invalid(format!("{key} must not exceed {MAX_COUNT}")));
    }
    Ok(n)
}

fn parse_direction(v: &Value) -> Option<SortOrder> {
    match v {
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(SortOrder::Asc),
            Some(-1) => Some(SortOrder::Desc),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "asc" => Some(SortOrder::Asc),
            "-1" | "desc" => Some(SortOrder::Desc),
            _ => None,
        },
        _ => None,
    }
}

/// `{"field": 1 | -1 | "asc" | "desc", ...}` in key order.
pub fn parse_sort(v: &Value) -> ServiceResult<Vec<SortKey>> {
    let map = v.as_object().ok_or_else(|| invalid("$sort must be an object"))?;
    map.iter()
        .map(|(field, dir)| {
            let order = parse_direction(dir)
                .ok_or_else(|| invalid(format!("invalid sort direction for '{field}'")))?;
            Ok(SortKey { field: field.clone(), order })
        })
        .collect()
}

fn parse_select(v: &Value) -> ServiceResult<Vec<String>> {
    match v {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|i| i.as_str().map(str::to_owned).ok_or_else(|| invalid("$select entries must be strings")))
            .collect(),
        _ => Err(invalid("$select must be a field name or an array of field names")),
    }
}
