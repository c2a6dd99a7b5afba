//! Compile the filter AST against an entity's columns.

use std::str::FromStr;

use sea_orm::sea_query::SimpleExpr;
use sea_orm::{ColumnTrait, Condition, EntityTrait};
use serde_json::Value as Json;

use super::filter::{Clause, Comparison, Constraint, Filter};
use super::value::to_value;
use crate::errors::{ServiceError, ServiceResult};

/// Resolve a caller-facing field name (snake_case or camelCase) to a column.
pub fn column<E: EntityTrait>(name: &str) -> ServiceResult<E::Column> {
    E::Column::from_str(name).map_err(|_| ServiceError::InvalidQuery(format!("unknown field '{name}'")))
}

/// Convert a JSON scalar for `col`, reporting failures as invalid queries.
pub fn column_value<C: ColumnTrait>(col: C, json: &Json) -> ServiceResult<sea_orm::Value> {
    to_value(&col.def(), json).map_err(|e| ServiceError::InvalidQuery(format!("{}: {}", col.as_str(), e)))
}

pub fn to_condition<E: EntityTrait>(filter: &Filter) -> ServiceResult<Condition> {
    filter
        .clauses
        .iter()
        .try_fold(Condition::all(), |cond, clause| Ok(cond.add(clause_condition::<E>(clause)?)))
}

fn clause_condition<E: EntityTrait>(clause: &Clause) -> ServiceResult<Condition> {
    match clause {
        Clause::Field { name, constraint } => {
            let col = column::<E>(name)?;
            Ok(Condition::all().add(constraint_expr(col, constraint)?))
        }
        Clause::Or(groups) => groups
            .iter()
            .try_fold(Condition::any(), |cond, g| Ok(cond.add(to_condition::<E>(g)?))),
        Clause::And(groups) => groups
            .iter()
            .try_fold(Condition::all(), |cond, g| Ok(cond.add(to_condition::<E>(g)?))),
    }
}

fn constraint_expr<C: ColumnTrait>(col: C, constraint: &Constraint) -> ServiceResult<SimpleExpr> {
    let convert_all = |values: &[Json]| -> ServiceResult<Vec<sea_orm::Value>> {
        values.iter().map(|v| column_value(col, v)).collect()
    };
    Ok(match constraint {
        Constraint::Eq(Json::Null) => col.is_null(),
        Constraint::Eq(v) => col.eq(column_value(col, v)?),
        Constraint::Ne(Json::Null) => col.is_not_null(),
        Constraint::Ne(v) => col.ne(column_value(col, v)?),
        Constraint::In(values) => col.is_in(convert_all(values)?),
        Constraint::Nin(values) => col.is_not_in(convert_all(values)?),
        Constraint::Cmp(cmp, v) => {
            let v = column_value(col, v)?;
            match cmp {
                Comparison::Lt => col.lt(v),
                Comparison::Lte => col.lte(v),
                Comparison::Gt => col.gt(v),
                Comparison::Gte => col.gte(v),
            }
        }
    })
}
