//! Column-by-column merge of JSON payloads into active models.

use sea_orm::{ActiveModelTrait, EntityTrait, IdenStatic};
use serde_json::{Map, Value};

use crate::errors::{ServiceError, ServiceResult};
use crate::query::{column, value::to_value};

/// Payload object, or `InvalidData` for anything else.
pub fn payload_object(data: &Value) -> ServiceResult<&Map<String, Value>> {
    data.as_object()
        .ok_or_else(|| ServiceError::InvalidData(format!("record payload must be an object, got {data}")))
}

/// Assign every payload field onto `am`.
///
/// A payload value for the `skip` column is ignored, so identity stays fixed
/// once a record exists. Unknown fields and values that do not fit their
/// column are rejected.
pub fn merge<E: EntityTrait>(
    am: &mut E::ActiveModel,
    payload: &Map<String, Value>,
    skip: Option<E::Column>,
) -> ServiceResult<()> {
    for (key, value) in payload {
        let col = column::<E>(key).map_err(|_| ServiceError::InvalidData(format!("unknown field '{key}'")))?;
        if skip.is_some_and(|s| s.as_str() == col.as_str()) {
            continue;
        }
        let v = to_value(&sea_orm::ColumnTrait::def(&col), value)
            .map_err(|e| ServiceError::InvalidData(format!("{key}: {e}")))?;
        am.try_set(col, v).map_err(|e| ServiceError::InvalidData(format!("{key}: {e}")))?;
    }
    Ok(())
}

/// Fresh active model for `payload`, seeded by the entity's
/// `ActiveModelBehavior::new`.
pub fn build<E: EntityTrait>(payload: &Map<String, Value>) -> ServiceResult<E::ActiveModel> {
    let mut am = <E::ActiveModel as sea_orm::ActiveModelBehavior>::new();
    merge::<E>(&mut am, payload, None)?;
    Ok(am)
}
