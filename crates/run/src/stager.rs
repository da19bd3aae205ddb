//! Stager - validate and write playbook data to the key/value store

use crate::kvstore::KvStore;
use crate::variable::{PlaybookDataType, StagedVariable};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use tcex_shared::{Result, TcexError};

/// Stage `value` under `variable` in the `context` hash.
///
/// Returns `Ok(false)` without writing when the value is empty.
pub fn stage(
    store: &dyn KvStore,
    context: &str,
    variable: &StagedVariable,
    value: &Value,
) -> Result<bool> {
    let data_type = variable.playbook_data_type();
    if value.is_null() {
        return Err(invalid(data_type));
    }
    if is_empty(value) {
        tracing::debug!(action = "stage", variable = %variable, "skipping empty value");
        return Ok(false);
    }

    let transformed = transform(data_type, value)?;
    let serialized = serde_json::to_string(&transformed)?;
    store.hset(context, &variable.to_string(), &serialized)?;
    tracing::debug!(action = "stage", context, variable = %variable, "staged");
    Ok(true)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn invalid(data_type: PlaybookDataType) -> TcexError {
    let name = match data_type {
        PlaybookDataType::Unknown => PlaybookDataType::String,
        other => other,
    };
    TcexError::Staging(format!("Invalid data provided for {}.", name))
}

fn transform(data_type: PlaybookDataType, value: &Value) -> Result<Value> {
    match data_type {
        PlaybookDataType::Binary => binary(value).ok_or_else(|| invalid(data_type)),
        PlaybookDataType::KeyValue => key_value(value).ok_or_else(|| invalid(data_type)),
        PlaybookDataType::TCEntity => tc_entity(value).ok_or_else(|| invalid(data_type)),
        PlaybookDataType::String | PlaybookDataType::Unknown => {
            string(value).ok_or_else(|| invalid(data_type))
        }
        PlaybookDataType::BinaryArray => each(value, binary).ok_or_else(|| invalid(data_type)),
        PlaybookDataType::KeyValueArray => {
            each(value, key_value).ok_or_else(|| invalid(data_type))
        }
        PlaybookDataType::StringArray => each(value, string).ok_or_else(|| invalid(data_type)),
        PlaybookDataType::TCEntityArray => {
            each(value, tc_entity).ok_or_else(|| invalid(data_type))
        }
        PlaybookDataType::TCBatch => tc_batch(value).ok_or_else(|| invalid(data_type)),
    }
}

fn each(value: &Value, f: fn(&Value) -> Option<Value>) -> Option<Value> {
    value
        .as_array()?
        .iter()
        .map(f)
        .collect::<Option<Vec<_>>>()
        .map(Value::Array)
}

fn binary(value: &Value) -> Option<Value> {
    let encoded = value.as_str()?;
    STANDARD.decode(encoded).ok()?;
    Some(value.clone())
}

fn key_value(value: &Value) -> Option<Value> {
    let map = value.as_object()?;
    (map.contains_key("key") && map.contains_key("value")).then(|| value.clone())
}

fn tc_entity(value: &Value) -> Option<Value> {
    let map = value.as_object()?;
    ["id", "type", "value"]
        .iter()
        .all(|k| map.contains_key(*k))
        .then(|| value.clone())
}

fn string(value: &Value) -> Option<Value> {
    match value {
        Value::String(_) => Some(value.clone()),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        Value::Number(n) => Some(Value::String(n.to_string())),
        _ => None,
    }
}

fn tc_batch(value: &Value) -> Option<Value> {
    let map = value.as_object()?;
    let lists_ok = ["indicator", "group"]
        .iter()
        .all(|k| map.get(*k).map_or(true, Value::is_array));
    lists_ok.then(|| value.clone())
}
