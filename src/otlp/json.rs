//! JSON rendering of composite OTLP attribute values.
//!
//! Jaeger tags are scalar, so key-value lists and arrays are carried as JSON
//! strings. `serde_json`'s default map is ordered, which keeps the emitted
//! JSON canonical (sorted keys).

use serde_json::{Map, Value};

use crate::proto::otlp::common::{any_value, ArrayValue, KeyValueList};

const INVALID_ARRAY_VALUE: &str = "<Invalid array value>";

pub(crate) fn key_value_list_to_json(list: &KeyValueList) -> String {
    serde_json::to_string(&key_value_list_to_value(list)).unwrap_or_default()
}

pub(crate) fn array_value_to_json(array: &ArrayValue) -> String {
    serde_json::to_string(&array_value_to_value(array)).unwrap_or_default()
}

fn key_value_list_to_value(list: &KeyValueList) -> Value {
    let mut map = Map::new();
    for entry in &list.values {
        let value = match entry.value.as_ref().and_then(|value| value.value.as_ref()) {
            Some(any_value::Value::StringValue(s)) => Value::String(s.clone()),
            Some(any_value::Value::BoolValue(b)) => Value::Bool(*b),
            Some(any_value::Value::IntValue(i)) => Value::from(*i),
            Some(any_value::Value::DoubleValue(d)) => Value::from(*d),
            Some(any_value::Value::KvlistValue(nested)) => key_value_list_to_value(nested),
            Some(any_value::Value::ArrayValue(nested)) => array_value_to_value(nested),
            None => Value::Null,
        };
        map.insert(entry.key.clone(), value);
    }
    Value::Object(map)
}

fn array_value_to_value(array: &ArrayValue) -> Value {
    let values = array
        .values
        .iter()
        .map(|entry| match entry.value.as_ref() {
            Some(any_value::Value::StringValue(s)) => Value::String(s.clone()),
            Some(any_value::Value::BoolValue(b)) => Value::Bool(*b),
            Some(any_value::Value::IntValue(i)) => Value::from(*i),
            Some(any_value::Value::DoubleValue(d)) => Value::from(*d),
            // Jaeger has no representation for containers inside arrays.
            Some(any_value::Value::KvlistValue(_)) | Some(any_value::Value::ArrayValue(_)) => {
                Value::String(INVALID_ARRAY_VALUE.to_owned())
            }
            None => Value::Null,
        })
        .collect();
    Value::Array(values)
}
