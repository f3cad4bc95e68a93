//! Shape checks and coercion for operation payloads.
//!
//! Payloads are loosely typed [`Value`]s; the functions here only verify and
//! normalize their *shape* (record vs sequence-of-records), they never
//! validate content against a schema. A record is an ordered string-keyed
//! object; an array of `[name, value]` pairs coerces into one.

use serde_json::{Map, Value};

use crate::error::ResourceError;
use crate::operation::Operation;

/// The JSON type name of a value, as used in shape-check error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn not_a_record(op: Operation, received: &'static str) -> ResourceError {
    ResourceError::invalid_argument(format!(
        "Data provided to {op} must be either an array or object; received \"{received}\""
    ))
}

fn not_a_record_list(op: Operation, received: &'static str) -> ResourceError {
    ResourceError::invalid_argument(format!(
        "Data provided to {op} must be either a multi-dimensional array \
         or array of objects; received \"{received}\""
    ))
}

fn bad_list_element(op: Operation, received: &'static str) -> ResourceError {
    ResourceError::invalid_argument(format!(
        "Data provided to {op} must contain only arrays or objects; received \"{received}\""
    ))
}

/// Coerce a payload into a record.
///
/// Objects pass through unchanged. An array whose every element is a
/// `[name, value]` pair with a string name folds into an ordered object.
/// Anything else fails with an `InvalidArgument` naming the operation.
pub fn coerce_record(op: Operation, data: Value) -> Result<Value, ResourceError> {
    match data {
        Value::Object(_) => Ok(data),
        Value::Array(items) => {
            let mut record = Map::new();
            for item in items {
                let Value::Array(pair) = item else {
                    return Err(not_a_record(op, "array"));
                };
                if pair.len() != 2 {
                    return Err(not_a_record(op, "array"));
                }
                let mut pair = pair.into_iter();
                match (pair.next(), pair.next()) {
                    (Some(Value::String(name)), Some(value)) => {
                        record.insert(name, value);
                    }
                    _ => return Err(not_a_record(op, "array")),
                }
            }
            Ok(Value::Object(record))
        }
        other => Err(not_a_record(op, json_type_name(&other))),
    }
}

/// Coerce a payload into a sequence of records.
///
/// The payload must be an array; every element must itself pass the record
/// coercion. Element violations report the element's type, with the same
/// 400-class severity as a top-level shape failure.
pub fn coerce_record_list(op: Operation, data: Value) -> Result<Value, ResourceError> {
    let Value::Array(items) = data else {
        return Err(not_a_record_list(op, json_type_name(&data)));
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(_) => records.push(item),
            Value::Array(_) => {
                let received = json_type_name(&item);
                let record = coerce_record(op, item).map_err(|_| bad_list_element(op, received))?;
                records.push(record);
            }
            other => return Err(bad_list_element(op, json_type_name(&other))),
        }
    }
    Ok(Value::Array(records))
}

/// Validate a deleteList payload: absent/null or a sequence of items/ids.
pub fn check_delete_list(data: Option<Value>) -> Result<Option<Value>, ResourceError> {
    match data {
        None | Some(Value::Null) => Ok(None),
        Some(list @ Value::Array(_)) => Ok(Some(list)),
        Some(other) => Err(ResourceError::invalid_argument(format!(
            "deleteList expects null or an array of items and/or ids; received \"{}\"",
            json_type_name(&other)
        ))),
    }
}
