use crate::error::ContextError;
use crate::value::Value;
pub use serde_json::Value as JsonValue;


pub(crate) fn to_value(name: &str, json: &JsonValue) -> Result<Value, ContextError> {
    match json {
        JsonValue::Null => Ok(Value::None),
        JsonValue::Bool(b) => Ok(Value::Bool(*b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Int(i)),
            None => n.as_f64()
                .map(Value::Float)
                .ok_or_else(|| unsupported(name, "number out of range"))
        },
        JsonValue::String(s) => Ok(Value::Str(s.clone())),
        JsonValue::Array(seq) => seq.iter()
            .map(|item| to_value(name, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        JsonValue::Object(_) => Err(unsupported(name, "object"))
    }
}

pub(crate) fn kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn unsupported(name: &str, kind: &'static str) -> ContextError {
    ContextError::Unsupported { name: name.to_owned(), kind }
}
