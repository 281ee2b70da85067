//! Field-level decoding helpers
//!
//! Small shape checks shared by the page decoders. Each one reports the path
//! it was asked to check so the resulting `SchemaViolation` is precise.

use super::types::TokenResponse;
use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// Build a path like `categories[2].Link`
pub fn field_path(root: &str, index: Option<usize>, field: Option<&str>) -> String {
    let mut path = root.to_string();
    if let Some(i) = index {
        path.push_str(&format!("[{i}]"));
    }
    if let Some(f) = field {
        path.push('.');
        path.push_str(f);
    }
    path
}

/// Short name of a JSON value's type, for error messages
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Require a JSON object
pub fn expect_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::schema(path, format!("expected object, got {}", type_name(value))))
}

/// Require a present JSON array
pub fn expect_array<'a>(value: Option<&'a Value>, path: &str) -> Result<&'a Vec<Value>> {
    match value {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(Error::schema(
            path,
            format!("expected array, got {}", type_name(other)),
        )),
        None => Err(Error::schema(path, "missing required field")),
    }
}

/// Require a present JSON string
pub fn expect_string<'a>(value: Option<&'a Value>, path: &str) -> Result<&'a str> {
    match value {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(Error::schema(
            path,
            format!("expected string, got {}", type_name(other)),
        )),
        None => Err(Error::schema(path, "missing required field")),
    }
}

/// `count` is optional but must be an integer when present
pub(super) fn optional_count(obj: &Map<String, Value>) -> Result<Option<i64>> {
    match obj.get("count") {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| {
            Error::schema("count", format!("expected integer, got {}", type_name(value)))
        }),
    }
}

/// Decode the body of the auth endpoint
pub fn decode_token(body: &Value) -> Result<TokenResponse> {
    let obj = expect_object(body, "$")?;
    let token = expect_string(obj.get("token"), "token")?;
    Ok(TokenResponse {
        token: token.to_string(),
    })
}
