use chrono::NaiveDateTime;

use crate::{
    value::TIMESTAMP_FORMAT,
    wire::{ApiError, ErrorEnvelope},
    Row, Value,
};

/// Decodes one JSON row object into a [`Row`], keeping key order.
pub(crate) fn decode_row(raw: serde_json::Value) -> Result<Row, String> {
    let object = match raw {
        serde_json::Value::Object(object) => object,
        other => return Err(format!("expected row object, got {}", json_kind(&other))),
    };

    let mut row = Row::new();
    for (name, value) in object {
        let value = decode_value(value)
            .map_err(|err| format!("invalid value in column '{name}': {err}"))?;
        row.push(name, value);
    }
    Ok(row)
}

pub(crate) fn decode_value(value: serde_json::Value) -> Result<Value, String> {
    match value {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(value) => Ok(Value::Bool(value)),
        serde_json::Value::Number(number) => {
            if let Some(value) = number.as_i64() {
                Ok(Value::Integer(value))
            } else {
                number
                    .as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| format!("unsupported number '{number}'"))
            }
        }
        serde_json::Value::String(text) => {
            Ok(match NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT) {
                Ok(stamp) => Value::Timestamp(stamp),
                Err(_) => Value::Text(text),
            })
        }
        other => Err(format!("expected scalar, got {}", json_kind(&other))),
    }
}

impl ApiError {
    /// Most specific human-readable message in the payload.
    pub(crate) fn describe(&self) -> String {
        let detail_message = self.detail.as_ref().and_then(|detail| {
            detail
                .details
                .iter()
                .filter_map(|entry| entry.detail.as_ref()?.value.clone())
                .next()
                .or_else(|| detail.code.clone())
        });

        self.message
            .clone()
            .or(detail_message)
            .or_else(|| self.code.clone())
            .unwrap_or_else(|| "unknown server error".to_owned())
    }
}

/// Message for a non-success HTTP status, preferring the API's own error text.
pub(crate) fn describe_http_error(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!("http error {status}: {}", envelope.error.describe()),
        Err(_) if body.trim().is_empty() => format!("http error {status}"),
        Err(_) => format!("http error {status}: {}", body.trim()),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
