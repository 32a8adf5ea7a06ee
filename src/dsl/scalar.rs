//! Text fields accept any scalar. A `${port}` placeholder that resolves to
//! `8080` reaches the model as a number, and is kept as `"8080"`.

use serde::de::{Deserializer, Error};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// `None` for null; objects and sequences are rejected.
pub(crate) fn text<E: Error>(value: Value) -> Result<Option<String>, E> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(E::custom(format!("expected a scalar, found {}", other))),
    }
}

/// Null reads as the empty string.
pub(crate) fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(text::<D::Error>(Value::deserialize(deserializer)?)?.unwrap_or_default())
}

pub(crate) fn opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    text::<D::Error>(Value::deserialize(deserializer)?)
}

pub(crate) fn string_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error> {
    Option::<BTreeMap<String, Value>>::deserialize(deserializer)?
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| Ok((key, text::<D::Error>(value)?.unwrap_or_default())))
        .collect()
}
