//! Character style and voice configuration are kept as text columns, and older rows
//! hold either a JSON object or that object serialized into a string. Everything that
//! reads them goes through [`parse_stored`] once, at the persistence boundary.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parse a stored JSON value that may be the object itself or its string form.
pub fn parse_stored<T: DeserializeOwned>(value: Value) -> Result<T, serde_json::Error> {
    match value {
        Value::String(text) => serde_json::from_str(&text),
        other => serde_json::from_value(other),
    }
}

/// Parse the raw contents of a text column.
pub fn parse_stored_text<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    parse_stored(serde_json::from_str::<Value>(text)?)
}

/// `deserialize_with` adapter for fields that accept both stored forms.
pub fn json_or_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    parse_stored(value).map_err(D::Error::custom)
}
