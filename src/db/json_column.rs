//! Structured-document column codec
//!
//! Wraps a serde-serializable value stored in a JSON/JSONB column. The
//! codec is deliberately independent of any driver's scan protocol:
//! repositories read the column as bytes/text/`serde_json::Value` and go
//! through these conversions explicitly.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// A typed view over a JSON column value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonColumn<T> {
    pub item: T,
}

impl<T> JsonColumn<T> {
    pub fn new(item: T) -> Self {
        Self { item }
    }

    pub fn into_inner(self) -> T {
        self.item
    }
}

impl<T: Serialize> JsonColumn<T> {
    /// Encode for a write, as a JSON value suitable for binding.
    pub fn to_value(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(&self.item)
    }

    /// Encode for a write, as raw bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.item)
    }
}

impl<T: DeserializeOwned + Default> JsonColumn<T> {
    /// Decode from a fetched JSON value. A SQL NULL (absent value or JSON
    /// null) decodes to the type's default, matching a nullable column.
    pub fn from_value(value: Option<JsonValue>) -> Result<Self, serde_json::Error> {
        match value {
            None | Some(JsonValue::Null) => Ok(Self::default()),
            Some(v) => Ok(Self {
                item: serde_json::from_value(v)?,
            }),
        }
    }

    /// Decode from raw bytes, as returned by binary-protocol scans.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self {
            item: serde_json::from_slice(bytes)?,
        })
    }

    /// Decode from column text, as returned by text-protocol scans.
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        Self::from_bytes(text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Doc {
        label: String,
        weight: i64,
    }

    #[test]
    fn test_value_round_trip() {
        let col = JsonColumn::new(Doc {
            label: "x".into(),
            weight: 7,
        });
        let value = col.to_value().unwrap();
        let back = JsonColumn::<Doc>::from_value(Some(value)).unwrap();
        assert_eq!(back, col);
    }

    #[test]
    fn test_null_decodes_to_default() {
        assert_eq!(JsonColumn::<Doc>::from_value(None).unwrap(), JsonColumn::default());
        assert_eq!(
            JsonColumn::<Doc>::from_value(Some(JsonValue::Null)).unwrap(),
            JsonColumn::default()
        );
        assert_eq!(JsonColumn::<Doc>::from_bytes(b"").unwrap(), JsonColumn::default());
    }

    #[test]
    fn test_text_and_bytes_agree() {
        let text = r#"{"label":"y","weight":-2}"#;
        let from_text = JsonColumn::<Doc>::from_text(text).unwrap();
        let from_bytes = JsonColumn::<Doc>::from_bytes(text.as_bytes()).unwrap();
        assert_eq!(from_text, from_bytes);
        assert_eq!(from_text.item.weight, -2);
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        assert!(JsonColumn::<Doc>::from_text("{not json").is_err());
        assert!(JsonColumn::<Doc>::from_value(Some(JsonValue::from(42))).is_err());
    }
}
