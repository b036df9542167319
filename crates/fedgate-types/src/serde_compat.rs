//! Serde helpers for the JSON wire formats.
//!
//! Byte fields travel as standard base64 strings, and identifier fields
//! written by older peers may be `null` instead of an empty string. These
//! helpers keep both cases from failing the whole message.

use serde::de::{self, Deserializer, Visitor};
use std::fmt;

/// `#[serde(with = "base64_bytes")]` for `Vec<u8>` fields.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::de::{self, Deserializer};
    use serde::{Deserialize, Serializer};

    pub fn serialize<T, S>(bytes: T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: AsRef<[u8]>,
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes.as_ref()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| de::Error::custom(format!("invalid base64: {e}")))
    }
}

/// `#[serde(with = "base64_bytes_opt")]` for `Option<Vec<u8>>` fields.
///
/// `null` and a missing field both read back as `None`.
pub mod base64_bytes_opt {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::de::{self, Deserializer};
    use serde::{Deserialize, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(b) => serializer.serialize_some(&STANDARD.encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map(Some)
                .map_err(|e| de::Error::custom(format!("invalid base64: {e}"))),
            None => Ok(None),
        }
    }
}

/// Deserialize a `String` leniently: `null` becomes an empty string and
/// numbers are rendered to their decimal form (party ids are sometimes
/// written as bare integers).
pub fn string_lenient<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringLenientVisitor;

    impl<'de> Visitor<'de> for StringLenientVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string, an integer or null")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(String::new())
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(StringLenientVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Blob {
        #[serde(with = "base64_bytes", default)]
        data: Vec<u8>,
        #[serde(with = "base64_bytes_opt", default)]
        extra: Option<Vec<u8>>,
    }

    #[derive(Debug, Deserialize)]
    struct Party {
        #[serde(deserialize_with = "string_lenient", default)]
        id: String,
    }

    #[test]
    fn test_base64_fields_encode_as_strings() {
        let blob = Blob {
            data: b"ping".to_vec(),
            extra: None,
        };
        let json = serde_json::to_string(&blob).unwrap();
        assert!(json.contains("\"cGluZw==\""));
        assert!(json.contains("\"extra\":null"));
        let back: Blob = serde_json::from_str(&json).unwrap();
        assert_eq!(back, blob);
    }

    #[test]
    fn test_base64_null_and_missing() {
        let blob: Blob = serde_json::from_str(r#"{"data":null}"#).unwrap();
        assert!(blob.data.is_empty());
        assert!(blob.extra.is_none());
    }

    #[test]
    fn test_base64_rejects_garbage() {
        let result: Result<Blob, _> = serde_json::from_str(r#"{"data":"%%%"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_string_lenient_accepts_numbers_and_null() {
        let p: Party = serde_json::from_str(r#"{"id":10000}"#).unwrap();
        assert_eq!(p.id, "10000");
        let p: Party = serde_json::from_str(r#"{"id":null}"#).unwrap();
        assert_eq!(p.id, "");
        let p: Party = serde_json::from_str(r#"{"id":"guest"}"#).unwrap();
        assert_eq!(p.id, "guest");
    }
}
