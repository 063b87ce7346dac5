//! JSON value encoding for records and position entries.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Value encoding failure, classified by direction.
#[derive(Debug)]
pub enum CodecError {
    /// The value could not be serialized; usually a programming error.
    Serialize(serde_json::Error),
    /// The stored payload under `key` is corrupt or has an unexpected shape.
    Malformed {
        key: String,
        source: serde_json::Error,
    },
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialize(err) => write!(f, "failed to serialize value: {err}"),
            Self::Malformed { key, source } => {
                write!(f, "malformed value under `{key}`: {source}")
            }
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialize(err) => Some(err),
            Self::Malformed { source, .. } => Some(source),
        }
    }
}

pub fn encode<T: Serialize>(value: &T) -> Result<String, CodecError> {
    serde_json::to_string(value).map_err(CodecError::Serialize)
}

/// Decodes the value read from `key`. The key only feeds the error report.
pub fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, CodecError> {
    serde_json::from_str(raw).map_err(|source| CodecError::Malformed {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{decode, encode, CodecError};
    use crate::model::area::Thing;
    use crate::model::item::{Item, ItemState};

    #[test]
    fn records_encode_as_json() {
        let item = Item::new(3, "Title", "Body").with_state(ItemState::Archived);
        let raw = encode(&item).unwrap();
        assert!(raw.contains("\"state\":\"archived\""));
        assert_eq!(decode::<Item>("i/3", &raw).unwrap(), item);
    }

    #[test]
    fn things_carry_an_explicit_tag() {
        let raw = encode(&Thing::List(4)).unwrap();
        assert_eq!(raw, r#"{"kind":"list","id":4}"#);
    }

    #[test]
    fn corrupt_payload_is_malformed_with_key() {
        let err = decode::<Item>("i/7", "{not json").unwrap_err();
        match err {
            CodecError::Malformed { key, .. } => assert_eq!(key, "i/7"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn schema_mismatch_is_malformed() {
        let err = decode::<u64>("li/1/1", r#"{"kind":"item","id":1}"#).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }
}
