//! Domain types and DTOs
//!
//! One row struct per catalogue table, with the request DTOs used to
//! create and update it.

pub mod accounts;
pub mod activity;
pub mod bids;
pub mod evaluation;
pub mod integrations;
pub mod reference;
pub mod roles;
pub mod tenancy;
pub mod tenders;

pub use accounts::*;
pub use activity::*;
pub use bids::*;
pub use evaluation::*;
pub use integrations::*;
pub use reference::*;
pub use roles::*;
pub use tenancy::*;
pub use tenders::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

pub(crate) fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`)
/// so that partial updates can clear nullable columns
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Binary columns travel as standard base64 in JSON
pub(crate) mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<u8>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|encoded| STANDARD.decode(encoded.as_bytes()))
                .transpose()
                .map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        parent: Option<Option<u32>>,
        #[serde(default, with = "base64_bytes::option")]
        content: Option<Vec<u8>>,
    }

    #[test]
    fn nullable_separates_absent_from_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.parent, None);

        let cleared: Patch = serde_json::from_str(r#"{"parent": null}"#).unwrap();
        assert_eq!(cleared.parent, Some(None));

        let set: Patch = serde_json::from_str(r#"{"parent": 7}"#).unwrap();
        assert_eq!(set.parent, Some(Some(7)));
    }

    #[test]
    fn content_is_base64() {
        let patch: Patch = serde_json::from_str(r#"{"content": "aGVsbG8="}"#).unwrap();
        assert_eq!(patch.content.as_deref(), Some(&b"hello"[..]));

        assert!(serde_json::from_str::<Patch>(r#"{"content": "not base64!"}"#).is_err());
    }
}
