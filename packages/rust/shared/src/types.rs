//! Core domain types for standardsriver documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A content document as read from the source collection.
///
/// Field order is preserved (`serde_json` is built with `preserve_order`), so
/// rewriting one field never reshuffles the others.
pub type Document = Map<String, Value>;

/// Content field holding the list of standard short codes.
pub const STANDARDS_FIELD: &str = "standards";

/// Document identifier field.
pub const ID_FIELD: &str = "_id";

/// Top-level version field accompanying a flattened identifier.
pub const VERSION_FIELD: &str = "version";

/// Key of the MongoDB extended-JSON object id wrapper (`{"$oid": "..."}`).
pub const OID_KEY: &str = "$oid";

// Keys of a reference standard record.
pub const DOT_NOTATION_KEY: &str = "dotNotation";
pub const CATEGORY_KEY: &str = "category";
pub const STANDARD_KEY: &str = "standard";
pub const SUB_CATEGORY_KEY: &str = "subCategory";

/// Fields copied from a reference record into an enriched document.
pub const STANDARD_FIELDS: [&str; 4] =
    [CATEGORY_KEY, DOT_NOTATION_KEY, STANDARD_KEY, SUB_CATEGORY_KEY];

// ---------------------------------------------------------------------------
// ObjectId
// ---------------------------------------------------------------------------

/// Number of raw bytes in an object id.
pub const OBJECT_ID_LEN: usize = 12;

/// A 12-byte document base id, displayed as 24 lowercase hex characters.
///
/// The first four bytes hold the big-endian creation time in seconds, as in
/// MongoDB object ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

/// Reasons a string is not an object id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectIdError {
    #[error("expected 24 hex characters, found {len}")]
    InvalidLength { len: usize },

    #[error("non-hex character at position {position}")]
    InvalidHex { position: usize },
}

impl ObjectId {
    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    pub const fn bytes(&self) -> [u8; OBJECT_ID_LEN] {
        self.0
    }

    /// Parse 24 hex characters (either case).
    pub fn parse_str(s: &str) -> std::result::Result<Self, ObjectIdError> {
        let hex = s.as_bytes();
        if hex.len() != OBJECT_ID_LEN * 2 {
            return Err(ObjectIdError::InvalidLength { len: s.chars().count() });
        }

        let mut bytes = [0u8; OBJECT_ID_LEN];
        for (i, pair) in hex.chunks(2).enumerate() {
            let hi = hex_value(pair[0]).ok_or(ObjectIdError::InvalidHex { position: i * 2 })?;
            let lo = hex_value(pair[1]).ok_or(ObjectIdError::InvalidHex { position: i * 2 + 1 })?;
            bytes[i] = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }

    /// Creation time embedded in the first four bytes.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let secs = u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]);
        DateTime::from_timestamp(i64::from(secs), 0).unwrap_or_default()
    }

    /// The typed JSON form, `{"$oid": "<hex>"}`.
    pub fn to_extended_json(&self) -> Value {
        serde_json::json!({ OID_KEY: self.to_string() })
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

/// Serde shape of the extended-JSON wrapper.
#[derive(Serialize, Deserialize)]
struct ExtendedOid {
    #[serde(rename = "$oid")]
    oid: String,
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        ExtendedOid {
            oid: self.to_string(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let ext = ExtendedOid::deserialize(deserializer)?;
        ext.oid.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "530e078118a78ca06c0c1ff7";

    #[test]
    fn object_id_roundtrip() {
        let id: ObjectId = HEX.parse().expect("parse ObjectId");
        assert_eq!(id.to_string(), HEX);
    }

    #[test]
    fn uppercase_hex_displays_lowercase() {
        let id: ObjectId = HEX.to_uppercase().parse().expect("parse uppercase");
        assert_eq!(id.to_string(), HEX);
    }

    #[test]
    fn rejects_wrong_length_and_bad_chars() {
        assert_eq!(
            ObjectId::parse_str("530e"),
            Err(ObjectIdError::InvalidLength { len: 4 })
        );
        assert_eq!(
            ObjectId::parse_str("530e078118a78ca06c0c1fzz"),
            Err(ObjectIdError::InvalidHex { position: 22 })
        );
        assert!(ObjectId::parse_str("").is_err());
    }

    #[test]
    fn timestamp_reads_leading_bytes() {
        let id: ObjectId = HEX.parse().unwrap();
        // 0x530e0781 seconds since the epoch
        assert_eq!(id.timestamp().timestamp(), 0x530e0781);
        assert_eq!(id.timestamp().to_rfc3339(), "2014-02-26T15:25:53+00:00");
    }

    #[test]
    fn serializes_as_extended_json() {
        let id: ObjectId = HEX.parse().unwrap();
        let json = serde_json::to_value(id).expect("serialize");
        assert_eq!(json, serde_json::json!({ "$oid": HEX }));
        assert_eq!(json, id.to_extended_json());

        let back: ObjectId = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn deserialize_rejects_bad_hex() {
        let result: std::result::Result<ObjectId, _> =
            serde_json::from_value(serde_json::json!({ "$oid": "nope" }));
        assert!(result.is_err());
    }
}
