//! Versioned document identifiers.
//!
//! Content items are keyed by a base [`ObjectId`] plus an integer version.
//! Depending on migration state a document stores that pair either flat
//! (`_id` + top-level `version`) or as a composite object
//! (`_id: { _id, version }`). Outside the document the pair travels as a
//! single string, `"<24 hex>:<version>"`.
//!
//! The bare `"<24 hex>"` string is a legacy form: it is accepted when
//! decoding, but [`encode`] always writes the versioned form.

use serde_json::{Map, Value, json};
use tracing::warn;

use standardsriver_shared::{Document, FieldNames, ID_FIELD, IdError, OID_KEY, ObjectId};

use crate::source::json_kind;

/// Separator between base id and version in the string form.
pub const VERSION_SEPARATOR: char = ':';

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// A base id and its version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionedId {
    pub id: ObjectId,
    pub version: u64,
}

impl VersionedId {
    pub fn new(id: ObjectId, version: u64) -> Self {
        Self { id, version }
    }
}

impl std::fmt::Display for VersionedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{VERSION_SEPARATOR}{}", self.id, self.version)
    }
}

/// Encode a base id and version as `"<id>:<version>"`.
pub fn encode(id: &ObjectId, version: u64) -> String {
    VersionedId::new(*id, version).to_string()
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// The identifier shapes a caller may hand to [`decode_base_id`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IdInput<'a> {
    /// An already-typed base id (`{"$oid": ".."}` in JSON).
    Typed(ObjectId),
    /// `"<id>:<version>"` or a bare `"<id>"`.
    Text(&'a str),
    /// A composite object embedding the base id under `_id`.
    Composite(&'a Map<String, Value>),
}

impl<'a> IdInput<'a> {
    /// Classify a JSON value.
    pub fn from_value(value: &'a Value) -> Result<Self, IdError> {
        match value {
            Value::String(text) => Ok(Self::Text(text)),
            Value::Object(map) if is_oid_wrapper(map) => typed_oid(map).map(Self::Typed),
            Value::Object(map) => Ok(Self::Composite(map)),
            other => Err(IdError::Unsupported {
                found: json_kind(other),
            }),
        }
    }
}

impl From<ObjectId> for IdInput<'_> {
    fn from(id: ObjectId) -> Self {
        Self::Typed(id)
    }
}

impl<'a> From<&'a str> for IdInput<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

/// Recover the base id, discarding any version.
pub fn decode_base_id(input: &IdInput<'_>) -> Result<ObjectId, IdError> {
    decode_with(input, ID_FIELD)
}

/// Classify and decode a JSON value in one step.
pub fn decode_value(value: &Value) -> Result<ObjectId, IdError> {
    decode_base_id(&IdInput::from_value(value)?)
}

fn decode_with(input: &IdInput<'_>, id_field: &str) -> Result<ObjectId, IdError> {
    match *input {
        IdInput::Typed(id) => Ok(id),
        IdInput::Text(text) => {
            let head = text
                .split_once(VERSION_SEPARATOR)
                .map_or(text, |(head, _)| head);
            ObjectId::parse_str(head).map_err(|source| IdError::MalformedObjectId {
                input: text.to_owned(),
                source,
            })
        }
        IdInput::Composite(map) => {
            let embedded = map.get(id_field).ok_or_else(|| IdError::MissingField {
                field: id_field.to_owned(),
            })?;
            let inner = IdInput::from_value(embedded).map_err(|err| match err {
                IdError::Unsupported { found } => IdError::WrongFieldType {
                    field: id_field.to_owned(),
                    expected: "an object id, string or composite id",
                    found,
                },
                other => other,
            })?;
            decode_with(&inner, id_field)
        }
    }
}

fn is_oid_wrapper(map: &Map<String, Value>) -> bool {
    map.len() == 1 && map.contains_key(OID_KEY)
}

fn typed_oid(map: &Map<String, Value>) -> Result<ObjectId, IdError> {
    match map.get(OID_KEY) {
        Some(Value::String(hex)) => {
            ObjectId::parse_str(hex).map_err(|source| IdError::MalformedObjectId {
                input: hex.clone(),
                source,
            })
        }
        Some(other) => Err(IdError::WrongFieldType {
            field: OID_KEY.to_owned(),
            expected: "a string",
            found: json_kind(other),
        }),
        None => Err(IdError::MissingField {
            field: OID_KEY.to_owned(),
        }),
    }
}

/// String form of an identifier value as stored in a document.
///
/// - `null` → `None`
/// - a typed id → its bare hex form
/// - a composite `{ _id, version }` → `"<id>:<version>"`
///
/// Anything else, or a composite missing either field, is an error.
pub fn versioned_id_string(value: &Value) -> Result<Option<String>, IdError> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) if is_oid_wrapper(map) => {
            typed_oid(map).map(|id| Some(id.to_string()))
        }
        Value::Object(map) => {
            let id = decode_with(&IdInput::Composite(map), ID_FIELD)?;
            let fields = FieldNames::default();
            let raw = map.get(&fields.version).ok_or_else(|| IdError::MissingField {
                field: fields.version.clone(),
            })?;
            let version = parse_version(raw).ok_or_else(|| IdError::WrongFieldType {
                field: fields.version.clone(),
                expected: "a non-negative integer",
                found: json_kind(raw),
            })?;
            Ok(Some(encode(&id, version)))
        }
        other => Err(IdError::Unsupported {
            found: json_kind(other),
        }),
    }
}

// ---------------------------------------------------------------------------
// Range queries
// ---------------------------------------------------------------------------

/// Query condition matching identifiers greater than `cursor`, whether the
/// document stores them flat (`_id`) or nested (`_id._id`).
pub fn range_condition(cursor: &str) -> Value {
    range_condition_for(ID_FIELD, cursor)
}

/// [`range_condition`] over a custom identifier field.
pub fn range_condition_for(id_field: &str, cursor: &str) -> Value {
    let nested = format!("{id_field}.{id_field}");
    json!({
        "$or": [
            { id_field: { "$gt": cursor } },
            { nested: { "$gt": cursor } }
        ]
    })
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Why a document identifier was left as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("version {found} is not a non-negative integer")]
    InvalidVersion { found: String },

    #[error(transparent)]
    Identifier(#[from] IdError),
}

/// Result of [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalization {
    /// The identifier was flattened and the version field set.
    Normalized(VersionedId),
    /// The document has no identifier field.
    NoIdentifier,
    /// The identifier could not be understood; the document was not touched.
    Unchanged(NormalizeError),
}

impl Normalization {
    pub fn is_normalized(&self) -> bool {
        matches!(self, Self::Normalized(_))
    }

    pub fn versioned_id(&self) -> Option<VersionedId> {
        match self {
            Self::Normalized(id) => Some(*id),
            _ => None,
        }
    }
}

/// Flatten the document identifier using the default field names.
pub fn normalize(doc: &mut Document) -> Normalization {
    normalize_with(doc, &FieldNames::default())
}

/// Flatten `doc[fields.id]` to a typed base id and set `doc[fields.version]`.
///
/// The version comes from the top-level version field if present, otherwise
/// from inside a composite identifier (searched recursively), otherwise 0.
/// On failure the document is returned untouched and the reason is logged.
pub fn normalize_with(doc: &mut Document, fields: &FieldNames) -> Normalization {
    let Some(id_value) = doc.get(&fields.id) else {
        return Normalization::NoIdentifier;
    };

    let resolved = IdInput::from_value(id_value)
        .and_then(|input| decode_with(&input, &fields.id))
        .map_err(NormalizeError::from)
        .and_then(|id| Ok(VersionedId::new(id, find_version(doc, fields)?)));

    match resolved {
        Ok(versioned) => {
            if let Some(slot) = doc.get_mut(&fields.id) {
                *slot = versioned.id.to_extended_json();
            }
            doc.insert(fields.version.clone(), json!(versioned.version));
            Normalization::Normalized(versioned)
        }
        Err(err) => {
            warn!(error = %err, field = %fields.id, "leaving document identifier unchanged");
            Normalization::Unchanged(err)
        }
    }
}

fn find_version(
    container: &Map<String, Value>,
    fields: &FieldNames,
) -> Result<u64, NormalizeError> {
    if let Some(raw) = container.get(&fields.version) {
        return parse_version(raw).ok_or_else(|| NormalizeError::InvalidVersion {
            found: raw.to_string(),
        });
    }
    match container.get(&fields.id) {
        Some(Value::Object(inner)) if !is_oid_wrapper(inner) => find_version(inner, fields),
        _ => Ok(0),
    }
}

/// Read a version stored as a JSON integer, an integral float, a decimal
/// string, or an extended-JSON `$numberLong`/`$numberInt` wrapper.
pub fn parse_version(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            let f = n.as_f64()?;
            (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64)
                .then_some(f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(map) if map.len() == 1 => map
            .get("$numberLong")
            .or_else(|| map.get("$numberInt"))
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok()),
        _ => None,
    }
}
