//! Manifest decoding
//!
//! Turns rendered plugin manifests into `DynamicObject`s. Any group/kind is
//! accepted; only the identity fields needed to apply the document are checked.

use kube::api::DynamicObject;
use serde_json::Value;

use crate::yaml::parse_first_document;
use crate::Error;

/// Decode rendered manifest text into a generic document.
///
/// Fails with [`Error::Decode`] if the text is not YAML/JSON, holds no document,
/// is not a mapping, or lacks `apiVersion`, `kind` or `metadata.name`.
pub fn decode_manifest(text: &str) -> Result<DynamicObject, Error> {
    let value = parse_first_document(text)
        .map_err(|e| Error::decode(format!("invalid YAML: {e}")))?
        .ok_or_else(|| Error::decode("manifest is empty"))?;

    if !value.is_object() {
        return Err(Error::decode("manifest is not a mapping"));
    }

    require_str(&value, "/apiVersion", "apiVersion")?;
    require_str(&value, "/kind", "kind")?;
    require_str(&value, "/metadata/name", "metadata.name")?;

    serde_json::from_value(value).map_err(|e| Error::decode(e.to_string()))
}

fn require_str<'a>(value: &'a Value, pointer: &str, field: &str) -> Result<&'a str, Error> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::decode(format!("manifest missing {field}")))
}

/// Returns `(apiVersion, kind)` of a decoded document
pub fn type_of(doc: &DynamicObject) -> Result<(&str, &str), Error> {
    doc.types
        .as_ref()
        .map(|t| (t.api_version.as_str(), t.kind.as_str()))
        .ok_or_else(|| Error::decode("document has no apiVersion/kind"))
}
