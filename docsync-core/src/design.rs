//! View definition sources and the design documents they are persisted as.
//!
//! A definition source is a JSON payload of the form
//!
//! ```json
//! {
//!     "views": {
//!         "all": { "map": "function(doc) { emit(null, doc); }" },
//!         "byName": { "map": "function(doc) { emit(doc.name, doc); }" }
//!     },
//!     "language": "javascript"
//! }
//! ```
//!
//! View bodies are opaque to this crate. Top-level fields other than `views` are carried
//! into the design document unchanged, except for the fields the store and the
//! synchronizer manage themselves (`_id`, `_rev`, `hash`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, from_value};
use std::collections::BTreeMap;

use crate::{
    document::{Document, DocumentMeta},
    error::{DocumentStoreError, DocumentStoreResult},
    fingerprint::Fingerprint,
};

/// View name to opaque view body.
pub type ViewDefinitionSet = BTreeMap<String, Value>;

const MANAGED_FIELDS: [&str; 4] = ["_id", "_rev", "rev", "hash"];

/// Returns the identity of the design document backing `collection`.
pub fn design_id(collection: &str) -> String {
    format!("_design/{collection}")
}

/// A parsed view definition source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDefinitionSource {
    pub views: ViewDefinitionSet,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ViewDefinitionSource {
    /// Parses a definition source from its raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Serialization`] if the bytes are not JSON and
    /// [`DocumentStoreError::InvalidDefinition`] if they are not an object with a
    /// `views` object.
    pub fn parse(raw: &[u8]) -> DocumentStoreResult<Self> {
        let mut object = match serde_json::from_slice::<Value>(raw)? {
            Value::Object(object) => object,
            _ => {
                return Err(DocumentStoreError::InvalidDefinition(
                    "definition source must be a JSON object".into(),
                ));
            }
        };

        let views = match object.remove("views") {
            Some(views @ Value::Object(_)) => from_value::<ViewDefinitionSet>(views)?,
            Some(_) => {
                return Err(DocumentStoreError::InvalidDefinition(
                    "`views` must be an object of view name to view body".into(),
                ));
            }
            None => {
                return Err(DocumentStoreError::InvalidDefinition(
                    "definition source has no `views` object".into(),
                ));
            }
        };

        for field in MANAGED_FIELDS {
            object.remove(field);
        }

        Ok(Self {
            views,
            extra: object,
        })
    }
}

/// The persisted form of a collection's view definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignDocument {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    #[serde(default)]
    pub views: ViewDefinitionSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<Fingerprint>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DesignDocument {
    /// Builds the design document for `collection` from a parsed source and its fingerprint.
    ///
    /// The result carries no revision; set one with [`DesignDocument::with_rev`] when
    /// replacing a stored document.
    pub fn from_source(collection: &str, source: ViewDefinitionSource, hash: Fingerprint) -> Self {
        Self {
            meta: DocumentMeta::with_id(design_id(collection)),
            views: source.views,
            hash: Some(hash),
            extra: source.extra,
        }
    }

    pub fn with_rev(mut self, rev: Option<String>) -> Self {
        self.meta.rev = rev;
        self
    }
}

impl Document for DesignDocument {
    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }
}

/// The parts of a stored design document the synchronizer compares against.
///
/// `hash` is read as any JSON value. A design document written by another tool may
/// carry a hash of a different type, which simply never matches.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct StoredDesign {
    #[serde(rename = "_rev", default)]
    pub rev: Option<String>,
    #[serde(default)]
    pub hash: Option<Value>,
}

impl StoredDesign {
    /// Returns `true` if the stored hash is exactly `fingerprint`.
    pub fn matches(&self, fingerprint: &Fingerprint) -> bool {
        self.hash
            .as_ref()
            .and_then(Value::as_str)
            .is_some_and(|hash| hash == fingerprint.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentExt;
    use serde_json::json;

    #[test]
    fn parse_keeps_extra_fields_and_drops_managed_ones() {
        let raw = br#"{
            "_rev": "9-stale",
            "hash": "bogus",
            "language": "javascript",
            "views": { "all": { "map": "function(doc) { emit(null, doc); }" } }
        }"#;

        let source = ViewDefinitionSource::parse(raw).unwrap();

        assert_eq!(source.views.len(), 1);
        assert!(source.views.contains_key("all"));
        assert_eq!(source.extra.get("language"), Some(&json!("javascript")));
        assert!(source.extra.get("_rev").is_none());
        assert!(source.extra.get("hash").is_none());
    }

    #[test]
    fn parse_rejects_sources_without_views() {
        assert!(matches!(
            ViewDefinitionSource::parse(br#"{"language":"javascript"}"#),
            Err(DocumentStoreError::InvalidDefinition(_))
        ));
        assert!(matches!(
            ViewDefinitionSource::parse(br#"{"views":[]}"#),
            Err(DocumentStoreError::InvalidDefinition(_))
        ));
        assert!(matches!(
            ViewDefinitionSource::parse(b"not json"),
            Err(DocumentStoreError::Serialization(_))
        ));
    }

    #[test]
    fn stored_hashes_of_any_type_are_compared_without_failing() {
        let fingerprint = Fingerprint::from_hex("abc");
        let stored = |value: Value| serde_json::from_value::<StoredDesign>(value).unwrap();

        assert!(stored(json!({ "_rev": "1-a", "hash": "abc" })).matches(&fingerprint));
        assert!(!stored(json!({ "_rev": "1-a", "hash": "abd" })).matches(&fingerprint));
        assert!(!stored(json!({ "_rev": "1-a", "hash": 5 })).matches(&fingerprint));
        assert!(!stored(json!({ "_rev": "1-a", "hash": { "md5": "abc" } })).matches(&fingerprint));
        assert!(!stored(json!({ "_rev": "1-a" })).matches(&fingerprint));
    }

    #[test]
    fn design_document_serializes_in_store_layout() {
        let source = ViewDefinitionSource::parse(br#"{"views":{"all":{"map":"m"}}}"#).unwrap();
        let document = DesignDocument::from_source("people", source, Fingerprint::from_hex("abc"))
            .with_rev(Some("2-xyz".into()));

        assert_eq!(
            document.to_json().unwrap(),
            json!({
                "_id": "_design/people",
                "_rev": "2-xyz",
                "views": { "all": { "map": "m" } },
                "hash": "abc",
            })
        );
    }
}
