//! Core traits and types for document representation and serialization.
//!
//! Every stored record carries a [`DocumentMeta`] block holding the store-assigned
//! identity and revision plus the repository's timestamp bookkeeping. Concrete record
//! types expose that block through the [`Document`] trait; [`JsonDocument`] covers
//! callers that work with free-form JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, from_value, to_value};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Identity, revision and timestamps shared by every stored document.
///
/// The revision is always `_rev`. A body field named `rev` belongs to the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DocumentMeta {
    /// Creates metadata for a document that has not been stored yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates metadata with a caller-chosen identity and no revision.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }
}

/// Core trait that all documents stored through a repository must implement.
///
/// # Example
///
/// ```ignore
/// use docsync::document::{Document, DocumentMeta};
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct User {
///     #[serde(flatten)]
///     pub meta: DocumentMeta,
///     pub name: String,
/// }
///
/// impl Document for User {
///     fn meta(&self) -> &DocumentMeta {
///         &self.meta
///     }
///
///     fn meta_mut(&mut self) -> &mut DocumentMeta {
///         &mut self.meta
///     }
/// }
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// Returns this document's metadata block.
    fn meta(&self) -> &DocumentMeta;

    /// Returns a mutable reference to this document's metadata block.
    fn meta_mut(&mut self) -> &mut DocumentMeta;

    /// Returns the store-assigned identity, if the document has been stored.
    fn id(&self) -> Option<&str> {
        self.meta().id.as_deref()
    }

    /// Returns the current revision token, if any.
    fn rev(&self) -> Option<&str> {
        self.meta().rev.as_deref()
    }
}

/// Extension trait providing JSON conversion utilities for documents.
///
/// This trait is automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a JSON value for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the document does not serialize to an object.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a document from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the structure is invalid.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_json(&self) -> DocumentStoreResult<Value> {
        let value = to_value(self)?;

        if !value.is_object() {
            return Err(DocumentStoreError::InvalidArgument(
                "Documents must serialize to a JSON object".into(),
            ));
        }

        Ok(value)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

/// An untyped document: metadata plus an arbitrary JSON object body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonDocument {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl JsonDocument {
    /// Creates an unsaved document from a JSON object body.
    pub fn new(body: Map<String, Value>) -> Self {
        Self {
            meta: DocumentMeta::new(),
            body,
        }
    }

    /// Returns a field of the body.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.body.get(field)
    }

    /// Sets a field of the body, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.body.insert(field.into(), value.into())
    }
}

impl Document for JsonDocument {
    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }
}

impl TryFrom<Value> for JsonDocument {
    type Error = DocumentStoreError;

    fn try_from(value: Value) -> DocumentStoreResult<Self> {
        match value {
            Value::Object(_) => Ok(from_value(value)?),
            _ => Err(DocumentStoreError::InvalidArgument(
                "Documents must be JSON objects".into(),
            )),
        }
    }
}
