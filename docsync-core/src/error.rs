//! Error types and result types for repository and store operations.
//!
//! This module provides error handling for every repository operation.
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.

use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
///
/// The variants fall into four groups:
///
/// - lookup misses ([`DocumentStoreError::DocumentNotFound`]), which drive the
///   create-versus-update decision during view synchronization,
/// - precondition failures ([`DocumentStoreError::InvalidArgument`],
///   [`DocumentStoreError::InvalidInvocation`], [`DocumentStoreError::InvalidDefinition`]),
///   raised before any I/O is attempted,
/// - I/O failures (everything talking to the filesystem or the store),
/// - view execution failures ([`DocumentStoreError::ViewExecution`]), which the default
///   query policy reports next to an empty result instead of failing the call.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting documents to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store or repository initialization.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The requested document was not found in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// The store rejected a write because the supplied revision is not the current one.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Revision conflict for document {0} in collection {1}")]
    Conflict(String, String),
    /// A caller-supplied value failed a local precondition check.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A query method was invoked in a way that can never succeed.
    #[error("Invalid invocation: {0}")]
    InvalidInvocation(String),
    /// The view definition source was rejected.
    #[error("Invalid view definition: {0}")]
    InvalidDefinition(String),
    /// Executing a view on the store failed.
    /// The first argument is the view name, the second is the underlying failure.
    #[error("View {0} failed: {1}")]
    ViewExecution(String, String),
    /// Reading a local resource (definition source, attachment file) failed.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
    /// An error occurred in the underlying store client.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Returns `true` if this error is a store lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocumentStoreError::DocumentNotFound(..))
    }

    /// Returns `true` if this error was raised by a local check before any I/O.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            DocumentStoreError::InvalidArgument(_)
                | DocumentStoreError::InvalidInvocation(_)
                | DocumentStoreError::InvalidDefinition(_)
        )
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
