//! Store client abstraction for the repository.
//!
//! This module defines the traits that abstract over document-store clients, allowing the
//! repository to run against an in-memory store, a CouchDB server, or a test double.
//!
//! # Overview
//!
//! The [`StoreBackend`] trait mirrors the primitives a CouchDB-style client exposes:
//! fetch by id, insert (create or update), destroy by id and revision, execute a design
//! document view, and upload or download attachments. Implementations are required to be
//! thread-safe (`Send + Sync`).
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for store clients
//! - [`DynStoreBackend`]: A trait for dynamic dispatch over client implementations
//! - [`StoreBackendBuilder`]: Factory trait for creating client instances
//!
//! # Examples
//!
//! ```ignore
//! use docsync::backend::StoreBackend;
//! use serde_json::json;
//!
//! let response = backend.insert(json!({ "name": "Alice" }), None).await?;
//! let stored = backend.get(&response.id).await?;
//! backend.destroy(&response.id, &response.rev).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{any::Any, fmt::{self, Debug}};

use crate::error::DocumentStoreResult;

/// A live stream of attachment bytes.
pub type ByteStream = BoxStream<'static, DocumentStoreResult<Bytes>>;

/// The store's answer to a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResponse {
    pub id: String,
    pub rev: String,
}

/// Parameters passed to a view execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewParams {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<Value>,
}

impl ViewParams {
    /// Builds parameters restricting the view to the given keys, in order.
    pub fn keys(keys: Vec<Value>) -> Self {
        Self { keys }
    }
}

/// One row of a view result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub key: Value,
    #[serde(default)]
    pub value: Value,
}

/// The rows returned by a view execution, in store order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewResult {
    #[serde(default)]
    pub rows: Vec<ViewRow>,
}

/// Attachment content handed to the store's upload primitive.
pub enum AttachmentBody {
    /// Content already held in memory.
    Buffered(Bytes),
    /// Content forwarded from a live stream as it arrives.
    Stream(ByteStream),
}

impl Debug for AttachmentBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentBody::Buffered(bytes) => f
                .debug_tuple("Buffered")
                .field(&bytes.len())
                .finish(),
            AttachmentBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for AttachmentBody {
    fn from(bytes: Bytes) -> Self {
        AttachmentBody::Buffered(bytes)
    }
}

impl From<Vec<u8>> for AttachmentBody {
    fn from(bytes: Vec<u8>) -> Self {
        AttachmentBody::Buffered(Bytes::from(bytes))
    }
}

impl From<ByteStream> for AttachmentBody {
    fn from(stream: ByteStream) -> Self {
        AttachmentBody::Stream(stream)
    }
}

/// Abstract interface for document-store clients.
///
/// # Error Handling
///
/// Lookups of missing records must fail with
/// [`DocumentStoreError::DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound)
/// so callers can tell a miss apart from a failed round-trip. Writes carrying a stale
/// revision should fail with
/// [`DocumentStoreError::Conflict`](crate::error::DocumentStoreError::Conflict).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Returns the name of the database (collection) this client is bound to.
    fn database(&self) -> &str;

    /// Fetches a record by its identity.
    async fn get(&self, id: &str) -> DocumentStoreResult<Value>;

    /// Creates or updates a record.
    ///
    /// When `id` is `None` the record's own `_id` is used, or the store assigns one.
    /// Updating an existing record requires its current `_rev` in the payload.
    async fn insert(&self, record: Value, id: Option<&str>) -> DocumentStoreResult<WriteResponse>;

    /// Deletes a record, given its identity and current revision.
    async fn destroy(&self, id: &str, rev: &str) -> DocumentStoreResult<WriteResponse>;

    /// Executes a view of the design document named `design`.
    async fn view(
        &self,
        design: &str,
        view: &str,
        params: Option<ViewParams>,
    ) -> DocumentStoreResult<ViewResult>;

    /// Uploads an attachment to the record `id` at revision `rev`.
    async fn put_attachment(
        &self,
        id: &str,
        name: &str,
        body: AttachmentBody,
        mime_type: &str,
        rev: &str,
    ) -> DocumentStoreResult<WriteResponse>;

    /// Downloads an attachment in full.
    async fn get_attachment(&self, id: &str, name: &str) -> DocumentStoreResult<Bytes>;

    /// Opens a stream over an attachment's bytes.
    async fn stream_attachment(&self, id: &str, name: &str) -> DocumentStoreResult<ByteStream>;

    /// Cleanly shuts down the client, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    fn database(&self) -> &str {
        StoreBackend::database(*self)
    }

    async fn get(&self, id: &str) -> DocumentStoreResult<Value> {
        StoreBackend::get(*self, id).await
    }

    async fn insert(&self, record: Value, id: Option<&str>) -> DocumentStoreResult<WriteResponse> {
        StoreBackend::insert(*self, record, id).await
    }

    async fn destroy(&self, id: &str, rev: &str) -> DocumentStoreResult<WriteResponse> {
        StoreBackend::destroy(*self, id, rev).await
    }

    async fn view(
        &self,
        design: &str,
        view: &str,
        params: Option<ViewParams>,
    ) -> DocumentStoreResult<ViewResult> {
        StoreBackend::view(*self, design, view, params).await
    }

    async fn put_attachment(
        &self,
        id: &str,
        name: &str,
        body: AttachmentBody,
        mime_type: &str,
        rev: &str,
    ) -> DocumentStoreResult<WriteResponse> {
        StoreBackend::put_attachment(*self, id, name, body, mime_type, rev).await
    }

    async fn get_attachment(&self, id: &str, name: &str) -> DocumentStoreResult<Bytes> {
        StoreBackend::get_attachment(*self, id, name).await
    }

    async fn stream_attachment(&self, id: &str, name: &str) -> DocumentStoreResult<ByteStream> {
        StoreBackend::stream_attachment(*self, id, name).await
    }
}

/// Object-safe counterpart of [`StoreBackend`] for runtime client selection.
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    fn database(&self) -> &str;
    async fn get(&self, id: &str) -> DocumentStoreResult<Value>;
    async fn insert(&self, record: Value, id: Option<&str>) -> DocumentStoreResult<WriteResponse>;
    async fn destroy(&self, id: &str, rev: &str) -> DocumentStoreResult<WriteResponse>;
    async fn view(
        &self,
        design: &str,
        view: &str,
        params: Option<ViewParams>,
    ) -> DocumentStoreResult<ViewResult>;
    async fn put_attachment(
        &self,
        id: &str,
        name: &str,
        body: AttachmentBody,
        mime_type: &str,
        rev: &str,
    ) -> DocumentStoreResult<WriteResponse>;
    async fn get_attachment(&self, id: &str, name: &str) -> DocumentStoreResult<Bytes>;
    async fn stream_attachment(&self, id: &str, name: &str) -> DocumentStoreResult<ByteStream>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    fn database(&self) -> &str {
        StoreBackend::database(self)
    }

    async fn get(&self, id: &str) -> DocumentStoreResult<Value> {
        StoreBackend::get(self, id).await
    }

    async fn insert(&self, record: Value, id: Option<&str>) -> DocumentStoreResult<WriteResponse> {
        StoreBackend::insert(self, record, id).await
    }

    async fn destroy(&self, id: &str, rev: &str) -> DocumentStoreResult<WriteResponse> {
        StoreBackend::destroy(self, id, rev).await
    }

    async fn view(
        &self,
        design: &str,
        view: &str,
        params: Option<ViewParams>,
    ) -> DocumentStoreResult<ViewResult> {
        StoreBackend::view(self, design, view, params).await
    }

    async fn put_attachment(
        &self,
        id: &str,
        name: &str,
        body: AttachmentBody,
        mime_type: &str,
        rev: &str,
    ) -> DocumentStoreResult<WriteResponse> {
        StoreBackend::put_attachment(self, id, name, body, mime_type, rev).await
    }

    async fn get_attachment(&self, id: &str, name: &str) -> DocumentStoreResult<Bytes> {
        StoreBackend::get_attachment(self, id, name).await
    }

    async fn stream_attachment(&self, id: &str, name: &str) -> DocumentStoreResult<ByteStream> {
        StoreBackend::stream_attachment(self, id, name).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(*self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Lets a boxed, runtime-selected client back a [`Repository`](crate::repository::Repository).
#[async_trait]
impl StoreBackend for Box<dyn DynStoreBackend> {
    fn database(&self) -> &str {
        DynStoreBackend::database(&**self)
    }

    async fn get(&self, id: &str) -> DocumentStoreResult<Value> {
        DynStoreBackend::get(&**self, id).await
    }

    async fn insert(&self, record: Value, id: Option<&str>) -> DocumentStoreResult<WriteResponse> {
        DynStoreBackend::insert(&**self, record, id).await
    }

    async fn destroy(&self, id: &str, rev: &str) -> DocumentStoreResult<WriteResponse> {
        DynStoreBackend::destroy(&**self, id, rev).await
    }

    async fn view(
        &self,
        design: &str,
        view: &str,
        params: Option<ViewParams>,
    ) -> DocumentStoreResult<ViewResult> {
        DynStoreBackend::view(&**self, design, view, params).await
    }

    async fn put_attachment(
        &self,
        id: &str,
        name: &str,
        body: AttachmentBody,
        mime_type: &str,
        rev: &str,
    ) -> DocumentStoreResult<WriteResponse> {
        DynStoreBackend::put_attachment(&**self, id, name, body, mime_type, rev).await
    }

    async fn get_attachment(&self, id: &str, name: &str) -> DocumentStoreResult<Bytes> {
        DynStoreBackend::get_attachment(&**self, id, name).await
    }

    async fn stream_attachment(&self, id: &str, name: &str) -> DocumentStoreResult<ByteStream> {
        DynStoreBackend::stream_attachment(&**self, id, name).await
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        DynStoreBackend::shutdown_boxed(self).await
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
