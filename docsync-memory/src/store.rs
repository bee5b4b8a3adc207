//! In-memory store client.
//!
//! Records are kept as JSON objects in an ordered map with async-safe read-write locks.
//! Revisions follow the CouchDB `<generation>-<token>` shape, and every write must carry
//! the current revision of the record it replaces.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{StreamExt, TryStreamExt, stream};
use mea::rwlock::RwLock;
use serde_json::{Map, Value};
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};
use tracing::debug;
use uuid::Uuid;

use docsync_core::{
    backend::{
        AttachmentBody, ByteStream, StoreBackend, StoreBackendBuilder, ViewParams, ViewResult,
        ViewRow, WriteResponse,
    },
    design::design_id,
    error::{DocumentStoreError, DocumentStoreResult},
};

const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// A native map function standing in for a view body: given a record, returns the
/// `(key, value)` pairs it emits.
pub type MapFn = Arc<dyn Fn(&Value) -> Vec<(Value, Value)> + Send + Sync>;

#[derive(Clone)]
struct ViewFunction(MapFn);

impl fmt::Debug for ViewFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ViewFunction(..)")
    }
}

#[derive(Debug, Clone)]
struct StoredAttachment {
    mime_type: String,
    data: Bytes,
}

#[derive(Debug, Clone)]
struct StoredRecord {
    rev: String,
    body: Map<String, Value>,
    attachments: BTreeMap<String, StoredAttachment>,
}

impl StoredRecord {
    fn to_value(&self, id: &str) -> Value {
        let mut body = self.body.clone();
        body.insert("_id".into(), Value::String(id.to_string()));
        body.insert("_rev".into(), Value::String(self.rev.clone()));

        Value::Object(body)
    }
}

fn next_rev(previous: Option<&str>) -> String {
    let generation = previous
        .and_then(|rev| rev.split('-').next())
        .and_then(|generation| generation.parse::<u64>().ok())
        .unwrap_or(0);

    format!("{}-{}", generation + 1, Uuid::new_v4().simple())
}

/// Thread-safe in-memory store client bound to one database.
///
/// `InMemoryStore` is cloneable and uses `Arc`-wrapped internal state, so clones share
/// the same records and view functions.
///
/// # Views
///
/// View bodies in design documents are opaque, so views are executed with native map
/// functions registered under the view's name. A view can only be executed once the
/// collection's design document declares it.
///
/// # Attachments
///
/// Attachments survive document updates and are not listed in fetched records.
///
/// # Example
///
/// ```ignore
/// use docsync_memory::InMemoryStore;
/// use serde_json::json;
///
/// let store = InMemoryStore::new("people");
/// store
///     .register_view("byName", |doc| vec![(doc["name"].clone(), doc.clone())])
///     .await;
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    database: String,
    records: Arc<RwLock<BTreeMap<String, StoredRecord>>>,
    views: Arc<RwLock<HashMap<String, ViewFunction>>>,
}

impl InMemoryStore {
    /// Creates a new empty store bound to `database`.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            records: Arc::new(RwLock::new(BTreeMap::new())),
            views: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore` with views pre-registered.
    pub fn builder(database: impl Into<String>) -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::new(database)
    }

    /// Registers the native map function executed for `view`.
    pub async fn register_view<F>(&self, view: impl Into<String>, map: F)
    where
        F: Fn(&Value) -> Vec<(Value, Value)> + Send + Sync + 'static,
    {
        self.views
            .write()
            .await
            .insert(view.into(), ViewFunction(Arc::new(map)));
    }

    /// Returns the number of stored records, design documents included.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn not_found(&self, id: &str) -> DocumentStoreError {
        DocumentStoreError::DocumentNotFound(id.to_string(), self.database.clone())
    }

    fn conflict(&self, id: &str) -> DocumentStoreError {
        DocumentStoreError::Conflict(id.to_string(), self.database.clone())
    }

    async fn collect_body(body: AttachmentBody) -> DocumentStoreResult<Bytes> {
        match body {
            AttachmentBody::Buffered(bytes) => Ok(bytes),
            AttachmentBody::Stream(stream) => {
                let mut buffer = BytesMut::new();
                let chunks = stream.try_collect::<Vec<Bytes>>().await?;

                for chunk in chunks {
                    buffer.extend_from_slice(&chunk);
                }

                Ok(buffer.freeze())
            }
        }
    }

    /// Validates `rev` against the stored record `id` and returns the stored record.
    fn current<'a>(
        &self,
        records: &'a mut BTreeMap<String, StoredRecord>,
        id: &str,
        rev: &str,
    ) -> DocumentStoreResult<&'a mut StoredRecord> {
        match records.get_mut(id) {
            Some(record) if record.rev == rev => Ok(record),
            Some(_) => Err(self.conflict(id)),
            None => Err(self.not_found(id)),
        }
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    fn database(&self) -> &str {
        &self.database
    }

    async fn get(&self, id: &str) -> DocumentStoreResult<Value> {
        self.records
            .read()
            .await
            .get(id)
            .map(|record| record.to_value(id))
            .ok_or_else(|| self.not_found(id))
    }

    async fn insert(&self, record: Value, id: Option<&str>) -> DocumentStoreResult<WriteResponse> {
        let mut body = match record {
            Value::Object(body) => body,
            _ => {
                return Err(DocumentStoreError::InvalidArgument(
                    "Records must be JSON objects".into(),
                ));
            }
        };

        let embedded_id = match body.remove("_id") {
            Some(Value::String(id)) => Some(id),
            _ => None,
        };
        let rev = match body.remove("_rev") {
            Some(Value::String(rev)) => Some(rev),
            _ => None,
        };
        let id = id
            .map(str::to_string)
            .or(embedded_id)
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

        let mut records = self.records.write().await;

        let attachments = match (records.get(&id), rev.as_deref()) {
            (Some(existing), Some(rev)) if existing.rev == rev => existing.attachments.clone(),
            (None, None) => BTreeMap::new(),
            _ => return Err(self.conflict(&id)),
        };

        let new_rev = next_rev(rev.as_deref());

        debug!(database = %self.database, id = %id, rev = %new_rev, "storing record");

        records.insert(
            id.clone(),
            StoredRecord {
                rev: new_rev.clone(),
                body,
                attachments,
            },
        );

        Ok(WriteResponse { id, rev: new_rev })
    }

    async fn destroy(&self, id: &str, rev: &str) -> DocumentStoreResult<WriteResponse> {
        let mut records = self.records.write().await;

        self.current(&mut records, id, rev)?;
        records.remove(id);

        Ok(WriteResponse {
            id: id.to_string(),
            rev: next_rev(Some(rev)),
        })
    }

    async fn view(
        &self,
        design: &str,
        view: &str,
        params: Option<ViewParams>,
    ) -> DocumentStoreResult<ViewResult> {
        let design_id = design_id(design);
        let records = self.records.read().await;

        let declared = records
            .get(&design_id)
            .and_then(|record| record.body.get("views"))
            .and_then(Value::as_object)
            .is_some_and(|views| views.contains_key(view));

        if !declared {
            return Err(self.not_found(&format!("{design_id}/_view/{view}")));
        }

        let map = self
            .views
            .read()
            .await
            .get(view)
            .cloned()
            .ok_or_else(|| {
                DocumentStoreError::ViewExecution(view.to_string(), "no map function registered".into())
            })?;

        let rows = records
            .iter()
            .filter(|(id, _)| !id.starts_with("_design/"))
            .flat_map(|(id, record)| {
                (map.0)(&record.to_value(id))
                    .into_iter()
                    .map(move |(key, value)| ViewRow {
                        id: Some(id.clone()),
                        key,
                        value,
                    })
            })
            .collect::<Vec<_>>();

        let rows = match params {
            Some(ViewParams { keys }) if !keys.is_empty() => keys
                .iter()
                .flat_map(|key| rows.iter().filter(move |row| &row.key == key).cloned())
                .collect(),
            _ => rows,
        };

        Ok(ViewResult { rows })
    }

    async fn put_attachment(
        &self,
        id: &str,
        name: &str,
        body: AttachmentBody,
        mime_type: &str,
        rev: &str,
    ) -> DocumentStoreResult<WriteResponse> {
        let data = Self::collect_body(body).await?;
        let mut records = self.records.write().await;
        let record = self.current(&mut records, id, rev)?;

        record.attachments.insert(
            name.to_string(),
            StoredAttachment {
                mime_type: mime_type.to_string(),
                data,
            },
        );
        record.rev = next_rev(Some(rev));

        Ok(WriteResponse {
            id: id.to_string(),
            rev: record.rev.clone(),
        })
    }

    async fn get_attachment(&self, id: &str, name: &str) -> DocumentStoreResult<Bytes> {
        self.records
            .read()
            .await
            .get(id)
            .and_then(|record| record.attachments.get(name))
            .map(|attachment| attachment.data.clone())
            .ok_or_else(|| self.not_found(&format!("{id}/{name}")))
    }

    async fn stream_attachment(&self, id: &str, name: &str) -> DocumentStoreResult<ByteStream> {
        let data = self.get_attachment(id, name).await?;
        let chunks = (0..data.len())
            .step_by(STREAM_CHUNK_SIZE)
            .map(|start| Ok(data.slice(start..(start + STREAM_CHUNK_SIZE).min(data.len()))))
            .collect::<Vec<_>>();

        Ok(stream::iter(chunks).boxed())
    }
}

impl InMemoryStore {
    /// Returns the mime type an attachment was stored with.
    pub async fn attachment_mime_type(&self, id: &str, name: &str) -> Option<String> {
        self.records
            .read()
            .await
            .get(id)
            .and_then(|record| record.attachments.get(name))
            .map(|attachment| attachment.mime_type.clone())
    }
}

/// Builder for constructing [`InMemoryStore`] instances with views pre-registered.
///
/// # Example
///
/// ```ignore
/// use docsync_memory::InMemoryStore;
/// use docsync::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder("people")
///     .view("all", |doc| vec![(serde_json::Value::Null, doc.clone())])
///     .build()
///     .await?;
/// ```
pub struct InMemoryStoreBuilder {
    database: String,
    views: Vec<(String, MapFn)>,
}

impl InMemoryStoreBuilder {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            views: Vec::new(),
        }
    }

    /// Registers the native map function executed for `view`.
    pub fn view<F>(mut self, view: impl Into<String>, map: F) -> Self
    where
        F: Fn(&Value) -> Vec<(Value, Value)> + Send + Sync + 'static,
    {
        self.views.push((view.into(), Arc::new(map)));
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let store = InMemoryStore::new(self.database);

        {
            let mut views = store.views.write().await;

            for (name, map) in self.views {
                views.insert(name, ViewFunction(map));
            }
        }

        Ok(store)
    }
}
