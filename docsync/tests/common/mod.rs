#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{
    path::{Path, PathBuf},
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use docsync::{memory::InMemoryStore, prelude::*};

pub const COLLECTION: &str = "people";

pub fn definitions() -> Value {
    json!({
        "views": {
            "all": { "map": "function (doc) { emit(null, doc); }" },
            "byName": { "map": "function (doc) { emit(doc.name, doc); }" }
        }
    })
}

/// Writes a definition file into `dir` and returns its path.
pub fn write_definitions(dir: &Path, definitions: &Value) -> PathBuf {
    let path = dir.join("views.json");

    std::fs::write(&path, serde_json::to_vec_pretty(definitions).unwrap()).unwrap();
    path
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(flatten)]
    pub meta: DocumentMeta,
    pub name: String,
}

impl Person {
    pub fn new(name: &str) -> Self {
        Self {
            meta: DocumentMeta::new(),
            name: name.to_string(),
        }
    }

    pub fn with_id(id: &str, name: &str) -> Self {
        Self {
            meta: DocumentMeta::with_id(id),
            name: name.to_string(),
        }
    }
}

impl Document for Person {
    fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }
}

/// Builds an in-memory store with native map functions for the `all` and `byName` views.
pub async fn people_store() -> InMemoryStore {
    InMemoryStore::builder(COLLECTION)
        .view("all", |doc| vec![(Value::Null, doc.clone())])
        .view("byName", |doc| vec![(doc["name"].clone(), doc.clone())])
        .build()
        .await
        .unwrap()
}

/// A store client that counts every call it forwards to an in-memory store.
#[derive(Debug)]
pub struct RecordingBackend {
    pub inner: InMemoryStore,
    pub gets: AtomicUsize,
    pub inserts: AtomicUsize,
    pub destroys: AtomicUsize,
    pub views: AtomicUsize,
    pub attachments: AtomicUsize,
    pub last_insert: Mutex<Option<(Value, Option<String>)>>,
    pub last_params: Mutex<Option<Option<ViewParams>>>,
    pub fail_views: AtomicBool,
    pub fail_gets: AtomicBool,
    pub fail_inserts: AtomicBool,
}

impl RecordingBackend {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            gets: AtomicUsize::new(0),
            inserts: AtomicUsize::new(0),
            destroys: AtomicUsize::new(0),
            views: AtomicUsize::new(0),
            attachments: AtomicUsize::new(0),
            last_insert: Mutex::new(None),
            last_params: Mutex::new(None),
            fail_views: AtomicBool::new(false),
            fail_gets: AtomicBool::new(false),
            fail_inserts: AtomicBool::new(false),
        }
    }

    pub fn failing_views(self) -> Self {
        self.fail_views.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_gets(self) -> Self {
        self.fail_gets.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_inserts(self) -> Self {
        self.fail_inserts.store(true, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> usize {
        [&self.gets, &self.inserts, &self.destroys, &self.views, &self.attachments]
            .iter()
            .map(|counter| counter.load(Ordering::SeqCst))
            .sum()
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn views(&self) -> usize {
        self.views.load(Ordering::SeqCst)
    }

    pub fn last_insert(&self) -> Option<(Value, Option<String>)> {
        self.last_insert.lock().unwrap().clone()
    }

    pub fn last_params(&self) -> Option<Option<ViewParams>> {
        self.last_params.lock().unwrap().clone()
    }
}

#[async_trait]
impl StoreBackend for RecordingBackend {
    fn database(&self) -> &str {
        StoreBackend::database(&self.inner)
    }

    async fn get(&self, id: &str) -> DocumentStoreResult<Value> {
        self.gets.fetch_add(1, Ordering::SeqCst);

        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(DocumentStoreError::Backend("connection reset".into()));
        }

        StoreBackend::get(&self.inner, id).await
    }

    async fn insert(&self, record: Value, id: Option<&str>) -> DocumentStoreResult<WriteResponse> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        *self.last_insert.lock().unwrap() = Some((record.clone(), id.map(str::to_string)));

        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(DocumentStoreError::Backend("disk full".into()));
        }

        StoreBackend::insert(&self.inner, record, id).await
    }

    async fn destroy(&self, id: &str, rev: &str) -> DocumentStoreResult<WriteResponse> {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        StoreBackend::destroy(&self.inner, id, rev).await
    }

    async fn view(
        &self,
        design: &str,
        view: &str,
        params: Option<ViewParams>,
    ) -> DocumentStoreResult<ViewResult> {
        self.views.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = Some(params.clone());

        if self.fail_views.load(Ordering::SeqCst) {
            return Err(DocumentStoreError::ViewExecution(view.to_string(), "boom".into()));
        }

        StoreBackend::view(&self.inner, design, view, params).await
    }

    async fn put_attachment(
        &self,
        id: &str,
        name: &str,
        body: AttachmentBody,
        mime_type: &str,
        rev: &str,
    ) -> DocumentStoreResult<WriteResponse> {
        self.attachments.fetch_add(1, Ordering::SeqCst);
        StoreBackend::put_attachment(&self.inner, id, name, body, mime_type, rev).await
    }

    async fn get_attachment(&self, id: &str, name: &str) -> DocumentStoreResult<Bytes> {
        StoreBackend::get_attachment(&self.inner, id, name).await
    }

    async fn stream_attachment(&self, id: &str, name: &str) -> DocumentStoreResult<ByteStream> {
        StoreBackend::stream_attachment(&self.inner, id, name).await
    }
}

pub async fn recording_repository() -> Repository<RecordingBackend> {
    Repository::new(RecordingBackend::new(people_store().await)).unwrap()
}
