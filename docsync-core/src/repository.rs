//! The repository: CRUD, view synchronization and query dispatch for one collection.
//!
//! # Example
//!
//! ```ignore
//! use docsync::prelude::*;
//! use docsync::memory::InMemoryStore;
//!
//! let repository = Repository::builder(InMemoryStore::new("people")).build()?;
//!
//! repository.sync_views("views/people.json").await?;
//!
//! let people = repository
//!     .query("byName", vec!["Alice".into()])
//!     .await?
//!     .deserialize::<Person>()?;
//! ```

use chrono::Utc;
use mea::rwlock::RwLock;
use serde_json::Value;
use std::{path::Path, sync::Arc};
use tracing::debug;

use crate::{
    backend::StoreBackend,
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{QueryErrorPolicy, QueryMethod, QueryOutput, QueryRegistry},
    sync::{ComputedViews, SyncOutcome},
};

/// A document repository bound to one collection of a store.
///
/// The query methods installed by the last synchronization are kept behind an async
/// read-write lock. Synchronizations are not serialized against each other; callers
/// that run several at once see the registry of whichever installed last.
#[derive(Debug)]
pub struct Repository<B: StoreBackend> {
    backend: B,
    config: RepositoryConfig,
    queries: RwLock<Arc<QueryRegistry>>,
}

/// Repository settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub on_query_error: QueryErrorPolicy,
}

impl<B: StoreBackend> Repository<B> {
    /// Creates a repository with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Initialization`] if the backend is not bound to a
    /// named collection.
    pub fn new(backend: B) -> DocumentStoreResult<Self> {
        Self::builder(backend).build()
    }

    pub fn builder(backend: B) -> RepositoryBuilder<B> {
        RepositoryBuilder::new(backend)
    }

    /// Returns the name of the backing collection.
    pub fn collection(&self) -> &str {
        self.backend.database()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Synchronizes the collection's design document with a definition file and installs
    /// one query method per declared view.
    ///
    /// Query methods are installed before the store is consulted, so they are available
    /// even when the design document write fails.
    pub async fn sync_views(&self, path: impl AsRef<Path>) -> DocumentStoreResult<SyncOutcome> {
        let computed = ComputedViews::read(path).await?;

        self.install_and_reconcile(computed).await
    }

    /// Synchronizes from a definition source held in memory.
    pub async fn sync_views_from_bytes(&self, raw: &[u8]) -> DocumentStoreResult<SyncOutcome> {
        let computed = ComputedViews::from_bytes(raw)?;

        self.install_and_reconcile(computed).await
    }

    async fn install_and_reconcile(&self, computed: ComputedViews) -> DocumentStoreResult<SyncOutcome> {
        let registry = computed.synthesize(self.collection(), self.config.on_query_error)?;

        *self.queries.write().await = Arc::new(registry);

        computed.reconcile(&self.backend).await
    }

    /// Returns the currently installed query methods.
    pub async fn queries(&self) -> Arc<QueryRegistry> {
        self.queries.read().await.clone()
    }

    /// Looks up the query method with the given accessor name, e.g. `findByName`.
    pub async fn method(&self, name: &str) -> Option<QueryMethod> {
        self.queries
            .read()
            .await
            .method(name)
            .cloned()
    }

    /// Executes the view named `view` with the given keys.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidInvocation`] without touching the store if no
    /// such view has been installed. Store failures follow the configured
    /// [`QueryErrorPolicy`].
    pub async fn query(&self, view: &str, keys: Vec<Value>) -> DocumentStoreResult<QueryOutput> {
        let method = self
            .queries
            .read()
            .await
            .get(view)
            .cloned()
            .ok_or_else(|| {
                DocumentStoreError::InvalidInvocation(format!(
                    "no view named {view} is installed on collection {}",
                    self.collection()
                ))
            })?;

        method.invoke(&self.backend, keys).await
    }

    /// Executes the query method with the given accessor name, e.g. `findByName`.
    pub async fn call(&self, name: &str, keys: Vec<Value>) -> DocumentStoreResult<QueryOutput> {
        let method = self.method(name).await.ok_or_else(|| {
            DocumentStoreError::InvalidInvocation(format!(
                "no query method named {name} is installed on collection {}",
                self.collection()
            ))
        })?;

        method.invoke(&self.backend, keys).await
    }

    /// Executes a view and deserializes every value into `T`.
    ///
    /// Unlike [`Repository::query`], a swallowed view failure is returned as an `Err`.
    pub async fn query_as<T>(&self, view: &str, keys: Vec<Value>) -> DocumentStoreResult<Vec<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        self.query(view, keys)
            .await?
            .deserialize()
    }

    /// Fetches a document by its identity.
    pub async fn find_by_id<D: Document>(&self, id: &str) -> DocumentStoreResult<D> {
        D::from_json(self.backend.get(id).await?)
    }

    /// Stores a document and returns it with its new identity and revision.
    ///
    /// A document without a creation timestamp is stamped with `created_at`; one that
    /// already has it is stamped with `updated_at`. The caller's document is never
    /// modified, so a failed save leaves it exactly as it was.
    pub async fn save<D: Document>(&self, document: &D) -> DocumentStoreResult<D> {
        let mut saved = document.clone();
        let now = Utc::now();
        let meta = saved.meta_mut();

        if meta.created_at.is_none() {
            meta.created_at = Some(now);
        } else {
            meta.updated_at = Some(now);
        }

        debug!(collection = %self.collection(), id = ?saved.id(), "saving document");

        let response = self
            .backend
            .insert(saved.to_json()?, None)
            .await?;

        let meta = saved.meta_mut();
        meta.id = Some(response.id);
        meta.rev = Some(response.rev);

        Ok(saved)
    }

    /// Deletes a stored document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidArgument`] without touching the store if no
    /// document is given, or if it lacks an identity or a revision.
    pub async fn remove<D: Document>(&self, document: Option<&D>) -> DocumentStoreResult<()> {
        let document = document
            .ok_or_else(|| DocumentStoreError::InvalidArgument("Document to remove was invalid!".into()))?;
        let id = document
            .id()
            .ok_or_else(|| DocumentStoreError::InvalidArgument("Document to remove had no id!".into()))?;
        let rev = document
            .rev()
            .ok_or_else(|| DocumentStoreError::InvalidArgument("Document to remove had no revision!".into()))?;

        self.backend.destroy(id, rev).await?;

        Ok(())
    }

    /// Cleanly shuts down the backing store client.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}

/// Builder for [`Repository`].
#[derive(Debug)]
pub struct RepositoryBuilder<B: StoreBackend> {
    backend: B,
    config: RepositoryConfig,
}

impl<B: StoreBackend> RepositoryBuilder<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            config: RepositoryConfig::default(),
        }
    }

    /// Sets what query methods do when the store fails to execute a view.
    pub fn on_query_error(mut self, policy: QueryErrorPolicy) -> Self {
        self.config.on_query_error = policy;
        self
    }

    pub fn config(mut self, config: RepositoryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> DocumentStoreResult<Repository<B>> {
        if self.backend.database().is_empty() {
            return Err(DocumentStoreError::Initialization(
                "Please pass a collection into your repository.".into(),
            ));
        }

        Ok(Repository {
            backend: self.backend,
            config: self.config,
            queries: RwLock::new(Arc::new(QueryRegistry::default())),
        })
    }
}
