//! Convenient re-exports of commonly used types from docsync.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docsync::prelude::*;
//! ```
//!
//! Both [`StoreBackend`] and [`DynStoreBackend`] are brought into scope. Calling a store
//! client method directly on a concrete client then needs the trait spelled out, as in
//! `StoreBackend::get(&store, id)`.

pub use docsync_core::{
    attachment::AttachmentReceipt,
    backend::{AttachmentBody, ByteStream, DynStoreBackend, StoreBackend, StoreBackendBuilder, ViewParams, ViewResult, ViewRow, WriteResponse},
    design::{DesignDocument, ViewDefinitionSet, ViewDefinitionSource},
    document::{Document, DocumentExt, DocumentMeta, JsonDocument},
    error::{DocumentStoreError, DocumentStoreResult},
    fingerprint::{Fingerprint, fingerprint},
    query::{QueryErrorPolicy, QueryMethod, QueryOutput, QueryRegistry},
    repository::{Repository, RepositoryBuilder, RepositoryConfig},
    sync::{ComputedViews, SyncOutcome},
};
