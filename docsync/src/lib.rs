//! Main docsync crate providing a document repository over CouchDB-style stores.
//!
//! This crate is the primary entry point for users of the docsync framework.
//! It re-exports the core types and functionality from the sub-crates and provides
//! access to the available store clients.
//!
//! # Features
//!
//! - **Typed documents** - Define records with Serde and a flattened [`document::DocumentMeta`]
//! - **View synchronization** - Keep a collection's design document in line with a local definition file
//! - **Query methods** - One query method per declared view, with keyed queries
//! - **Attachments** - Buffered and streaming attachment upload and download
//!
//! # Quick Start
//!
//! ```ignore
//! use docsync::{prelude::*, memory::InMemoryStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Person {
//!     #[serde(flatten)]
//!     pub meta: DocumentMeta,
//!     pub name: String,
//! }
//!
//! impl Document for Person {
//!     fn meta(&self) -> &DocumentMeta { &self.meta }
//!     fn meta_mut(&mut self) -> &mut DocumentMeta { &mut self.meta }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = InMemoryStore::builder("people")
//!         .view("byName", |doc| vec![(doc["name"].clone(), doc.clone())])
//!         .build()
//!         .await
//!         .unwrap();
//!     let repository = Repository::new(store).unwrap();
//!
//!     // Create or update `_design/people` and install `findByName`
//!     repository.sync_views("views/people.json").await.unwrap();
//!
//!     let alice = repository
//!         .save(&Person { meta: DocumentMeta::new(), name: "Alice".into() })
//!         .await
//!         .unwrap();
//!
//!     let people = repository
//!         .call("findByName", vec!["Alice".into()])
//!         .await
//!         .unwrap()
//!         .deserialize::<Person>()
//!         .unwrap();
//!
//!     println!("Found: {:?}", people);
//!
//!     repository.remove(Some(&alice)).await.unwrap();
//!     repository.shutdown().await.unwrap();
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! A repository can be backed by a store client chosen at runtime by boxing it as a
//! [`backend::DynStoreBackend`]:
//!
//! ```ignore
//! use docsync::{prelude::*, memory::InMemoryStore};
//!
//! let backend: Box<dyn DynStoreBackend> = Box::new(InMemoryStore::new("people"));
//! let repository = Repository::new(backend)?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory store for development and testing
//! - `couchdb` - CouchDB over HTTP (requires the `couchdb` feature)

pub mod prelude;

pub use docsync_core::{attachment, backend, design, document, error, fingerprint, query, repository, sync};

/// In-memory store client implementations.
pub mod memory {
    pub use docsync_memory::{InMemoryStore, InMemoryStoreBuilder, MapFn};
}

/// CouchDB store client implementations.
///
/// This module is only available when the `couchdb` feature is enabled.
#[cfg(feature = "couchdb")]
pub mod couchdb {
    pub use docsync_couchdb::{CouchDbStore, CouchDbStoreBuilder};
}
