//! A thin CouchDB-style document repository with design-document view synchronization.
//!
//! This crate is the core of the docsync project and provides:
//!
//! - **Document traits** ([`document`]) - Core traits and metadata for stored documents
//! - **Store client abstraction** ([`backend`]) - Traits for implementing document-store clients
//! - **Fingerprints** ([`fingerprint`]) - Content digests of view definition sources
//! - **Design documents** ([`design`]) - View definition sources and their persisted form
//! - **Query methods** ([`query`]) - Query methods synthesized from declared views
//! - **View synchronization** ([`sync`]) - Reconciling local definitions with the store
//! - **Repository** ([`repository`], [`attachment`]) - CRUD, attachments and query dispatch
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
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
//!     fn meta(&self) -> &DocumentMeta {
//!         &self.meta
//!     }
//!
//!     fn meta_mut(&mut self) -> &mut DocumentMeta {
//!         &mut self.meta
//!     }
//! }
//!
//! let repository = Repository::new(InMemoryStore::new("people"))?;
//! repository.sync_views("views/people.json").await?;
//!
//! let alice = repository
//!     .save(&Person { meta: DocumentMeta::new(), name: "Alice".into() })
//!     .await?;
//! let named_alice = repository.query_as::<Person>("byName", vec!["Alice".into()]).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docsync_core;

pub mod attachment;
pub mod backend;
pub mod design;
pub mod document;
pub mod error;
pub mod fingerprint;
pub mod query;
pub mod repository;
pub mod sync;
