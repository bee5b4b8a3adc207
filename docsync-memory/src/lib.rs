//! In-memory store client for docsync.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait
//! that behaves like a single CouchDB database. It is meant for development and tests.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Revision checks** - Updates, deletes and attachment writes must carry the current revision
//! - **Native views** - Views declared in the design document run registered Rust map functions
//! - **Attachments** - Buffered and streamed upload and download
//!
//! # Quick Start
//!
//! ```ignore
//! use docsync::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryStore::builder("people")
//!         .view("byName", |doc| vec![(doc["name"].clone(), doc.clone())])
//!         .build()
//!         .await?;
//!     let repository = Repository::new(store)?;
//!
//!     repository.sync_views("views/people.json").await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docsync_memory;

pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder, MapFn};
