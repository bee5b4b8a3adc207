//! CouchDB store client for docsync.
//!
//! This crate provides an HTTP implementation of the `StoreBackend` trait talking to a
//! CouchDB server (or any server speaking the same document API) through `reqwest`.
//!
//! To use this client, include the `couchdb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docsync = { version = "x.y.z", features = ["couchdb"] }
//! ```
//!
//! # Features
//!
//! - **Design documents and views** - Views run server-side, keyed queries are sent as `POST` bodies
//! - **Revision conflicts** - HTTP 409 responses surface as revision conflicts
//! - **Streaming attachments** - Uploads and downloads are streamed without buffering
//!
//! # Connection
//!
//! Authentication, timeouts and retries are configured on the `reqwest::Client` handed
//! to the builder.
//!
//! # Example
//!
//! ```ignore
//! use docsync::{backend::StoreBackendBuilder, couchdb::CouchDbStore, repository::Repository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = CouchDbStore::builder("http://localhost:5984", "people")
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
extern crate self as docsync_couchdb;

pub mod store;

pub use store::{CouchDbStore, CouchDbStoreBuilder};
