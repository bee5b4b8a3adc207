//! Reconciliation of local view definitions with a collection's stored design document.
//!
//! Synchronization reads the definition source, fingerprints its raw bytes and compares
//! the fingerprint with the `hash` of the stored design document:
//!
//! - no stored design document: it is created, without a revision,
//! - equal fingerprints: nothing is written,
//! - different fingerprints: the stored revision is carried into the new design document
//!   and the document is replaced.
//!
//! Any failure to fetch the stored document other than a miss aborts the cycle.

use std::path::Path;
use tracing::info;

use crate::{
    backend::StoreBackend,
    design::{DesignDocument, StoredDesign, ViewDefinitionSource, design_id},
    document::DocumentExt,
    error::DocumentStoreResult,
    fingerprint::Fingerprint,
    query::{QueryErrorPolicy, QueryRegistry},
};

/// What a synchronization cycle did to the stored design document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No design document existed; one was created.
    Created { rev: String },
    /// The stored definitions differed and were replaced.
    Updated { previous_rev: Option<String>, rev: String },
    /// The stored definitions already matched; nothing was written.
    Unchanged,
}

impl SyncOutcome {
    /// Returns `true` if the cycle wrote to the store.
    pub fn wrote(&self) -> bool {
        !matches!(self, SyncOutcome::Unchanged)
    }
}

/// A definition source that has been read, parsed and fingerprinted.
#[derive(Debug, Clone)]
pub struct ComputedViews {
    source: ViewDefinitionSource,
    fingerprint: Fingerprint,
}

impl ComputedViews {
    /// Reads a definition source from disk.
    ///
    /// # Errors
    ///
    /// Read failures are returned as [`DocumentStoreError::Io`](crate::error::DocumentStoreError::Io)
    /// wrapping the original error.
    pub async fn read(path: impl AsRef<Path>) -> DocumentStoreResult<Self> {
        let raw = tokio::fs::read(path.as_ref()).await?;

        Self::from_bytes(&raw)
    }

    /// Parses and fingerprints a definition source held in memory.
    pub fn from_bytes(raw: &[u8]) -> DocumentStoreResult<Self> {
        Ok(Self {
            source: ViewDefinitionSource::parse(raw)?,
            fingerprint: Fingerprint::of(raw),
        })
    }

    pub fn source(&self) -> &ViewDefinitionSource {
        &self.source
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Builds the query methods for the declared views.
    pub fn synthesize(&self, collection: &str, policy: QueryErrorPolicy) -> DocumentStoreResult<QueryRegistry> {
        QueryRegistry::synthesize(&self.source.views, collection, policy)
    }

    /// Brings the stored design document of the backend's collection in line with these
    /// definitions.
    pub async fn reconcile<B: StoreBackend>(self, backend: &B) -> DocumentStoreResult<SyncOutcome> {
        let collection = backend.database();
        let id = design_id(collection);

        let stored = match backend.get(&id).await {
            Ok(value) => Some(serde_json::from_value::<StoredDesign>(value)?),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err),
        };

        if let Some(stored) = &stored {
            if stored.matches(&self.fingerprint) {
                info!(collection, "no view update required");

                return Ok(SyncOutcome::Unchanged);
            }

            info!(collection, "view definitions have changed, updating design document");
        } else {
            info!(collection, "creating design document");
        }

        let previous_rev = stored
            .as_ref()
            .and_then(|stored| stored.rev.clone());
        let document = DesignDocument::from_source(collection, self.source, self.fingerprint)
            .with_rev(previous_rev.clone());

        let response = backend
            .insert(document.to_json()?, Some(&id))
            .await?;

        Ok(match stored {
            Some(_) => SyncOutcome::Updated {
                previous_rev,
                rev: response.rev,
            },
            None => SyncOutcome::Created { rev: response.rev },
        })
    }
}
