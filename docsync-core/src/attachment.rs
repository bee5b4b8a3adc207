//! Attachment upload and download for repository documents.
//!
//! Every upload needs the document's identity and current revision, and produces a new
//! revision. The updated document is returned to the caller next to the upload receipt.

use bytes::Bytes;
use futures::{SinkExt, Stream, StreamExt, Sink};
use std::{fmt::Display, path::Path};
use tracing::debug;

use crate::{
    backend::{AttachmentBody, ByteStream, StoreBackend},
    document::Document,
    error::{DocumentStoreError, DocumentStoreResult},
    repository::Repository,
};

/// The store's record of a successful attachment upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentReceipt {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    /// The document revision created by the upload.
    pub rev: String,
}

fn identity<D: Document>(document: &D) -> DocumentStoreResult<&str> {
    document
        .id()
        .ok_or_else(|| DocumentStoreError::InvalidArgument("Document has no id!".into()))
}

fn identity_and_rev<D: Document>(document: &D) -> DocumentStoreResult<(&str, &str)> {
    let id = identity(document)?;
    let rev = document
        .rev()
        .ok_or_else(|| DocumentStoreError::InvalidArgument(format!("Document {id} has no revision!")))?;

    Ok((id, rev))
}

impl<B: StoreBackend> Repository<B> {
    /// Uploads in-memory content as an attachment of `document`.
    pub async fn add_attachment<D: Document>(
        &self,
        document: &D,
        name: &str,
        content: impl Into<Bytes>,
        mime_type: &str,
    ) -> DocumentStoreResult<(D, AttachmentReceipt)> {
        self.put_attachment(document, name, AttachmentBody::Buffered(content.into()), mime_type)
            .await
    }

    /// Reads a file fully and uploads it as an attachment of `document`.
    pub async fn add_attachment_from_path<D: Document>(
        &self,
        document: &D,
        name: &str,
        path: impl AsRef<Path>,
        mime_type: &str,
    ) -> DocumentStoreResult<(D, AttachmentReceipt)> {
        // Fail on a missing revision before reading the file.
        identity_and_rev(document)?;

        let content = tokio::fs::read(path.as_ref()).await?;

        self.put_attachment(document, name, AttachmentBody::Buffered(content.into()), mime_type)
            .await
    }

    /// Forwards a live byte stream to the store as an attachment of `document`.
    ///
    /// The stream is handed to the store client as it is; nothing is buffered here.
    pub async fn add_attachment_stream<D, S>(
        &self,
        document: &D,
        name: &str,
        stream: S,
        mime_type: &str,
    ) -> DocumentStoreResult<(D, AttachmentReceipt)>
    where
        D: Document,
        S: Stream<Item = DocumentStoreResult<Bytes>> + Send + 'static,
    {
        self.put_attachment(document, name, AttachmentBody::Stream(stream.boxed()), mime_type)
            .await
    }

    async fn put_attachment<D: Document>(
        &self,
        document: &D,
        name: &str,
        body: AttachmentBody,
        mime_type: &str,
    ) -> DocumentStoreResult<(D, AttachmentReceipt)> {
        let (id, rev) = identity_and_rev(document)?;

        debug!(collection = %self.collection(), id, name, ?body, "uploading attachment");

        let response = self
            .backend()
            .put_attachment(id, name, body, mime_type, rev)
            .await?;

        let mut updated = document.clone();
        updated.meta_mut().rev = Some(response.rev.clone());

        Ok((
            updated,
            AttachmentReceipt {
                id: response.id,
                name: name.to_string(),
                mime_type: mime_type.to_string(),
                rev: response.rev,
            },
        ))
    }

    /// Downloads an attachment of `document` in full.
    pub async fn find_attachment<D: Document>(&self, document: &D, name: &str) -> DocumentStoreResult<Bytes> {
        self.backend()
            .get_attachment(identity(document)?, name)
            .await
    }

    /// Opens a stream over an attachment of `document`.
    pub async fn attachment_stream<D: Document>(&self, document: &D, name: &str) -> DocumentStoreResult<ByteStream> {
        self.backend()
            .stream_attachment(identity(document)?, name)
            .await
    }

    /// Forwards an attachment of `document` into `sink` chunk by chunk.
    pub async fn stream_attachment_to<D, S>(&self, document: &D, name: &str, sink: S) -> DocumentStoreResult<()>
    where
        D: Document,
        S: Sink<Bytes>,
        S::Error: Display,
    {
        let stream = self.attachment_stream(document, name).await?;
        let sink = sink.sink_map_err(|err| DocumentStoreError::Io(std::io::Error::other(err.to_string())));

        stream.forward(sink).await
    }
}
