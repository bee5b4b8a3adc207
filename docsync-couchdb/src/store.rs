use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Body, Client, Method, RequestBuilder, Response, StatusCode, Url, header::CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use docsync_core::{
    backend::{
        AttachmentBody, ByteStream, StoreBackend, StoreBackendBuilder, ViewParams, ViewResult,
        WriteResponse,
    },
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Error body CouchDB sends with non-success responses.
#[derive(Debug, Deserialize)]
struct CouchError {
    error: String,
    #[serde(default)]
    reason: String,
}

fn transport(err: reqwest::Error) -> DocumentStoreError {
    DocumentStoreError::Backend(err.to_string())
}

/// Splits a document identity into URL path segments, keeping the slash of design
/// document identities unescaped.
fn document_segments(id: &str) -> Vec<&str> {
    match id.strip_prefix("_design/") {
        Some(name) => vec!["_design", name],
        None => vec![id],
    }
}

#[derive(Debug, Clone)]
pub struct CouchDbStore {
    client: Client,
    base: Url,
    database: String,
}

impl CouchDbStore {
    pub fn new(client: Client, base: Url, database: impl Into<String>) -> Self {
        Self {
            client,
            base,
            database: database.into(),
        }
    }

    pub fn builder(url: &str, database: &str) -> CouchDbStoreBuilder {
        CouchDbStoreBuilder::new(url, database)
    }

    /// Builds the URL of a path below the database.
    fn url<'s>(&self, segments: impl IntoIterator<Item = &'s str>) -> DocumentStoreResult<Url> {
        let mut url = self.base.clone();

        url.path_segments_mut()
            .map_err(|_| DocumentStoreError::Initialization(format!("{} cannot be a base URL", self.base)))?
            .pop_if_empty()
            .push(&self.database)
            .extend(segments);

        Ok(url)
    }

    pub(crate) fn document_url(&self, id: &str) -> DocumentStoreResult<Url> {
        self.url(document_segments(id))
    }

    fn attachment_url(&self, id: &str, name: &str) -> DocumentStoreResult<Url> {
        self.url(document_segments(id).into_iter().chain([name]))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "couchdb request");

        self.client.request(method, url)
    }

    /// Sends a request and maps non-success statuses onto store errors for `id`.
    async fn send(&self, request: RequestBuilder, id: &str) -> DocumentStoreResult<Response> {
        let response = request
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let reason = match response.json::<CouchError>().await {
            Ok(body) => format!("{}: {}", body.error, body.reason),
            Err(_) => status.to_string(),
        };

        Err(match status {
            StatusCode::NOT_FOUND => DocumentStoreError::DocumentNotFound(id.to_string(), self.database.clone()),
            StatusCode::CONFLICT => DocumentStoreError::Conflict(id.to_string(), self.database.clone()),
            _ => DocumentStoreError::Backend(format!("{status} {reason}")),
        })
    }
}

#[async_trait]
impl StoreBackend for CouchDbStore {
    fn database(&self) -> &str {
        &self.database
    }

    async fn get(&self, id: &str) -> DocumentStoreResult<Value> {
        self.send(self.request(Method::GET, self.document_url(id)?), id)
            .await?
            .json::<Value>()
            .await
            .map_err(transport)
    }

    async fn insert(&self, record: Value, id: Option<&str>) -> DocumentStoreResult<WriteResponse> {
        let id = id
            .map(str::to_string)
            .or_else(|| record.get("_id").and_then(Value::as_str).map(str::to_string));

        let request = match &id {
            Some(id) => self.request(Method::PUT, self.document_url(id)?),
            None => self.request(Method::POST, self.url([])?),
        };

        self.send(request.json(&record), id.as_deref().unwrap_or_default())
            .await?
            .json::<WriteResponse>()
            .await
            .map_err(transport)
    }

    async fn destroy(&self, id: &str, rev: &str) -> DocumentStoreResult<WriteResponse> {
        let request = self
            .request(Method::DELETE, self.document_url(id)?)
            .query(&[("rev", rev)]);

        self.send(request, id)
            .await?
            .json::<WriteResponse>()
            .await
            .map_err(transport)
    }

    async fn view(
        &self,
        design: &str,
        view: &str,
        params: Option<ViewParams>,
    ) -> DocumentStoreResult<ViewResult> {
        let url = self.url(["_design", design, "_view", view])?;
        let request = match params {
            Some(ViewParams { keys }) if !keys.is_empty() => self
                .request(Method::POST, url)
                .json(&json!({ "keys": keys })),
            _ => self.request(Method::GET, url),
        };

        let response = self
            .send(request, &format!("_design/{design}/_view/{view}"))
            .await
            .map_err(|err| match err {
                DocumentStoreError::Backend(reason) => DocumentStoreError::ViewExecution(view.to_string(), reason),
                other => other,
            })?;

        response
            .json::<ViewResult>()
            .await
            .map_err(transport)
    }

    async fn put_attachment(
        &self,
        id: &str,
        name: &str,
        body: AttachmentBody,
        mime_type: &str,
        rev: &str,
    ) -> DocumentStoreResult<WriteResponse> {
        let body = match body {
            AttachmentBody::Buffered(bytes) => Body::from(bytes),
            AttachmentBody::Stream(stream) => Body::wrap_stream(stream),
        };
        let request = self
            .request(Method::PUT, self.attachment_url(id, name)?)
            .query(&[("rev", rev)])
            .header(CONTENT_TYPE, mime_type)
            .body(body);

        self.send(request, id)
            .await?
            .json::<WriteResponse>()
            .await
            .map_err(transport)
    }

    async fn get_attachment(&self, id: &str, name: &str) -> DocumentStoreResult<Bytes> {
        self.send(self.request(Method::GET, self.attachment_url(id, name)?), id)
            .await?
            .bytes()
            .await
            .map_err(transport)
    }

    async fn stream_attachment(&self, id: &str, name: &str) -> DocumentStoreResult<ByteStream> {
        let response = self
            .send(self.request(Method::GET, self.attachment_url(id, name)?), id)
            .await?;

        Ok(response
            .bytes_stream()
            .map_err(transport)
            .boxed())
    }
}

/// Builder for [`CouchDbStore`].
///
/// # Example
///
/// ```ignore
/// use docsync::{backend::StoreBackendBuilder, couchdb::CouchDbStore};
///
/// let store = CouchDbStore::builder("http://localhost:5984", "people")
///     .build()
///     .await?;
/// ```
#[derive(Debug)]
pub struct CouchDbStoreBuilder {
    url: String,
    database: String,
    client: Option<Client>,
}

impl CouchDbStoreBuilder {
    pub fn new(url: &str, database: &str) -> Self {
        Self {
            url: url.to_string(),
            database: database.to_string(),
            client: None,
        }
    }

    /// Uses a preconfigured HTTP client, e.g. one carrying credentials or timeouts.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for CouchDbStoreBuilder {
    type Backend = CouchDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let base = Url::parse(&self.url)
            .map_err(|e| DocumentStoreError::Initialization(format!("invalid CouchDB URL {}: {e}", self.url)))?;

        if base.cannot_be_a_base() {
            return Err(DocumentStoreError::Initialization(format!(
                "{} cannot be a base URL",
                self.url
            )));
        }

        Ok(CouchDbStore::new(
            self.client.unwrap_or_default(),
            base,
            self.database,
        ))
    }
}
