// ABOUTME: HTTP client for the manifest store, one resource per manifest id.
// ABOUTME: Reads capture ETags that guard the following conditional write.

use super::error::StoreError;
use crate::deploy::{DeployError, Manifest, ManifestPair, Manifests};
use crate::types::ManifestId;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{CONTENT_TYPE, ETAG, HOST, IF_MATCH, IF_NONE_MATCH};
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpStream;

/// Per-request timeout unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A document together with the version tag it was read at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub value: T,
    pub etag: String,
}

/// Manifests a writer believes the store holds, with the tag each was read
/// at when it came from the store.
///
/// Manifests without a tag are checked against the stored document before
/// they are overwritten or deleted.
#[derive(Debug, Clone, Default)]
pub struct StoredManifests {
    manifests: Manifests,
    etags: HashMap<ManifestId, String>,
}

impl StoredManifests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a manifest read from the store.
    pub fn insert(&mut self, read: Versioned<Manifest>) -> Result<(), DeployError> {
        let id = read.value.id();
        self.manifests.add(read.value)?;
        self.etags.insert(id, read.etag);
        Ok(())
    }

    pub fn manifests(&self) -> &Manifests {
        &self.manifests
    }

    /// Tag the manifest was read at, if it was read from the store.
    pub fn etag(&self, id: &ManifestId) -> Option<&str> {
        self.etags.get(id).map(String::as_str)
    }
}

impl From<Manifests> for StoredManifests {
    fn from(manifests: Manifests) -> Self {
        Self {
            manifests,
            etags: HashMap::new(),
        }
    }
}

/// Outcome of publishing a whole manifest set.
#[derive(Debug, Default)]
pub struct PublishReport {
    pub created: usize,
    pub deleted: usize,
    pub modified: usize,
    pub failures: Vec<(ManifestId, StoreError)>,
}

impl PublishReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

struct RawResponse {
    status: StatusCode,
    etag: Option<String>,
    body: Bytes,
}

/// Client for a manifest store speaking conditional HTTP.
///
/// Never retries: a [`StoreError::Conflict`] means another writer got there
/// first, and the caller has to re-read before deciding what to do.
#[derive(Debug, Clone)]
pub struct HttpStateManager {
    authority: String,
    host: String,
    port: u16,
    prefix: String,
    timeout: Duration,
}

impl HttpStateManager {
    /// Create a client for the store at `base_url` (plain `http://` only).
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let invalid = |reason: &str| StoreError::InvalidUrl {
            url: base_url.to_string(),
            reason: reason.to_string(),
        };

        let uri = base_url
            .parse::<Uri>()
            .map_err(|e| invalid(&e.to_string()))?;

        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => return Err(invalid(&format!("unsupported scheme '{}'", other))),
            None => return Err(invalid("missing scheme")),
        }

        let authority = uri.authority().ok_or_else(|| invalid("missing host"))?;

        Ok(Self {
            authority: authority.to_string(),
            // IPv6 literals keep their brackets in the authority only.
            host: authority
                .host()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .to_string(),
            port: authority.port_u16().unwrap_or(80),
            prefix: uri.path().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn resource(&self, id: &ManifestId) -> String {
        format!(
            "{}/manifest?repo={}&offset={}&flavor={}",
            self.prefix,
            urlencoding::encode(&id.source.repo),
            urlencoding::encode(&id.source.dir),
            urlencoding::encode(&id.flavor)
        )
    }

    /// Read a manifest and the tag it is currently stored at.
    pub async fn read(&self, id: &ManifestId) -> Result<Versioned<Manifest>, StoreError> {
        let resp = self.get(id).await?;
        let etag = resp
            .etag
            .ok_or_else(|| StoreError::MissingEtag(id.clone()))?;
        let value = serde_json::from_slice(&resp.body).map_err(|e| StoreError::Decode {
            id: id.clone(),
            reason: e.to_string(),
        })?;
        Ok(Versioned { value, etag })
    }

    /// Store a manifest that must not exist yet.
    pub async fn create(&self, manifest: &Manifest) -> Result<(), StoreError> {
        let id = manifest.id();
        let body = encode(manifest)?;
        tracing::debug!(manifest = %id, "creating manifest");

        let resp = self
            .send(self.request(Method::PUT, &id, Some((IF_NONE_MATCH, "*")), body)?)
            .await?;
        expect_success(id, resp.status)
    }

    /// Delete a manifest, provided the stored document still equals it.
    pub async fn delete(&self, manifest: &Manifest) -> Result<(), StoreError> {
        let etag = self.expect_stored(manifest).await?;
        self.delete_at(manifest, &etag).await
    }

    /// Delete a manifest, provided it is still stored at `etag`.
    pub async fn delete_at(&self, manifest: &Manifest, etag: &str) -> Result<(), StoreError> {
        let id = manifest.id();
        tracing::debug!(manifest = %id, etag = %etag, "deleting manifest");

        let resp = self
            .send(self.request(Method::DELETE, &id, Some((IF_MATCH, etag)), Bytes::new())?)
            .await?;
        expect_success(id, resp.status)
    }

    /// Replace `pair.prior` with `pair.post`, provided the stored document
    /// still equals `pair.prior`.
    pub async fn modify(&self, pair: &ManifestPair) -> Result<(), StoreError> {
        check_pair(pair)?;
        let etag = self.expect_stored(&pair.prior).await?;
        self.modify_at(pair, &etag).await
    }

    /// Replace `pair.prior` with `pair.post`, provided the stored document
    /// is still at `etag`.
    pub async fn modify_at(&self, pair: &ManifestPair, etag: &str) -> Result<(), StoreError> {
        check_pair(pair)?;
        let id = pair.post.id();
        let body = encode(&pair.post)?;
        tracing::debug!(manifest = %id, etag = %etag, "modifying manifest");

        let resp = self
            .send(self.request(Method::PUT, &id, Some((IF_MATCH, etag)), body)?)
            .await?;
        expect_success(id, resp.status)
    }

    /// Write `post` over `prior`: create, delete or modify each manifest that
    /// differs. Writes over a tagged prior are conditional on that tag, so a
    /// change made by someone else since it was read is a conflict. Failures
    /// are collected per manifest and do not stop the rest.
    pub async fn publish(&self, prior: &StoredManifests, post: &Manifests) -> PublishReport {
        let diff = Manifests::diff(prior.manifests(), post);
        let mut report = PublishReport::default();

        for manifest in &diff.new {
            match self.create(manifest).await {
                Ok(()) => report.created += 1,
                Err(e) => report.failures.push((manifest.id(), e)),
            }
        }

        for manifest in &diff.gone {
            let result = match prior.etag(&manifest.id()) {
                Some(etag) => self.delete_at(manifest, etag).await,
                None => self.delete(manifest).await,
            };
            match result {
                Ok(()) => report.deleted += 1,
                Err(e) => report.failures.push((manifest.id(), e)),
            }
        }

        for pair in &diff.changed {
            let result = match prior.etag(&pair.id()) {
                Some(etag) => self.modify_at(pair, etag).await,
                None => self.modify(pair).await,
            };
            match result {
                Ok(()) => report.modified += 1,
                Err(e) => report.failures.push((pair.id(), e)),
            }
        }

        for (id, e) in &report.failures {
            tracing::warn!(manifest = %id, error = %e, "failed to publish manifest");
        }

        report
    }

    async fn get(&self, id: &ManifestId) -> Result<RawResponse, StoreError> {
        let resp = self
            .send(self.request(Method::GET, id, None, Bytes::new())?)
            .await?;
        match resp.status {
            s if s.is_success() => Ok(resp),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(id.clone())),
            status => Err(StoreError::Status {
                id: id.clone(),
                status,
            }),
        }
    }

    /// Current tag of `expected`, provided the stored document equals it.
    async fn expect_stored(&self, expected: &Manifest) -> Result<String, StoreError> {
        let id = expected.id();
        let stored = self.read(&id).await?;
        if stored.value != *expected {
            return Err(StoreError::Stale(id));
        }
        Ok(stored.etag)
    }

    fn request(
        &self,
        method: Method,
        id: &ManifestId,
        condition: Option<(hyper::header::HeaderName, &str)>,
        body: Bytes,
    ) -> Result<Request<Full<Bytes>>, StoreError> {
        let mut builder = Request::builder()
            .method(method)
            .uri(self.resource(id))
            .header(HOST, &self.authority);

        if let Some((name, value)) = condition {
            builder = builder.header(name, value);
        }
        if !body.is_empty() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }

        builder
            .body(Full::new(body))
            .map_err(|e| StoreError::Transport(format!("failed to build request: {}", e)))
    }

    async fn send(&self, req: Request<Full<Bytes>>) -> Result<RawResponse, StoreError> {
        tokio::time::timeout(self.timeout, self.send_inner(req))
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }

    async fn send_inner(&self, req: Request<Full<Bytes>>) -> Result<RawResponse, StoreError> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| {
                StoreError::Transport(format!("failed to connect to {}: {}", self.authority, e))
            })?;

        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| StoreError::Transport(format!("HTTP handshake failed: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::warn!("state server connection error: {}", e);
            }
        });

        let method = req.method().clone();
        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| StoreError::Transport(format!("request failed: {}", e)))?;

        let status = resp.status();
        let etag = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| StoreError::Transport(format!("failed to read response: {}", e)))?
            .to_bytes();

        tracing::trace!(%method, %status, "state server responded");
        Ok(RawResponse { status, etag, body })
    }
}

fn encode(manifest: &Manifest) -> Result<Bytes, StoreError> {
    serde_json::to_vec(manifest)
        .map(Bytes::from)
        .map_err(|e| StoreError::Encode(e.to_string()))
}

fn check_pair(pair: &ManifestPair) -> Result<(), StoreError> {
    let prior = pair.prior.id();
    let post = pair.post.id();
    if prior != post {
        return Err(StoreError::MismatchedPair { prior, post });
    }
    Ok(())
}

fn expect_success(id: ManifestId, status: StatusCode) -> Result<(), StoreError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(StoreError::Conflict { id, status })
    }
}
