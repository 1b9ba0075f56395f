//! HTTP Client Orchestration
//!
//! Composes the response cache, retry executor and auth session into one
//! transparent request surface. Callers just ask for `get`/`post`/...; the
//! client consults the cache on reads, retries transient failures with
//! backoff, refreshes an expired token and replays exactly once, and
//! invalidates cached reads after every successful mutation.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::{multipart, Method, StatusCode};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::auth::AuthProvider;
use crate::cache::{FileBackend, ResponseCache, CACHE_NAMESPACE};
use crate::client::options::RequestOptions;
use crate::client::stages::{apply_pipeline, RequestContext};
use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::models::ApiEnvelope;
use crate::notify::{Notifier, TracingNotifier};
use crate::retry::RetryExecutor;

// == Payload ==
/// Request body, kept in an owned, rebuildable form so retries and the
/// post-refresh replay can reconstruct the wire body for every attempt (a
/// multipart form cannot be reused once sent).
enum Payload {
    Empty,
    Json(Value),
    Multipart {
        field: String,
        file_name: String,
        bytes: Vec<u8>,
    },
}

// == Http Client ==
/// Resilient API client: caching reads, retried sends, one-shot token
/// refresh, write-path cache invalidation.
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    cache: ResponseCache,
    auth: Arc<dyn AuthProvider>,
    notifier: Arc<dyn Notifier>,
    default_retry: u32,
    default_retry_delay: Duration,
}

impl HttpClient {
    // == Constructor ==
    /// Creates a client from configuration and an auth session.
    ///
    /// The response cache is durable when `cache_dir` is configured,
    /// memory-only otherwise.
    pub fn new(config: &ClientConfig, auth: Arc<dyn AuthProvider>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(ApiError::from)?;

        let cache = match &config.cache_dir {
            Some(root) => ResponseCache::with_backend(
                config.cache_max_entries,
                config.cache_default_ttl(),
                Box::new(FileBackend::new(root.join(CACHE_NAMESPACE))),
            ),
            None => ResponseCache::new(config.cache_max_entries, config.cache_default_ttl()),
        };

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache,
            auth,
            notifier: Arc::new(TracingNotifier),
            default_retry: config.default_retry,
            default_retry_delay: config.default_retry_delay(),
        })
    }

    /// Replaces the notification sink.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replaces the response cache (e.g. to share one across clients).
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = cache;
        self
    }

    /// The shared response cache, for manual invalidation and statistics.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    // == Read Path ==
    /// GET with optional response caching.
    ///
    /// A cache hit returns immediately: no network call, no retry, no auth
    /// logic.
    pub async fn get(&self, url: &str, opts: RequestOptions) -> Result<ApiEnvelope> {
        let result = self.get_inner(url, &opts).await;
        self.finish(result, &opts)
    }

    async fn get_inner(&self, url: &str, opts: &RequestOptions) -> Result<ApiEnvelope> {
        if opts.cache.is_enabled() {
            if let Some(envelope) = self.cache.fetch(url, opts.params.as_ref()).await {
                debug!(url, "Serving response from cache");
                return Ok(envelope);
            }
        }

        let payload = Payload::Empty;
        let envelope = self
            .run_resilient(opts, || self.send_envelope(Method::GET, url, &payload, opts))
            .await?;

        if opts.cache.is_enabled() {
            self.cache
                .store(
                    url,
                    opts.params.as_ref(),
                    envelope.clone(),
                    opts.cache.ttl_override(),
                )
                .await;
        }

        Ok(envelope)
    }

    // == Write Path ==
    /// POST; invalidates cached reads under the resource on success.
    pub async fn post(&self, url: &str, body: Option<Value>, opts: RequestOptions) -> Result<ApiEnvelope> {
        self.mutate(Method::POST, url, body.map_or(Payload::Empty, Payload::Json), opts)
            .await
    }

    /// PUT; invalidates cached reads under the resource on success.
    pub async fn put(&self, url: &str, body: Option<Value>, opts: RequestOptions) -> Result<ApiEnvelope> {
        self.mutate(Method::PUT, url, body.map_or(Payload::Empty, Payload::Json), opts)
            .await
    }

    /// PATCH; invalidates cached reads under the resource on success.
    pub async fn patch(&self, url: &str, body: Option<Value>, opts: RequestOptions) -> Result<ApiEnvelope> {
        self.mutate(Method::PATCH, url, body.map_or(Payload::Empty, Payload::Json), opts)
            .await
    }

    /// DELETE; invalidates cached reads under the resource on success.
    pub async fn delete(&self, url: &str, opts: RequestOptions) -> Result<ApiEnvelope> {
        self.mutate(Method::DELETE, url, Payload::Empty, opts).await
    }

    /// Uploads a file as a multipart body. Same resilience and
    /// invalidation behavior as any other write.
    pub async fn upload(
        &self,
        url: &str,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        opts: RequestOptions,
    ) -> Result<ApiEnvelope> {
        let payload = Payload::Multipart {
            field: "file".to_string(),
            file_name: file_name.into(),
            bytes,
        };
        self.mutate(Method::POST, url, payload, opts).await
    }

    async fn mutate(
        &self,
        method: Method,
        url: &str,
        payload: Payload,
        opts: RequestOptions,
    ) -> Result<ApiEnvelope> {
        let result = self.mutate_inner(method, url, &payload, &opts).await;
        self.finish(result, &opts)
    }

    async fn mutate_inner(
        &self,
        method: Method,
        url: &str,
        payload: &Payload,
        opts: &RequestOptions,
    ) -> Result<ApiEnvelope> {
        let envelope = self
            .run_resilient(opts, || {
                self.send_envelope(method.clone(), url, payload, opts)
            })
            .await?;

        // Any write may touch any cached read under the same resource
        if let Some(segment) = resource_segment(url) {
            self.cache.invalidate_by_pattern(&segment).await;
        }

        Ok(envelope)
    }

    // == Download ==
    /// Streams a raw response body into `dest`, bypassing envelope parsing.
    /// Never cached. Returns the number of bytes written.
    pub async fn download(
        &self,
        url: &str,
        dest: impl AsRef<Path>,
        opts: RequestOptions,
    ) -> Result<u64> {
        let dest = dest.as_ref();
        let result = self
            .run_resilient(&opts, || self.fetch_raw(url, dest, &opts))
            .await;
        self.finish(result, &opts)
    }

    async fn fetch_raw(&self, url: &str, dest: &Path, opts: &RequestOptions) -> Result<u64> {
        let response = self.dispatch(Method::GET, url, &Payload::Empty, opts).await?;

        let status = response.status();
        if !status.is_success() {
            let message = read_error_message(response).await;
            return Err(classify_status(status, url, message));
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("cannot create {}: {}", dest.display(), e)))?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(ApiError::from)?;
            file.write_all(&chunk)
                .await
                .map_err(|e| ApiError::InvalidRequest(format!("write to {} failed: {}", dest.display(), e)))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("write to {} failed: {}", dest.display(), e)))?;

        debug!(url, bytes = written, dest = %dest.display(), "Download complete");
        Ok(written)
    }

    // == Resilience Core ==
    /// Runs one request operation through the retry executor, then handles
    /// an expired session: one refresh, one replay, outside the retry
    /// budget. Refresh or replay failure tears the session down and
    /// signals the login redirect.
    async fn run_resilient<T, F, Fut>(&self, opts: &RequestOptions, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let executor = RetryExecutor::new(
            opts.retry.unwrap_or(self.default_retry),
            opts.retry_delay.unwrap_or(self.default_retry_delay),
        );

        match executor.execute_when(&mut op, ApiError::is_retryable).await {
            Ok(value) => Ok(value),
            Err(ApiError::AuthExpired) => {
                if self.auth.token().is_some() && self.auth.refresh().await {
                    debug!("Replaying request with refreshed token");
                    match op().await {
                        Ok(value) => Ok(value),
                        Err(err) => {
                            self.teardown_session();
                            Err(err)
                        }
                    }
                } else {
                    self.teardown_session();
                    Err(ApiError::AuthExpired)
                }
            }
            Err(err) => Err(err),
        }
    }

    /// One wire attempt: dispatch, classify the HTTP status, decode the
    /// envelope, check the business code.
    async fn send_envelope(
        &self,
        method: Method,
        url: &str,
        payload: &Payload,
        opts: &RequestOptions,
    ) -> Result<ApiEnvelope> {
        let response = self.dispatch(method, url, payload, opts).await?;

        let status = response.status();
        if !status.is_success() {
            let message = read_error_message(response).await;
            return Err(classify_status(status, url, message));
        }

        let envelope: ApiEnvelope = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        if envelope.is_success() {
            Ok(envelope)
        } else {
            Err(ApiError::Business {
                code: envelope.code,
                message: envelope.message,
            })
        }
    }

    /// Builds and sends one attempt through the stage pipeline.
    async fn dispatch(
        &self,
        method: Method,
        url: &str,
        payload: &Payload,
        opts: &RequestOptions,
    ) -> Result<reqwest::Response> {
        let full_url = self.join_url(url);
        let mut builder = self.http.request(method.clone(), &full_url);

        builder = match payload {
            Payload::Empty => builder,
            Payload::Json(body) => builder.json(body),
            Payload::Multipart {
                field,
                file_name,
                bytes,
            } => {
                let part = multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                builder.multipart(multipart::Form::new().part(field.clone(), part))
            }
        };

        let ctx = RequestContext::new(self.auth.token(), opts);
        debug!(%method, url = %full_url, trace_id = %ctx.trace_id, "Dispatching request");
        let builder = apply_pipeline(builder, &ctx);

        builder.send().await.map_err(ApiError::from)
    }

    /// Emits the single per-invocation failure notification, honoring
    /// `silent`.
    fn finish<T>(&self, result: Result<T>, opts: &RequestOptions) -> Result<T> {
        if let Err(err) = &result {
            if !opts.silent {
                self.notifier.error(err.category(), &err.to_string());
            }
        }
        result
    }

    /// Clears the session and signals the login redirect.
    fn teardown_session(&self) {
        warn!("Irrecoverable auth failure; tearing down session");
        self.auth.clear();
        self.notifier.session_expired();
    }

    /// Joins a request path onto the base URL.
    fn join_url(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }
}

// == Status Classification ==
/// Maps a non-success HTTP status onto the failure taxonomy.
fn classify_status(status: StatusCode, url: &str, message: String) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED => ApiError::AuthExpired,
        StatusCode::FORBIDDEN => ApiError::Forbidden(message),
        StatusCode::NOT_FOUND => ApiError::NotFound(url.to_string()),
        s if s.is_server_error() => ApiError::Server {
            status: s.as_u16(),
            message,
        },
        s => ApiError::Http {
            status: s.as_u16(),
            message,
        },
    }
}

/// Pulls a human-readable message out of an error response body, falling
/// back to the raw text.
async fn read_error_message(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    if let Ok(body) = serde_json::from_str::<Value>(&text) {
        if let Some(message) = body.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    if text.is_empty() {
        "request failed".to_string()
    } else {
        text
    }
}

/// The leading path segment of a request URL, used as the invalidation
/// pattern after a mutation: a write to `/certificates/42` flushes every
/// cached read whose key contains `/certificates`.
fn resource_segment(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.split('/')
        .find(|segment| !segment.is_empty())
        .map(|segment| format!("/{}", segment))
}
