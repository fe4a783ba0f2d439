//! vLLM API client
//!
//! Speaks the `/generate` contract of a vLLM-style inference server:
//! - `generate`: one POST, one JSON document back
//! - `stream`: one POST with `"stream": true`, NUL-delimited JSON frames back
//!
//! Timeouts use reqwest's per-request timeout, which runs from connect until
//! the response body has been fully read. For `stream` that means the whole
//! lifetime of the stream, not each individual read.

use crate::errors::{ClientError, Result};
use crate::streaming::parser::{FrameDecoder, MAX_FRAME_SIZE};
use crate::streaming::stream::FrameStream;
use crate::telemetry::{RequestLogger, TracingLogger};
use crate::types::{build_payload, decode_text_bytes, SamplingParams};
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde_json::{Map, Value};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

/// Default vLLM API server address
pub const DEFAULT_VLLM_URL: &str = "http://127.0.0.1:8000";

/// Path of the generation endpoint, appended to the base URL
pub const GENERATE_PATH: &str = "/generate";

/// vLLM client
///
/// Cheap to clone. Clones share the connection pool and the immutable
/// configuration, so one instance can serve many concurrent calls.
#[derive(Clone)]
pub struct VllmClient {
    client: Client,
    base_url: String,
    endpoint: String,
    default_timeout: Option<Duration>,
    max_frame_size: usize,
    logger: Option<Arc<dyn RequestLogger>>,
}

impl VllmClient {
    /// Create a client with no logger and no default timeout
    ///
    /// `base_url` must not include the `/generate` suffix.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::builder(base_url).build()
    }

    /// Start configuring a client
    pub fn builder(base_url: &str) -> VllmClientBuilder {
        VllmClientBuilder::new(base_url)
    }

    /// Generate completions and wait for the full response
    pub async fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<Vec<String>> {
        self.generate_with(prompt, params, &CallOptions::default())
            .await
    }

    /// Generate completions with per-call overrides
    ///
    /// Returns one cumulative string (prompt included) per completion slot,
    /// in server order.
    pub async fn generate_with(
        &self,
        prompt: &str,
        params: &SamplingParams,
        options: &CallOptions,
    ) -> Result<Vec<String>> {
        let payload = build_payload(prompt, params, false, options.extra.as_ref());
        let timeout = self.effective_timeout(options);

        let response = self.send(&payload, timeout).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::from_transport(e, timeout))?;

        let text = decode_text_bytes(&body)?;
        if let Some(logger) = &self.logger {
            logger.response(&self.endpoint, &text);
        }

        Ok(text)
    }

    /// Open a streaming generation
    pub async fn stream(&self, prompt: &str, params: &SamplingParams) -> Result<GenerationStream> {
        self.stream_with(prompt, params, &CallOptions::default())
            .await
    }

    /// Open a streaming generation with per-call overrides
    ///
    /// Resolves once the response headers arrive; a non-success status is
    /// reported here, before any frame is read. Each item of the returned
    /// stream is the cumulative text of every slot so far. Dropping the
    /// stream releases the connection.
    pub async fn stream_with(
        &self,
        prompt: &str,
        params: &SamplingParams,
        options: &CallOptions,
    ) -> Result<GenerationStream> {
        let payload = build_payload(prompt, params, true, options.extra.as_ref());
        let timeout = self.effective_timeout(options);

        let response = self.send(&payload, timeout).await?;
        let bytes: ByteStream = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| ClientError::from_transport(e, timeout)))
            .boxed();

        let decoder = FrameDecoder::with_max_frame_size(self.max_frame_size);
        Ok(GenerationStream {
            frames: FrameStream::with_decoder(bytes, decoder),
            url: self.endpoint.clone(),
            logger: self.logger.clone(),
        })
    }

    async fn send(
        &self,
        payload: &Map<String, Value>,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response> {
        if let Some(logger) = &self.logger {
            logger.request(&self.endpoint, payload);
        }

        let mut request = self.client.post(&self.endpoint).json(payload);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::from_transport(e, timeout))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(
                        target: "vllm_client",
                        status,
                        error = %e,
                        "failed to read error body"
                    );
                    "Unknown error".to_string()
                }
            };
            return Err(ClientError::HttpStatus { status, body });
        }

        Ok(response)
    }

    fn effective_timeout(&self, options: &CallOptions) -> Option<Duration> {
        options.timeout.or(self.default_timeout)
    }

    /// Get base URL, without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the full generation endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get the timeout applied when a call does not set one
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }
}

impl std::fmt::Debug for VllmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VllmClient")
            .field("endpoint", &self.endpoint)
            .field("default_timeout", &self.default_timeout)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

/// Builder for [`VllmClient`]
pub struct VllmClientBuilder {
    base_url: String,
    default_timeout: Option<Duration>,
    max_frame_size: usize,
    logger: Option<Arc<dyn RequestLogger>>,
    http: Option<Client>,
}

impl VllmClientBuilder {
    fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            default_timeout: None,
            max_frame_size: MAX_FRAME_SIZE,
            logger: None,
            http: None,
        }
    }

    /// Timeout for calls that do not set their own
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Attach a request logger
    pub fn logger(mut self, logger: Arc<dyn RequestLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Attach a [`TracingLogger`]
    pub fn tracing(self) -> Self {
        self.logger(Arc::new(TracingLogger))
    }

    /// Largest stream frame accepted before the stream is aborted
    pub fn max_frame_size(mut self, bytes: usize) -> Self {
        self.max_frame_size = bytes;
        self
    }

    /// Use a preconfigured reqwest client (proxies, TLS, pooling)
    ///
    /// A timeout configured on that client is invisible to this crate: when
    /// it fires and no call or default timeout is set, the error reports
    /// `Timeout { duration_ms: 0 }`.
    pub fn http_client(mut self, client: Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Validate the base URL and build the client
    pub fn build(self) -> Result<VllmClient> {
        let base_url = normalize_base_url(&self.base_url)?;
        let endpoint = format!("{}{}", base_url, GENERATE_PATH);

        let client = match self.http {
            Some(client) => client,
            None => Client::builder().build().map_err(ClientError::Http)?,
        };

        Ok(VllmClient {
            client,
            base_url,
            endpoint,
            default_timeout: self.default_timeout,
            max_frame_size: self.max_frame_size,
            logger: self.logger,
        })
    }
}

/// Strip trailing slashes and reject URLs that already name the endpoint
fn normalize_base_url(base_url: &str) -> Result<String> {
    let trimmed = base_url.trim().trim_end_matches('/');

    if trimmed.ends_with(GENERATE_PATH) {
        return Err(ClientError::Config(format!(
            "Please remove {} from the end of the API URL: {}",
            GENERATE_PATH, base_url
        )));
    }

    let parsed = url::Url::parse(trimmed)
        .map_err(|e| ClientError::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
        return Err(ClientError::Config(format!(
            "Base URL must be an absolute http(s) URL: {}",
            base_url
        )));
    }

    Ok(trimmed.to_string())
}

/// Per-call settings
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Flat map merged into the request body last, overriding any field
    pub extra: Option<Map<String, Value>>,

    /// Overrides the client's default timeout for this call
    pub timeout: Option<Duration>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the override map
    pub fn extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Add a single override field
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Live streaming generation
///
/// Yields the `text` array of each frame. Ends normally when the server
/// closes the connection after a complete frame; ends with an error item on
/// timeout, transport failure, truncated or corrupt frames.
pub struct GenerationStream {
    frames: FrameStream<ByteStream>,
    url: String,
    logger: Option<Arc<dyn RequestLogger>>,
}

impl GenerationStream {
    /// Number of frames received so far
    pub fn frames_received(&self) -> usize {
        self.frames.frames_received()
    }

    /// True once the stream has ended
    pub fn is_closed(&self) -> bool {
        self.frames.is_closed()
    }

    /// Drain the stream and return the last frame
    ///
    /// Empty when the server sent no frames.
    pub async fn final_text(mut self) -> Result<Vec<String>> {
        let mut last = Vec::new();
        while let Some(text) = self.next().await {
            last = text?;
        }
        Ok(last)
    }
}

impl Stream for GenerationStream {
    type Item = Result<Vec<String>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let was_closed = this.frames.is_closed();
        let polled = Pin::new(&mut this.frames).poll_next(cx);

        if let Some(logger) = &this.logger {
            match &polled {
                Poll::Ready(Some(Ok(text))) => {
                    logger.frame(&this.url, this.frames.frames_received() - 1, text)
                }
                Poll::Ready(None) if !was_closed => {
                    logger.finished(&this.url, this.frames.frames_received())
                }
                _ => {}
            }
        }

        polled
    }
}

impl std::fmt::Debug for GenerationStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationStream")
            .field("url", &self.url)
            .field("frames_received", &self.frames.frames_received())
            .field("closed", &self.frames.is_closed())
            .finish()
    }
}
