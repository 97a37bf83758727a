//! HTTP transport for the chat backend.
//!
//! [`Transport`] is the seam between the session core and the network: the
//! session controller and the cost-estimation sidecar are written against
//! the trait, and [`ChatClient`] is the reqwest-backed implementation that
//! talks to the real backend.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{
    ChatRequest, ChatResponse, ChatStreamRequest, CostEstimate, CostEstimateRequest,
    CostEstimateResponse, SystemPromptResponse,
};

const DEFAULT_BASE_URL: &str = "http://localhost:5000/";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A stream of response body bytes, with read errors already mapped into
/// this crate's error type.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// The network boundary of the session core.
///
/// Streaming and estimation never share state through the transport; each
/// call is independent.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens the streaming chat request and returns the response byte
    /// stream. Non-2xx statuses and empty bodies fail here, before any
    /// decoding begins.
    async fn open_stream(&self, request: &ChatStreamRequest) -> Result<ByteStream>;

    /// Issues the non-streaming chat request.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Requests an advisory cost estimate for a draft.
    async fn estimate_cost(&self, request: &CostEstimateRequest) -> Result<CostEstimate>;

    /// Fetches the backend's system prompt.
    async fn system_prompt(&self) -> Result<String>;
}

/// Client for the chat backend.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: ReqwestClient,
    base_url: Url,
}

impl ChatClient {
    /// Creates a client for the given base URL (default
    /// `http://localhost:5000/`).
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        Self::with_options(base_url, Some(DEFAULT_CONNECT_TIMEOUT))
    }

    /// Creates a client with a custom connect timeout.
    ///
    /// Only connection establishment is bounded; an open stream has no
    /// client-side deadline and relies on explicit cancellation.
    pub fn with_options(base_url: Option<&str>, connect_timeout: Option<Duration>) -> Result<Self> {
        let mut base = base_url.unwrap_or(DEFAULT_BASE_URL).to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::http_client(format!("Failed to build HTTP client: {e}"), Some(Box::new(e)))
        })?;

        Ok(Self { client, base_url })
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Map a reqwest send failure to our error type.
    fn map_request_error(e: reqwest::Error) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        if e.is_timeout() {
            Error::timeout(format!("Request timed out: {e}"))
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    /// Process a non-2xx response into our error type.
    ///
    /// The body is attempted as JSON with a structured `error` field,
    /// falling back to the status line when parsing fails.
    async fn process_error_response(response: Response) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        let status = response.status();

        #[derive(Deserialize)]
        struct ErrorBody {
            error: Option<String>,
        }

        let message = match response.text().await {
            Ok(body) => serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| {
                    format!(
                        "HTTP {}: {}",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("unknown error")
                    )
                }),
            Err(e) => format!("Failed to read error response: {e}"),
        };

        Error::api(status.as_u16(), message)
    }
}

#[async_trait]
impl Transport for ChatClient {
    async fn open_stream(&self, request: &ChatStreamRequest) -> Result<ByteStream> {
        CLIENT_REQUESTS.click();
        let url = self.endpoint("api/chat/stream")?;

        let mut headers = self.default_headers();
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/event-stream"));

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }
        if response.content_length() == Some(0) {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Error::streaming("empty response body", None));
        }

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e)))
            })
        });
        Ok(Box::pin(stream))
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        CLIENT_REQUESTS.click();
        let url = self.endpoint("api/chat")?;

        let response = self
            .client
            .post(url)
            .headers(self.default_headers())
            .json(request)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response.json::<ChatResponse>().await.map_err(|e| {
            Error::serialization(format!("Failed to parse response: {e}"), Some(Box::new(e)))
        })
    }

    async fn estimate_cost(&self, request: &CostEstimateRequest) -> Result<CostEstimate> {
        CLIENT_REQUESTS.click();
        let url = self.endpoint("api/estimate-cost")?;

        let response = self
            .client
            .post(url)
            .headers(self.default_headers())
            .json(request)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        let body = response.json::<CostEstimateResponse>().await.map_err(|e| {
            Error::serialization(format!("Failed to parse response: {e}"), Some(Box::new(e)))
        })?;
        Ok(CostEstimate {
            estimated_cost_rub: body.estimated_cost_rub,
        })
    }

    async fn system_prompt(&self) -> Result<String> {
        CLIENT_REQUESTS.click();
        let url = self.endpoint("api/system-prompt")?;

        let response = self
            .client
            .get(url)
            .headers(self.default_headers())
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        let body = response.json::<SystemPromptResponse>().await.map_err(|e| {
            Error::serialization(format!("Failed to parse response: {e}"), Some(Box::new(e)))
        })?;
        Ok(body.prompt)
    }
}
