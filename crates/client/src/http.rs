//! The HTTP transport boundary.
//!
//! The engine prepares complete requests (method, URL, bearer token, body)
//! and hands them to an [`HttpTransport`]. Production code uses
//! [`ReqwestTransport`]; tests substitute scripted implementations so no
//! scenario touches the network.

use async_trait::async_trait;
use http::Method;
use url::Url;

use crate::error::{Error, Result};

/// A fully prepared request, ready for dispatch.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// The HTTP method.
    pub method: Method,

    /// The absolute request URL, query included.
    pub url: Url,

    /// The access token for the `Authorization: Bearer` header, if the
    /// endpoint is authenticated.
    pub bearer: Option<String>,

    /// The JSON request body, if any.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// The path portion of the URL, for request matching in tests and logs.
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// A raw response as seen by the engine.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: u16,

    /// The raw response body.
    pub body: Vec<u8>,
}

/// The transport the engine dispatches requests through.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Executes a single request.
    ///
    /// Implementations return `Ok` for any response the server produced,
    /// whatever its status; `Err` is reserved for failures to obtain a
    /// response at all.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// The production transport, backed by a shared [`reqwest::Client`].
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a fresh connection pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing `reqwest::Client`, keeping its configuration.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(request.method, request.url);
        if let Some(token) = request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body {
            builder = builder.header(http::header::CONTENT_TYPE, "application/json").body(body);
        }

        let response = builder.send().await.map_err(|e| Error::Transport(Box::new(e)))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| Error::Transport(Box::new(e)))?.to_vec();
        Ok(HttpResponse { status, body })
    }
}
