//! HTTP capability injected into the deck source.
//!
//! Production code uses [`ReqwestClient`]; tests swap in [`FixtureClient`] so no request
//! leaves the process.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("flasher/", env!("CARGO_PKG_VERSION"));
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// Transport-level failure: the request never produced a response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("client setup failed: {0}")]
    Setup(String),
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal GET capability.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// HTTP client backed by reqwest.
#[derive(Clone)]
pub struct ReqwestClient {
    client: Client,
    token: Option<String>,
}

impl ReqwestClient {
    /// Create a client. A token, when present, is sent as a bearer credential.
    pub fn new(token: Option<String>) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        Ok(Self { client, token })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.get(url).header(ACCEPT, GITHUB_ACCEPT);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

/// Canned responses keyed by URL. Unknown URLs answer 404.
#[derive(Default)]
pub struct FixtureClient {
    routes: Mutex<HashMap<String, Result<HttpResponse, String>>>,
    requests: Mutex<Vec<String>>,
}

impl FixtureClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `status` and `body`.
    pub fn with(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.insert(url, status, body);
        self
    }

    /// Make requests to `url` fail at the transport level.
    pub fn failing(self, url: impl Into<String>, message: impl Into<String>) -> Self {
        self.lock_routes().insert(url.into(), Err(message.into()));
        self
    }

    pub fn insert(&self, url: impl Into<String>, status: u16, body: impl Into<String>) {
        self.lock_routes()
            .insert(url.into(), Ok(HttpResponse::new(status, body)));
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn lock_routes(&self) -> std::sync::MutexGuard<'_, HashMap<String, Result<HttpResponse, String>>> {
        self.routes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl HttpClient for FixtureClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        match self.lock_routes().get(url) {
            Some(Ok(resp)) => Ok(resp.clone()),
            Some(Err(message)) => Err(TransportError::Network(message.clone())),
            None => Ok(HttpResponse::new(404, r#"{"message":"Not Found"}"#)),
        }
    }
}
