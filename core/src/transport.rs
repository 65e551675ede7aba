//! HTTP transport for the Courier API
//!
//! A [`Transport`] moves one [`ApiRequest`] to the server and hands back the
//! raw [`ApiResponse`]. A non-success status is still a response; only a
//! request that never completes is an error here.

use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::error::{CourierError, CourierResult};

/// HTTP method used by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body
    Empty,
    /// `application/json`
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
}

/// A request against the API, path relative to the API root
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Append a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Merge headers into the request
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Attach a JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> CourierResult<Self> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Attach a form-encoded body
    pub fn form<K: Into<String>, V: Into<String>>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self {
        self.body = RequestBody::Form(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Query value by key
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// A completed HTTP exchange
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Build a response carrying a JSON body
    pub fn json_body(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body
    pub fn json<T: DeserializeOwned>(&self) -> CourierResult<T> {
        serde_json::from_str(&self.body).map_err(|e| CourierError::parse(e.to_string()))
    }

    /// Server-provided error detail, if the body carries one
    ///
    /// Plain string details are returned as-is; validation error lists have
    /// their `msg` entries joined.
    pub fn detail(&self) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(&self.body).ok()?;
        match value.get("detail")? {
            serde_json::Value::String(text) if !text.is_empty() => Some(text.clone()),
            serde_json::Value::Array(items) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect();
                if messages.is_empty() {
                    None
                } else {
                    Some(messages.join("; "))
                }
            }
            _ => None,
        }
    }
}

/// Moves requests to the API server
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and wait for the complete response
    async fn send(&self, request: ApiRequest) -> CourierResult<ApiResponse>;
}

/// Escape `raw` so it stays a single path segment
///
/// Everything outside `A-Z a-z 0-9 * - . _` is percent-encoded, including
/// `/`, `?`, `#` and space.
pub fn path_segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .map(|chunk| if chunk == "+" { "%20" } else { chunk })
        .collect()
}

/// reqwest-backed transport
pub struct HttpTransport {
    /// Shared connection pool
    client: reqwest::Client,
    /// Root every request path is joined onto
    root: Url,
}

impl HttpTransport {
    /// Create a transport from configuration
    pub fn new(config: &Config) -> CourierResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.api.user_agent.clone());
        if config.api.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.api.request_timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| CourierError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            root: config.api_root()?,
        })
    }

    /// Resolve an API path against the root
    pub fn url_for(&self, path: &str) -> CourierResult<Url> {
        Ok(self.root.join(path.trim_start_matches('/'))?)
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> CourierResult<ApiResponse> {
        let url = self.url_for(&request.path)?;
        debug!("{} {}", request.method, url);

        let builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        let mut builder = builder.headers(request.headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match request.body {
            RequestBody::Empty if request.method == Method::Post => {
                builder.header(reqwest::header::CONTENT_LENGTH, "0")
            }
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(fields) => builder.form(&fields),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| CourierError::network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| CourierError::network(e.to_string()))?;

        debug!("Response status {}", status);
        Ok(ApiResponse { status, body })
    }
}
