//! API client shared by every store

use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::error::{CourierError, CourierResult};
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Thin client turning transport responses into typed results
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Send a request and return the raw response, whatever its status
    pub async fn send(&self, request: ApiRequest) -> CourierResult<ApiResponse> {
        self.transport.send(request).await
    }

    /// Send a request and decode a successful body into `T`
    ///
    /// A non-success status becomes [`CourierError::Http`] carrying the
    /// server `detail`, or `fallback` when the body has none.
    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest, fallback: &str) -> CourierResult<T> {
        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(error_from_response(&response, fallback));
        }
        response.json()
    }
}

/// Map a failed response to an HTTP error
pub fn error_from_response(response: &ApiResponse, fallback: &str) -> CourierError {
    let message = response.detail().unwrap_or_else(|| fallback.to_string());
    CourierError::http(response.status, message)
}
