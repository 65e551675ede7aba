//! Helpers shared by store tests

use parking_lot::Mutex;
use reqwest::header::AUTHORIZATION;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::api::ApiClient;
use crate::error::CourierResult;
use crate::navigation::{MockNavigator, MockNotifier};
use crate::session::AuthStore;
use crate::storage::MemoryStore;
use crate::transport::{ApiRequest, ApiResponse, MockTransport, Transport};

pub(crate) const TOKEN: &str = "test-token";

/// Auth store restored from storage, signed in when `token` is set
pub(crate) fn auth_store(token: Option<&str>) -> Arc<AuthStore> {
    let storage = match token {
        Some(token) => MemoryStore::with_entries([(crate::TOKEN_KEY, token)]),
        None => MemoryStore::new(),
    };
    Arc::new(AuthStore::new(
        ApiClient::new(Arc::new(MockTransport::new())),
        Arc::new(storage),
        Arc::new(MockNavigator::new()),
        Arc::new(MockNotifier::new()),
    ))
}

pub(crate) fn signed_in() -> Arc<AuthStore> {
    auth_store(Some(TOKEN))
}

pub(crate) fn signed_out() -> Arc<AuthStore> {
    auth_store(None)
}

pub(crate) fn client(transport: MockTransport) -> ApiClient {
    ApiClient::new(Arc::new(transport))
}

/// Transport that fails the test if any request is sent
pub(crate) fn offline() -> ApiClient {
    let mut transport = MockTransport::new();
    transport.expect_send().never();
    client(transport)
}

pub(crate) fn json(status: u16, value: serde_json::Value) -> CourierResult<ApiResponse> {
    Ok(ApiResponse::json_body(status, &value))
}

pub(crate) fn has_bearer(request: &ApiRequest) -> bool {
    request
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some("Bearer test-token")
}

type Responder = Box<dyn Fn(&ApiRequest) -> CourierResult<ApiResponse> + Send + Sync>;
type Matcher = Box<dyn Fn(&ApiRequest) -> bool + Send + Sync>;

struct PendingGate {
    matches: Matcher,
    entered: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

/// Test side of a held request
pub(crate) struct Gate {
    /// Fires once the matching request reached the transport
    pub entered: oneshot::Receiver<()>,
    /// Lets the held response through
    pub release: oneshot::Sender<()>,
}

/// Transport that can hold chosen responses until the test releases them
///
/// Responses are computed when a request arrives, so the responder sees
/// requests in issue order even when they complete out of order.
pub(crate) struct GatedTransport {
    respond: Responder,
    gates: Mutex<Vec<PendingGate>>,
}

impl GatedTransport {
    pub(crate) fn new(respond: impl Fn(&ApiRequest) -> CourierResult<ApiResponse> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            gates: Mutex::new(Vec::new()),
        }
    }

    /// Hold the next request accepted by `matches`
    pub(crate) fn gate(&self, matches: impl Fn(&ApiRequest) -> bool + Send + Sync + 'static) -> Gate {
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        self.gates.lock().push(PendingGate {
            matches: Box::new(matches),
            entered: entered_tx,
            release: release_rx,
        });
        Gate {
            entered: entered_rx,
            release: release_tx,
        }
    }
}

#[async_trait::async_trait]
impl Transport for GatedTransport {
    async fn send(&self, request: ApiRequest) -> CourierResult<ApiResponse> {
        let response = (self.respond)(&request);
        let pending = {
            let mut gates = self.gates.lock();
            let index = gates.iter().position(|gate| (gate.matches)(&request));
            index.map(|index| gates.remove(index))
        };
        if let Some(gate) = pending {
            let _ = gate.entered.send(());
            let _ = gate.release.await;
        }
        response
    }
}

/// Client over a gated transport
pub(crate) fn gated_client(transport: &Arc<GatedTransport>) -> ApiClient {
    ApiClient::new(transport.clone())
}
