//! Compose store
//!
//! Sends outgoing mail through the backend and keeps the transient send
//! status. There is no draft model; the payload lives with the caller.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::api::ApiClient;
use crate::error::{CourierError, CourierResult};
use crate::models::{ComposeRequest, SendEmailResponse};
use crate::session::AuthStore;
use crate::status::RequestSequence;
use crate::transport::ApiRequest;

const NOT_AUTHENTICATED: &str = "User not authenticated.";
const SENT: &str = "Email sent successfully!";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeState {
    pub loading: bool,
    pub error: Option<String>,
    pub success_message: Option<String>,
}

/// Compose store
pub struct ComposeStore {
    api: ApiClient,
    auth: Arc<AuthStore>,
    state: RwLock<ComposeState>,
    sends: RequestSequence,
}

impl ComposeStore {
    pub fn new(api: ApiClient, auth: Arc<AuthStore>) -> Self {
        Self {
            api,
            auth,
            state: RwLock::new(ComposeState::default()),
            sends: RequestSequence::new(),
        }
    }

    pub fn snapshot(&self) -> ComposeState {
        self.state.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    pub fn success_message(&self) -> Option<String> {
        self.state.read().success_message.clone()
    }

    /// Send an email
    ///
    /// On failure the message is recorded on the store and the error is
    /// returned to the caller as well. When sends overlap every caller gets
    /// its own result, but only the latest one drives the store status.
    pub async fn send_email(&self, payload: &ComposeRequest) -> CourierResult<SendEmailResponse> {
        if !self.auth.is_authenticated() {
            self.state.write().error = Some(NOT_AUTHENTICATED.to_string());
            return Err(CourierError::auth(NOT_AUTHENTICATED));
        }

        let ticket = self.sends.begin();
        *self.state.write() = ComposeState {
            loading: true,
            ..Default::default()
        };

        let result = self.submit(payload).await;

        match &result {
            Ok(response) => info!(
                account_id = payload.from_account_id,
                "{}",
                response.message.as_deref().unwrap_or(SENT)
            ),
            Err(e) => error!(account_id = payload.from_account_id, "Send email error: {}", e),
        }
        if !self.sends.is_current(ticket) {
            debug!(account_id = payload.from_account_id, "Newer send in flight, leaving status alone");
            return result;
        }

        let mut state = self.state.write();
        state.loading = false;
        match &result {
            Ok(response) => {
                state.success_message = Some(response.message.clone().unwrap_or_else(|| SENT.to_string()));
            }
            Err(e) => state.error = Some(e.to_string()),
        }
        result
    }

    async fn submit(&self, payload: &ComposeRequest) -> CourierResult<SendEmailResponse> {
        debug!(
            account_id = payload.from_account_id,
            "Sending email to {} recipient(s)",
            payload.to_recipients.len()
        );
        let request = ApiRequest::post("/actions/send-email")
            .headers(self.auth.auth_header())
            .json(payload)?;
        let response = self.api.send(request).await?;

        if !response.is_success() {
            let message = response
                .detail()
                .unwrap_or_else(|| format!("Failed to send email (status {})", response.status));
            return Err(CourierError::http(response.status, message));
        }
        if response.body.trim().is_empty() {
            return Ok(SendEmailResponse::default());
        }
        response.json()
    }

    /// Clear the error and success messages
    pub fn clear_status(&self) {
        let mut state = self.state.write();
        state.error = None;
        state.success_message = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{
        client, gated_client, has_bearer, json, offline, signed_in, signed_out, GatedTransport,
    };
    use crate::transport::{ApiResponse, MockTransport, Method, RequestBody};
    use serde_json::json;

    fn payload() -> ComposeRequest {
        ComposeRequest {
            from_account_id: 3,
            to_recipients: vec!["bob@example.com".to_string()],
            cc_recipients: Vec::new(),
            bcc_recipients: Vec::new(),
            subject: "Hello".to_string(),
            body_text: "Hi Bob".to_string(),
            body_html: None,
        }
    }

    #[tokio::test]
    async fn test_unauthenticated_send_fails_fast() {
        let store = ComposeStore::new(offline(), signed_out());

        let err = store.send_email(&payload()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert_eq!(store.error().as_deref(), Some(NOT_AUTHENTICATED));
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_send_success_stores_server_message() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|request| {
                request.method == Method::Post
                    && request.path == "/actions/send-email"
                    && has_bearer(request)
                    && matches!(&request.body, RequestBody::Json(body)
                        if body["from_account_id"] == 3 && body["to_recipients"][0] == "bob@example.com")
            })
            .times(1)
            .returning(|_| json(200, json!({ "message": "Queued for delivery" })));
        let store = ComposeStore::new(client(transport), signed_in());

        let response = store.send_email(&payload()).await.unwrap();

        assert_eq!(response.message.as_deref(), Some("Queued for delivery"));
        assert_eq!(
            store.snapshot(),
            ComposeState {
                loading: false,
                error: None,
                success_message: Some("Queued for delivery".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_send_success_without_message_uses_default() {
        let mut transport = MockTransport::new();
        transport.expect_send().returning(|_| json(200, json!({})));
        let store = ComposeStore::new(client(transport), signed_in());

        store.send_email(&payload()).await.unwrap();
        assert_eq!(store.success_message().as_deref(), Some(SENT));
    }

    #[tokio::test]
    async fn test_server_detail_is_recorded_and_rethrown() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| json(500, json!({ "detail": "SMTP down" })));
        let store = ComposeStore::new(client(transport), signed_in());

        let err = store.send_email(&payload()).await.unwrap_err();

        assert_eq!(err.to_string(), "SMTP down");
        assert_eq!(store.error().as_deref(), Some("SMTP down"));
        assert_eq!(store.success_message(), None);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_unparsable_failure_reports_status() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .returning(|_| Ok(ApiResponse::new(502, "<html>Bad Gateway</html>")));
        let store = ComposeStore::new(client(transport), signed_in());

        let err = store.send_email(&payload()).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to send email (status 502)");
        assert_eq!(err.status(), Some(502));
    }

    #[tokio::test]
    async fn test_new_send_clears_previous_messages() {
        let mut transport = MockTransport::new();
        let mut seq = mockall::Sequence::new();
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| json(500, json!({ "detail": "SMTP down" })));
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| json(200, json!({ "message": "Sent" })));
        let store = ComposeStore::new(client(transport), signed_in());

        assert!(store.send_email(&payload()).await.is_err());
        store.send_email(&payload()).await.unwrap();

        assert_eq!(store.error(), None);
        assert_eq!(store.success_message().as_deref(), Some("Sent"));

        store.clear_status();
        assert_eq!(store.snapshot(), ComposeState::default());
    }

    #[tokio::test]
    async fn test_overlapping_sends_report_the_latest() {
        fn subject_is(request: &ApiRequest, subject: &str) -> bool {
            matches!(&request.body, RequestBody::Json(body) if body["subject"] == subject)
        }

        let transport = Arc::new(GatedTransport::new(|request| {
            if subject_is(request, "first") {
                json(500, json!({ "detail": "SMTP down" }))
            } else {
                json(200, json!({ "message": "Second sent" }))
            }
        }));
        let first_gate = transport.gate(|request| subject_is(request, "first"));
        let second_gate = transport.gate(|request| subject_is(request, "second"));
        let store = Arc::new(ComposeStore::new(gated_client(&transport), signed_in()));

        let send = |subject: &str| {
            let store = store.clone();
            let payload = ComposeRequest {
                subject: subject.to_string(),
                ..payload()
            };
            tokio::spawn(async move { store.send_email(&payload).await })
        };
        let first = send("first");
        first_gate.entered.await.unwrap();
        let second = send("second");
        second_gate.entered.await.unwrap();

        first_gate.release.send(()).unwrap();
        let err = first.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "SMTP down");
        assert!(store.is_loading());
        assert_eq!(store.error(), None);

        second_gate.release.send(()).unwrap();
        second.await.unwrap().unwrap();
        assert_eq!(
            store.snapshot(),
            ComposeState {
                loading: false,
                error: None,
                success_message: Some("Second sent".to_string()),
            }
        );
    }
}
