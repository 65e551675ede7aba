//! AI reply suggestions store

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::models::{MessageId, SuggestionsResponse};
use crate::session::AuthStore;
use crate::status::{FetchStatus, RequestSequence};
use crate::transport::ApiRequest;

const MESSAGE_ID_REQUIRED: &str = "Message ID is required to fetch suggestions.";
const NOT_AUTHENTICATED: &str = "User not authenticated.";
const FETCH_FAILED: &str = "Failed to fetch suggestions.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionsState {
    /// Message the current suggestions were requested for
    pub message_id: Option<MessageId>,
    pub suggestions: Vec<String>,
    pub status: FetchStatus,
    pub error: Option<String>,
}

/// AI reply suggestions store
pub struct SuggestionsStore {
    api: ApiClient,
    auth: Arc<AuthStore>,
    state: RwLock<SuggestionsState>,
    fetches: RequestSequence,
}

impl SuggestionsStore {
    pub fn new(api: ApiClient, auth: Arc<AuthStore>) -> Self {
        Self {
            api,
            auth,
            state: RwLock::new(SuggestionsState::default()),
            fetches: RequestSequence::new(),
        }
    }

    pub fn snapshot(&self) -> SuggestionsState {
        self.state.read().clone()
    }

    pub fn suggestions(&self) -> Vec<String> {
        self.state.read().suggestions.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().status.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    /// Ask the backend for reply candidates to `message_id`
    ///
    /// Previous suggestions are dropped before the request goes out. An
    /// empty list is a normal outcome, not an error.
    pub async fn fetch_reply_suggestions(&self, message_id: Option<MessageId>) {
        let Some(message_id) = message_id else {
            self.fail_locally(None, MESSAGE_ID_REQUIRED);
            return;
        };
        if !self.auth.is_authenticated() {
            self.fail_locally(Some(message_id), NOT_AUTHENTICATED);
            return;
        }

        let ticket = self.fetches.begin();
        *self.state.write() = SuggestionsState {
            message_id: Some(message_id),
            status: FetchStatus::Loading,
            ..Default::default()
        };

        debug!(message_id, "Requesting reply suggestions");
        let request = ApiRequest::post(format!("/ai/suggest-reply/{}", message_id)).headers(self.auth.auth_header());
        let result = self.api.fetch::<SuggestionsResponse>(request, FETCH_FAILED).await;

        if !self.fetches.is_current(ticket) {
            warn!(message_id, "Discarding stale suggestions response");
            return;
        }

        let mut state = self.state.write();
        match result {
            Ok(response) => {
                state.suggestions = response.suggestions.unwrap_or_default();
                state.status = FetchStatus::Ready;
            }
            Err(e) => {
                warn!(message_id, "Reply suggestions error: {}", e);
                state.suggestions.clear();
                state.status = FetchStatus::Failed;
                state.error = Some(e.to_string());
            }
        }
    }

    /// Drop suggestions and error, abandoning any request in flight
    pub fn clear_suggestions(&self) {
        self.fetches.invalidate();
        *self.state.write() = SuggestionsState::default();
    }

    fn fail_locally(&self, message_id: Option<MessageId>, message: &str) {
        self.fetches.invalidate();
        *self.state.write() = SuggestionsState {
            message_id,
            suggestions: Vec::new(),
            status: FetchStatus::Failed,
            error: Some(message.to_string()),
        };
    }
}
