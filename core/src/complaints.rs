//! Complaints store
//!
//! Read-only list of complaint and suggestion records extracted by the
//! backend from incoming mail.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::models::Complaint;
use crate::session::AuthStore;
use crate::status::{FetchStatus, RequestSequence};
use crate::transport::ApiRequest;

const NOT_AUTHENTICATED: &str = "User not authenticated.";
const FETCH_FAILED: &str = "Failed to fetch complaints data";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplaintsState {
    pub complaints: Vec<Complaint>,
    pub status: FetchStatus,
    pub error: Option<String>,
}

/// Complaints store
pub struct ComplaintsStore {
    api: ApiClient,
    auth: Arc<AuthStore>,
    state: RwLock<ComplaintsState>,
    fetches: RequestSequence,
}

impl ComplaintsStore {
    pub fn new(api: ApiClient, auth: Arc<AuthStore>) -> Self {
        Self {
            api,
            auth,
            state: RwLock::new(ComplaintsState::default()),
            fetches: RequestSequence::new(),
        }
    }

    pub fn snapshot(&self) -> ComplaintsState {
        self.state.read().clone()
    }

    pub fn complaints(&self) -> Vec<Complaint> {
        self.state.read().complaints.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().status.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    /// Replace the list with the server's; failures are recorded, not returned
    pub async fn fetch_complaints(&self) {
        if !self.auth.is_authenticated() {
            self.fetches.invalidate();
            *self.state.write() = ComplaintsState {
                complaints: Vec::new(),
                status: FetchStatus::Failed,
                error: Some(NOT_AUTHENTICATED.to_string()),
            };
            return;
        }

        let ticket = self.fetches.begin();
        {
            let mut state = self.state.write();
            state.status = FetchStatus::Loading;
            state.error = None;
        }

        debug!("Fetching complaints");
        let request = ApiRequest::get("/complaints-suggestions/").headers(self.auth.auth_header());
        let result = self.api.fetch::<Vec<Complaint>>(request, FETCH_FAILED).await;

        if !self.fetches.is_current(ticket) {
            warn!("Discarding stale complaints response");
            return;
        }

        let mut state = self.state.write();
        match result {
            Ok(complaints) => {
                state.complaints = complaints;
                state.status = FetchStatus::Ready;
            }
            Err(e) => {
                warn!("Fetch complaints error: {}", e);
                state.complaints.clear();
                state.status = FetchStatus::Failed;
                state.error = Some(e.to_string());
            }
        }
    }
}
