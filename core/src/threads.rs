//! Thread store
//!
//! Caches the thread list of one account and the messages of the selected
//! thread. Switching accounts always drops the previous account's threads
//! before anything new is requested.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::models::{AccountId, Message, Thread, ThreadId};
use crate::session::AuthStore;
use crate::status::{FetchStatus, RequestSequence};
use crate::transport::{path_segment, ApiRequest};

const THREADS_NOT_AUTHENTICATED: &str = "User not authenticated to fetch threads.";
const MESSAGES_NOT_AUTHENTICATED: &str = "User not authenticated to fetch messages.";
const THREADS_FAILED: &str = "Failed to fetch threads";

/// Thread store state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadsState {
    /// Account the thread list belongs to
    pub account_id: Option<AccountId>,
    pub threads: Vec<Thread>,
    /// Selected thread; on a failed message fetch it still names the thread
    /// that failed
    pub active_thread_id: Option<ThreadId>,
    pub active_thread_messages: Vec<Message>,
    pub threads_status: FetchStatus,
    pub messages_status: FetchStatus,
    /// Last user-facing error, shared by both fetches
    pub error: Option<String>,
}

/// Thread store
pub struct ThreadStore {
    api: ApiClient,
    auth: Arc<AuthStore>,
    state: RwLock<ThreadsState>,
    thread_fetches: RequestSequence,
    message_fetches: RequestSequence,
}

impl ThreadStore {
    pub fn new(api: ApiClient, auth: Arc<AuthStore>) -> Self {
        Self {
            api,
            auth,
            state: RwLock::new(ThreadsState::default()),
            thread_fetches: RequestSequence::new(),
            message_fetches: RequestSequence::new(),
        }
    }

    pub fn snapshot(&self) -> ThreadsState {
        self.state.read().clone()
    }

    pub fn threads(&self) -> Vec<Thread> {
        self.state.read().threads.clone()
    }

    pub fn active_thread_id(&self) -> Option<ThreadId> {
        self.state.read().active_thread_id.clone()
    }

    pub fn active_thread_messages(&self) -> Vec<Message> {
        self.state.read().active_thread_messages.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    pub fn is_loading_threads(&self) -> bool {
        self.state.read().threads_status.is_loading()
    }

    pub fn is_loading_messages(&self) -> bool {
        self.state.read().messages_status.is_loading()
    }

    pub fn thread_by_id(&self, id: &ThreadId) -> Option<Thread> {
        self.state.read().threads.iter().find(|thread| &thread.id == id).cloned()
    }

    /// Summary of the active thread, if it is in the current list
    pub fn active_thread(&self) -> Option<Thread> {
        let state = self.state.read();
        let id = state.active_thread_id.as_ref()?;
        state.threads.iter().find(|thread| &thread.id == id).cloned()
    }

    /// Load the threads of `account_id`
    ///
    /// `None` means nothing is selected: the store is emptied without an
    /// error. Failures are recorded on the store, not returned.
    pub async fn fetch_threads(&self, account_id: Option<AccountId>) {
        let Some(account_id) = account_id else {
            self.thread_fetches.invalidate();
            self.message_fetches.invalidate();
            *self.state.write() = ThreadsState::default();
            return;
        };

        if !self.auth.is_authenticated() {
            self.thread_fetches.invalidate();
            self.message_fetches.invalidate();
            *self.state.write() = ThreadsState {
                account_id: Some(account_id),
                threads_status: FetchStatus::Failed,
                error: Some(THREADS_NOT_AUTHENTICATED.to_string()),
                ..Default::default()
            };
            return;
        }

        let ticket = self.thread_fetches.begin();
        self.message_fetches.invalidate();
        *self.state.write() = ThreadsState {
            account_id: Some(account_id),
            threads_status: FetchStatus::Loading,
            ..Default::default()
        };

        debug!(account_id, "Fetching threads");
        let request = ApiRequest::get("/threads/")
            .query("account_id", account_id)
            .headers(self.auth.auth_header());
        let result = self.api.fetch::<Vec<Thread>>(request, THREADS_FAILED).await;

        if !self.thread_fetches.is_current(ticket) {
            warn!(account_id, "Discarding stale thread list response");
            return;
        }

        let mut state = self.state.write();
        match result {
            Ok(threads) => {
                debug!(account_id, "Fetched {} threads", threads.len());
                state.threads = threads;
                state.threads_status = FetchStatus::Ready;
            }
            Err(e) => {
                warn!(account_id, "Fetch threads error: {}", e);
                state.threads.clear();
                state.threads_status = FetchStatus::Failed;
                state.error = Some(e.to_string());
            }
        }
    }

    /// Load the messages of `thread_id` and make it the active thread
    ///
    /// The active thread id only changes on success. Failures are recorded
    /// on the store, not returned.
    pub async fn fetch_messages_for_thread(&self, thread_id: Option<ThreadId>) {
        if !self.auth.is_authenticated() {
            self.message_fetches.invalidate();
            let mut state = self.state.write();
            state.active_thread_messages.clear();
            state.messages_status = FetchStatus::Failed;
            state.error = Some(MESSAGES_NOT_AUTHENTICATED.to_string());
            return;
        }

        let Some(thread_id) = thread_id else {
            self.clear_active_thread();
            return;
        };

        let ticket = self.message_fetches.begin();
        {
            let mut state = self.state.write();
            state.messages_status = FetchStatus::Loading;
            state.error = None;
        }

        debug!(thread_id = %thread_id, "Fetching messages");
        let path = format!("/threads/{}/messages", path_segment(thread_id.as_str()));
        let request = ApiRequest::get(path).headers(self.auth.auth_header());
        let fallback = format!("Failed to fetch messages for thread {}", thread_id);
        let result = self.api.fetch::<Vec<Message>>(request, &fallback).await;

        if !self.message_fetches.is_current(ticket) {
            warn!(thread_id = %thread_id, "Discarding stale message response");
            return;
        }

        let mut state = self.state.write();
        match result {
            Ok(messages) => {
                state.active_thread_id = Some(thread_id);
                state.active_thread_messages = messages;
                state.messages_status = FetchStatus::Ready;
            }
            Err(e) => {
                warn!(thread_id = %thread_id, "Fetch messages error: {}", e);
                state.active_thread_messages.clear();
                state.messages_status = FetchStatus::Failed;
                state.error = Some(e.to_string());
            }
        }
    }

    /// Deselect the active thread
    pub fn clear_active_thread(&self) {
        self.message_fetches.invalidate();
        let mut state = self.state.write();
        state.active_thread_id = None;
        state.active_thread_messages.clear();
        state.messages_status = FetchStatus::Idle;
    }

    /// Refetch threads every time the active account changes
    ///
    /// Fetches once for the current value, then once per observed change.
    /// The task ends when the sender is dropped.
    pub fn follow_active_account(self: Arc<Self>, mut active: watch::Receiver<Option<AccountId>>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let account_id = *active.borrow_and_update();
                info!("Loading threads for account {:?}", account_id);
                self.fetch_threads(account_id).await;
                if active.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
