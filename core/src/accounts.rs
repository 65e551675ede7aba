//! Email accounts store
//!
//! Caches the mailbox accounts of the signed-in user and tracks which one is
//! active. The active id is persisted and published on a watch channel so
//! dependents (the thread store) can follow it.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::ApiClient;
use crate::error::{CourierError, CourierResult};
use crate::models::{Account, AccountId, NewAccount};
use crate::session::AuthStore;
use crate::status::{FetchStatus, RequestSequence};
use crate::storage::{forget, persist, KeyValueStore};
use crate::transport::ApiRequest;
use crate::ACTIVE_ACCOUNT_KEY;

const NOT_AUTHENTICATED: &str = "User not authenticated.";
const FETCH_FAILED: &str = "Failed to fetch accounts";
const ADD_FAILED: &str = "Failed to add account";

/// Accounts store state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountsState {
    /// Accounts from the last successful fetch
    pub accounts: Vec<Account>,
    /// Selected account; refers to an element of `accounts` after a fetch
    pub active_account_id: Option<AccountId>,
    /// Progress of `fetch_accounts`
    pub status: FetchStatus,
    /// An `add_account` call is in flight
    pub adding: bool,
    /// Last user-facing error
    pub error: Option<String>,
}

/// Email accounts store
pub struct AccountsStore {
    api: ApiClient,
    auth: Arc<AuthStore>,
    storage: Arc<dyn KeyValueStore>,
    state: RwLock<AccountsState>,
    active_tx: watch::Sender<Option<AccountId>>,
    fetches: RequestSequence,
}

fn restore_active_id(storage: &dyn KeyValueStore) -> Option<AccountId> {
    let raw = storage.get(ACTIVE_ACCOUNT_KEY)?;
    match raw.trim().parse::<AccountId>() {
        Ok(id) => Some(id),
        Err(_) => {
            warn!("Ignoring unreadable persisted active account id '{}'", raw);
            None
        }
    }
}

impl AccountsStore {
    /// Create the store, restoring the persisted active account id
    ///
    /// Nothing is fetched here; see [`crate::Services::initialize`].
    pub fn new(api: ApiClient, auth: Arc<AuthStore>, storage: Arc<dyn KeyValueStore>) -> Self {
        let active_account_id = restore_active_id(storage.as_ref());
        let (active_tx, _) = watch::channel(active_account_id);

        Self {
            api,
            auth,
            storage,
            state: RwLock::new(AccountsState {
                active_account_id,
                ..Default::default()
            }),
            active_tx,
            fetches: RequestSequence::new(),
        }
    }

    pub fn snapshot(&self) -> AccountsState {
        self.state.read().clone()
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.state.read().accounts.clone()
    }

    pub fn active_account_id(&self) -> Option<AccountId> {
        self.state.read().active_account_id
    }

    /// Full record of the active account
    pub fn active_account(&self) -> Option<Account> {
        let state = self.state.read();
        let id = state.active_account_id?;
        state.accounts.iter().find(|account| account.id == id).cloned()
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    pub fn status(&self) -> FetchStatus {
        self.state.read().status
    }

    pub fn is_loading(&self) -> bool {
        let state = self.state.read();
        state.status.is_loading() || state.adding
    }

    /// Observe changes of the active account id
    pub fn subscribe_active_account(&self) -> watch::Receiver<Option<AccountId>> {
        self.active_tx.subscribe()
    }

    /// Select the active account
    ///
    /// No-op when unchanged. Persists the id (or clears it for `None`) and
    /// notifies subscribers; it does not fetch anything itself.
    pub fn set_active_account_id(&self, account_id: Option<AccountId>) {
        {
            let mut state = self.state.write();
            if state.active_account_id == account_id {
                return;
            }
            state.active_account_id = account_id;
        }

        match account_id {
            Some(id) => persist(self.storage.as_ref(), ACTIVE_ACCOUNT_KEY, &id.to_string()),
            None => forget(self.storage.as_ref(), ACTIVE_ACCOUNT_KEY),
        }
        self.active_tx.send_replace(account_id);
        info!("Active account set to {:?}", account_id);
    }

    /// Reload the account list
    ///
    /// Failures are recorded on the store, not returned.
    pub async fn fetch_accounts(&self) {
        if !self.auth.is_authenticated() {
            self.fetches.invalidate();
            {
                let mut state = self.state.write();
                state.accounts.clear();
                state.status = FetchStatus::Failed;
                state.error = Some(NOT_AUTHENTICATED.to_string());
            }
            self.set_active_account_id(None);
            return;
        }

        let ticket = self.fetches.begin();
        {
            let mut state = self.state.write();
            state.status = FetchStatus::Loading;
            state.error = None;
        }

        debug!("Fetching accounts");
        let request = ApiRequest::get("/email-accounts/").headers(self.auth.auth_header());
        let result = self.api.fetch::<Vec<Account>>(request, FETCH_FAILED).await;

        if !self.fetches.is_current(ticket) {
            warn!("Discarding stale account list response");
            return;
        }

        match result {
            Ok(accounts) => {
                let current = self.active_account_id();
                let next_active = match accounts.first() {
                    None => None,
                    Some(_) if current.is_some_and(|id| accounts.iter().any(|a| a.id == id)) => current,
                    Some(first) => Some(first.id),
                };
                debug!("Fetched {} accounts", accounts.len());
                {
                    let mut state = self.state.write();
                    state.accounts = accounts;
                    state.status = FetchStatus::Ready;
                }
                self.set_active_account_id(next_active);
            }
            Err(e) => {
                warn!("Fetch accounts error: {}", e);
                {
                    let mut state = self.state.write();
                    state.accounts.clear();
                    state.status = FetchStatus::Failed;
                    state.error = Some(e.to_string());
                }
                self.set_active_account_id(None);
            }
        }
    }

    /// Create an account, reload the list and make the new account active
    pub async fn add_account(&self, data: &NewAccount) -> CourierResult<Account> {
        if !self.auth.is_authenticated() {
            self.state.write().error = Some(NOT_AUTHENTICATED.to_string());
            return Err(CourierError::auth(NOT_AUTHENTICATED));
        }

        {
            let mut state = self.state.write();
            state.adding = true;
            state.error = None;
        }

        let result = match ApiRequest::post("/email-accounts/")
            .headers(self.auth.auth_header())
            .json(data)
        {
            Ok(request) => self.api.fetch::<Account>(request, ADD_FAILED).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(added) => {
                info!("Added account {} ({})", added.id, added.email_address);
                self.fetch_accounts().await;
                self.set_active_account_id(Some(added.id));
                self.state.write().adding = false;
                Ok(added)
            }
            Err(e) => {
                error!("Add account error: {}", e);
                let mut state = self.state.write();
                state.adding = false;
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}
