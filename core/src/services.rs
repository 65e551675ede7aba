//! Service container
//!
//! Builds every store once per application instance and hands them out to
//! the front end. Nothing is fetched during construction; the bootstrap
//! calls [`Services::initialize`] explicitly.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::accounts::AccountsStore;
use crate::api::ApiClient;
use crate::complaints::ComplaintsStore;
use crate::compose::ComposeStore;
use crate::config::Config;
use crate::error::CourierResult;
use crate::navigation::{Navigator, Notifier, RouteGuard};
use crate::session::AuthStore;
use crate::storage::KeyValueStore;
use crate::suggestions::SuggestionsStore;
use crate::threads::ThreadStore;
use crate::transport::{HttpTransport, Transport};

/// All stores of one application instance
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<AuthStore>,
    pub accounts: Arc<AccountsStore>,
    pub threads: Arc<ThreadStore>,
    pub compose: Arc<ComposeStore>,
    pub complaints: Arc<ComplaintsStore>,
    pub suggestions: Arc<SuggestionsStore>,
    pub guard: RouteGuard,
}

impl Services {
    /// Wire the stores against the HTTP API described by `config`
    pub fn new(
        config: &Config,
        storage: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> CourierResult<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(Arc::new(transport), storage, navigator, notifier))
    }

    /// Wire the stores against an arbitrary transport
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let api = ApiClient::new(transport);
        let auth = Arc::new(AuthStore::new(api.clone(), storage.clone(), navigator, notifier));

        Self {
            accounts: Arc::new(AccountsStore::new(api.clone(), auth.clone(), storage)),
            threads: Arc::new(ThreadStore::new(api.clone(), auth.clone())),
            compose: Arc::new(ComposeStore::new(api.clone(), auth.clone())),
            complaints: Arc::new(ComplaintsStore::new(api.clone(), auth.clone())),
            suggestions: Arc::new(SuggestionsStore::new(api, auth.clone())),
            guard: RouteGuard::new(auth.clone()),
            auth,
        }
    }

    /// Load the account list for a restored session
    pub async fn initialize(&self) {
        if !self.auth.is_authenticated() {
            debug!("No session to initialize");
            return;
        }
        if self.accounts.accounts().is_empty() {
            info!("Loading accounts for restored session");
            self.accounts.fetch_accounts().await;
        }
    }

    /// Keep the thread list in step with the active account
    pub fn follow_active_account(&self) -> JoinHandle<()> {
        self.threads
            .clone()
            .follow_active_account(self.accounts.subscribe_active_account())
    }
}
