//! Routes, the navigation guard and user-facing notices

use std::sync::Arc;
use tracing::debug;

use crate::session::AuthStore;

/// Views the front end can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Conversation view
    Home,
    Login,
    Register,
    About,
    /// Mailbox account management
    EmailAccounts,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::About => "/about",
            Route::EmailAccounts => "/email-accounts",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/" | "" => Some(Route::Home),
            "/login" => Some(Route::Login),
            "/register" => Some(Route::Register),
            "/about" => Some(Route::About),
            "/email-accounts" => Some(Route::EmailAccounts),
            _ => None,
        }
    }

    /// Whether the view needs a signed-in user
    pub fn requires_auth(&self) -> bool {
        matches!(self, Route::Home | Route::EmailAccounts)
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Performs navigation on behalf of the stores
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Shows short messages to the user
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Gates protected views on the session state
#[derive(Clone)]
pub struct RouteGuard {
    auth: Arc<AuthStore>,
}

impl RouteGuard {
    pub fn new(auth: Arc<AuthStore>) -> Self {
        Self { auth }
    }

    /// Decide where a navigation to `to` actually lands
    pub fn resolve(&self, to: Route) -> Route {
        let authenticated = self.auth.is_authenticated();
        let resolved = if to.requires_auth() && !authenticated {
            Route::Login
        } else if matches!(to, Route::Login | Route::Register) && authenticated {
            Route::Home
        } else {
            to
        };

        if resolved != to {
            debug!("Redirecting {} to {}", to, resolved);
        }
        resolved
    }
}
