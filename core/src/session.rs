//! Auth session store
//!
//! Owns the bearer token and the signed-in user. Every other store reads
//! [`AuthStore::is_authenticated`] and [`AuthStore::auth_header`] but never
//! mutates the session.

use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::ApiClient;
use crate::error::CourierResult;
use crate::models::{Credentials, RegisteredUser, TokenResponse, User};
use crate::navigation::{Navigator, Notifier, Route};
use crate::storage::{forget, persist, KeyValueStore};
use crate::transport::ApiRequest;
use crate::{TOKEN_KEY, USER_KEY};

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";
const REGISTRATION_NOTICE: &str = "Registration successful! Please login.";

/// Session snapshot; authenticated exactly when `token` is set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<User>,
}

/// Auth session store
pub struct AuthStore {
    api: ApiClient,
    storage: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    state: RwLock<Session>,
}

impl AuthStore {
    /// Create the store, restoring any persisted session
    pub fn new(
        api: ApiClient,
        storage: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let token = storage.get(TOKEN_KEY).filter(|token| !token.is_empty());
        let user = storage.get(USER_KEY).and_then(|raw| match serde_json::from_str::<User>(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Ignoring unreadable persisted user: {}", e);
                None
            }
        });

        Self {
            api,
            storage,
            navigator,
            notifier,
            state: RwLock::new(Session { token, user }),
        }
    }

    pub fn session(&self) -> Session {
        self.state.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().token.is_some()
    }

    /// `Authorization: Bearer <token>`, or an empty map when signed out
    pub fn auth_header(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.state.read().token.as_deref() {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("Stored token is not a valid header value"),
            }
        }
        headers
    }

    /// Exchange credentials for a token and open the home view
    pub async fn login(&self, email: &str, password: &str) -> CourierResult<()> {
        let request = ApiRequest::post("/auth/token/").form([("username", email), ("password", password)]);

        let token = match self.api.fetch::<TokenResponse>(request, LOGIN_FAILED).await {
            Ok(response) => response.access_token,
            Err(e) => {
                error!("Login error: {}", e);
                self.clear_session();
                return Err(e);
            }
        };

        let user = User {
            email: email.to_string(),
        };
        persist(self.storage.as_ref(), TOKEN_KEY, &token);
        match serde_json::to_string(&user) {
            Ok(raw) => persist(self.storage.as_ref(), USER_KEY, &raw),
            Err(e) => warn!("Failed to encode user: {}", e),
        }
        *self.state.write() = Session {
            token: Some(token),
            user: Some(user),
        };

        info!("Logged in as {}", email);
        self.navigator.navigate(Route::Home);
        Ok(())
    }

    /// Create a user; the caller still has to log in
    pub async fn register(&self, email: &str, password: &str) -> CourierResult<()> {
        let request = ApiRequest::post("/auth/users/").json(&Credentials { email, password })?;

        match self.api.fetch::<RegisteredUser>(request, REGISTRATION_FAILED).await {
            Ok(created) => {
                info!("Registered user {}", created.email.as_deref().unwrap_or(email));
                self.notifier.notify(REGISTRATION_NOTICE);
                self.navigator.navigate(Route::Login);
                Ok(())
            }
            Err(e) => {
                error!("Registration error: {}", e);
                Err(e)
            }
        }
    }

    /// Drop the session and return to the login view
    pub fn logout(&self) {
        self.clear_session();
        info!("Logged out");
        self.navigator.navigate(Route::Login);
    }

    fn clear_session(&self) {
        *self.state.write() = Session::default();
        forget(self.storage.as_ref(), TOKEN_KEY);
        forget(self.storage.as_ref(), USER_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::{MockNavigator, MockNotifier};
    use crate::storage::MemoryStore;
    use crate::transport::{ApiResponse, MockTransport, Method, RequestBody};
    use mockall::predicate::eq;
    use serde_json::json;

    struct Fixture {
        transport: MockTransport,
        navigator: MockNavigator,
        notifier: MockNotifier,
        storage: Arc<MemoryStore>,
    }

    impl Fixture {
        fn new(storage: MemoryStore) -> Self {
            Self {
                transport: MockTransport::new(),
                navigator: MockNavigator::new(),
                notifier: MockNotifier::new(),
                storage: Arc::new(storage),
            }
        }

        fn build(self) -> (AuthStore, Arc<MemoryStore>) {
            let store = AuthStore::new(
                ApiClient::new(Arc::new(self.transport)),
                self.storage.clone(),
                Arc::new(self.navigator),
                Arc::new(self.notifier),
            );
            (store, self.storage)
        }
    }

    #[test]
    fn test_restores_persisted_session() {
        let fixture = Fixture::new(MemoryStore::with_entries([
            (TOKEN_KEY, "abc"),
            (USER_KEY, r#"{"email":"me@example.com"}"#),
        ]));
        let (store, _) = fixture.build();

        assert!(store.is_authenticated());
        assert_eq!(store.user().unwrap().email, "me@example.com");
        assert_eq!(store.auth_header().get(AUTHORIZATION).unwrap(), "Bearer abc");
    }

    #[test]
    fn test_unreadable_user_is_ignored() {
        let fixture = Fixture::new(MemoryStore::with_entries([(TOKEN_KEY, "abc"), (USER_KEY, "{oops")]));
        let (store, _) = fixture.build();
        assert!(store.is_authenticated());
        assert_eq!(store.user(), None);
    }

    #[test]
    fn test_signed_out_header_is_empty() {
        let (store, _) = Fixture::new(MemoryStore::new()).build();
        assert!(!store.is_authenticated());
        assert!(store.auth_header().is_empty());
    }

    #[tokio::test]
    async fn test_login_success_persists_and_navigates_home() {
        let mut fixture = Fixture::new(MemoryStore::new());
        fixture
            .transport
            .expect_send()
            .withf(|request| {
                request.method == Method::Post
                    && request.path == "/auth/token/"
                    && request.body
                        == RequestBody::Form(vec![
                            ("username".to_string(), "me@example.com".to_string()),
                            ("password".to_string(), "secret".to_string()),
                        ])
            })
            .times(1)
            .returning(|_| Ok(ApiResponse::json_body(200, &json!({ "access_token": "tok-1", "token_type": "bearer" }))));
        fixture.navigator.expect_navigate().with(eq(Route::Home)).times(1).return_const(());
        let (store, storage) = fixture.build();

        store.login("me@example.com", "secret").await.unwrap();

        assert!(store.is_authenticated());
        assert_eq!(store.token().as_deref(), Some("tok-1"));
        assert_eq!(store.user().unwrap().email, "me@example.com");
        assert_eq!(storage.get(TOKEN_KEY).as_deref(), Some("tok-1"));
        assert_eq!(storage.get(USER_KEY).as_deref(), Some(r#"{"email":"me@example.com"}"#));
    }

    #[tokio::test]
    async fn test_login_failure_surfaces_detail_and_clears_session() {
        let mut fixture = Fixture::new(MemoryStore::with_entries([(TOKEN_KEY, "old")]));
        fixture
            .transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(ApiResponse::json_body(401, &json!({ "detail": "Incorrect email or password" }))));
        fixture.navigator.expect_navigate().never();
        let (store, storage) = fixture.build();

        let err = store.login("me@example.com", "wrong").await.unwrap_err();

        assert_eq!(err.to_string(), "Incorrect email or password");
        assert!(!store.is_authenticated());
        assert_eq!(storage.get(TOKEN_KEY), None);
    }

    #[tokio::test]
    async fn test_login_failure_without_detail_uses_generic_message() {
        let mut fixture = Fixture::new(MemoryStore::new());
        fixture
            .transport
            .expect_send()
            .returning(|_| Ok(ApiResponse::new(500, "Internal Server Error")));
        let (store, _) = fixture.build();

        let err = store.login("me@example.com", "pw").await.unwrap_err();
        assert_eq!(err.to_string(), "Login failed");
    }

    #[tokio::test]
    async fn test_register_notifies_and_navigates_to_login() {
        let mut fixture = Fixture::new(MemoryStore::new());
        fixture
            .transport
            .expect_send()
            .withf(|request| {
                request.path == "/auth/users/"
                    && request.body == RequestBody::Json(json!({ "email": "new@example.com", "password": "pw" }))
            })
            .times(1)
            .returning(|_| Ok(ApiResponse::json_body(201, &json!({ "id": 9, "email": "new@example.com" }))));
        fixture
            .notifier
            .expect_notify()
            .withf(|message| message == REGISTRATION_NOTICE)
            .times(1)
            .return_const(());
        fixture.navigator.expect_navigate().with(eq(Route::Login)).times(1).return_const(());
        let (store, _) = fixture.build();

        store.register("new@example.com", "pw").await.unwrap();
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_register_failure_is_rethrown() {
        let mut fixture = Fixture::new(MemoryStore::new());
        fixture
            .transport
            .expect_send()
            .returning(|_| Ok(ApiResponse::json_body(400, &json!({ "detail": "Email already registered" }))));
        fixture.notifier.expect_notify().never();
        fixture.navigator.expect_navigate().never();
        let (store, _) = fixture.build();

        let err = store.register("dup@example.com", "pw").await.unwrap_err();
        assert_eq!(err.to_string(), "Email already registered");
    }

    #[test]
    fn test_logout_clears_everything() {
        let mut fixture = Fixture::new(MemoryStore::with_entries([
            (TOKEN_KEY, "abc"),
            (USER_KEY, r#"{"email":"me@example.com"}"#),
        ]));
        fixture.navigator.expect_navigate().with(eq(Route::Login)).times(1).return_const(());
        let (store, storage) = fixture.build();

        store.logout();

        assert_eq!(store.session(), Session::default());
        assert_eq!(storage.get(TOKEN_KEY), None);
        assert_eq!(storage.get(USER_KEY), None);
    }
}
