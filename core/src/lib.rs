//! Courier Core Library
//!
//! This crate contains the client-side state layer for Courier Mail:
//! - Networking layer over the remote REST API (`transport`, `api`)
//! - Stores caching server data (session, accounts, threads, compose,
//!   complaints, reply suggestions)
//! - Durable key/value storage for the session
//! - Navigation guard and the service container wiring it all together

pub mod accounts;
pub mod api;
pub mod complaints;
pub mod compose;
pub mod config;
pub mod error;
pub mod models;
pub mod navigation;
pub mod services;
pub mod session;
pub mod status;
pub mod storage;
pub mod suggestions;
pub mod threads;
pub mod transport;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use accounts::AccountsStore;
pub use api::ApiClient;
pub use complaints::ComplaintsStore;
pub use compose::ComposeStore;
pub use config::Config;
pub use error::{CourierError, CourierResult, ErrorKind};
pub use models::{Account, AccountId, Complaint, ComposeRequest, Message, NewAccount, Thread, ThreadId, User};
pub use navigation::{Navigator, Notifier, Route, RouteGuard};
pub use services::Services;
pub use session::AuthStore;
pub use status::FetchStatus;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use suggestions::SuggestionsStore;
pub use threads::ThreadStore;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Courier";

/// Default configuration directory name
pub const CONFIG_DIR_NAME: &str = "courier";

/// Default configuration filename
pub const CONFIG_FILENAME: &str = "config.toml";

/// Default session filename
pub const SESSION_FILENAME: &str = "session.json";

/// Default API server
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Path prefix of every API endpoint
pub const API_BASE_PATH: &str = "/api/v1";

/// Durable storage key holding the bearer token
pub const TOKEN_KEY: &str = "token";

/// Durable storage key holding the JSON-encoded user
pub const USER_KEY: &str = "user";

/// Durable storage key holding the active account id
pub const ACTIVE_ACCOUNT_KEY: &str = "activeAccountId";

/// Get the default configuration directory
pub fn get_config_dir() -> CourierResult<std::path::PathBuf> {
    std::env::var("COURIER_CONFIG_DIR")
        .map(std::path::PathBuf::from)
        .or_else(|_| {
            directories::ProjectDirs::from("", "", CONFIG_DIR_NAME)
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or_else(|| CourierError::config("Configuration directory not found"))
        })
}

/// Get the default data directory
pub fn get_data_dir() -> CourierResult<std::path::PathBuf> {
    std::env::var("COURIER_DATA_DIR")
        .map(std::path::PathBuf::from)
        .or_else(|_| {
            directories::ProjectDirs::from("", "", CONFIG_DIR_NAME)
                .map(|dirs| dirs.data_dir().to_path_buf())
                .ok_or_else(|| CourierError::config("Data directory not found"))
        })
}
