//! Error types for Courier Core

/// Result type alias for Courier operations
pub type CourierResult<T> = Result<T, CourierError>;

/// Coarse classification of a [`CourierError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Not authenticated; raised before any request is sent
    Auth,
    /// The server answered with a non-success status
    Http,
    /// The request never produced a response
    Network,
    /// The response body could not be decoded
    Parse,
    /// Durable key/value storage failed
    Storage,
    /// Invalid configuration
    Config,
    /// Input rejected before being sent
    Validation,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Auth => write!(f, "auth"),
            ErrorKind::Http => write!(f, "http"),
            ErrorKind::Network => write!(f, "network"),
            ErrorKind::Parse => write!(f, "parse"),
            ErrorKind::Storage => write!(f, "storage"),
            ErrorKind::Config => write!(f, "config"),
            ErrorKind::Validation => write!(f, "validation"),
        }
    }
}

/// Main error type for Courier
///
/// `Auth` and `Http` display their message verbatim: that text is what the
/// stores surface to the user.
#[derive(Debug, thiserror::Error)]
pub enum CourierError {
    /// Not authenticated
    #[error("{0}")]
    Auth(String),

    /// Non-success HTTP status, with the server-provided detail
    #[error("{message}")]
    Http {
        /// Response status code
        status: u16,
        /// Server `detail` or the operation's generic fallback
        message: String,
    },

    /// Transport failures
    #[error("Network error: {0}")]
    Network(String),

    /// Response decoding errors
    #[error("Invalid response: {0}")]
    Parse(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Durable storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl CourierError {
    /// Create a new authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a new HTTP status error
    pub fn http(status: u16, msg: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: msg.into(),
        }
    }

    /// Create a new network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Auth,
            Self::Http { .. } => ErrorKind::Http,
            Self::Network(_) => ErrorKind::Network,
            Self::Parse(_) | Self::Serialization(_) => ErrorKind::Parse,
            Self::Storage(_) | Self::Io(_) => ErrorKind::Storage,
            Self::Config(_) | Self::Toml(_) | Self::TomlSer(_) | Self::Url(_) => ErrorKind::Config,
            Self::Validation(_) => ErrorKind::Validation,
        }
    }

    /// HTTP status code, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this is a network-related error
    pub fn is_network_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network)
    }

    /// Check if this is an authentication error
    ///
    /// A 401 from the server counts as well as the local pre-flight check.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Http { status: 401, .. })
    }

    /// Check if re-triggering the same action might succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_displays_detail_verbatim() {
        let err = CourierError::http(500, "SMTP down");
        assert_eq!(err.to_string(), "SMTP down");
        assert_eq!(err.kind(), ErrorKind::Http);
        assert_eq!(err.status(), Some(500));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_auth_classification() {
        assert!(CourierError::auth("User not authenticated.").is_auth_error());
        assert!(CourierError::http(401, "Could not validate credentials").is_auth_error());
        assert!(!CourierError::http(404, "Not found").is_auth_error());
        assert_eq!(
            CourierError::auth("User not authenticated.").to_string(),
            "User not authenticated."
        );
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(CourierError::network("refused").kind(), ErrorKind::Network);
        assert!(CourierError::network("refused").is_network_error());
        assert_eq!(CourierError::parse("bad json").kind(), ErrorKind::Parse);
        assert_eq!(CourierError::storage("disk full").kind(), ErrorKind::Storage);
        assert_eq!(CourierError::validation("empty").kind(), ErrorKind::Validation);
        assert!(!CourierError::http(400, "bad").is_recoverable());
    }
}
