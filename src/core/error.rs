//! Typed error handling for the storefront client
//!
//! Every failure a caller can observe is one of a small set of categories so
//! that views can decide how to react without inspecting messages:
//!
//! - [`NetworkError`]: no response, or a non-2xx status
//! - [`ParseError`]: the payload did not match the expected schema
//! - [`AuthError`]: the session is missing or could not be refreshed
//! - [`ConfigError`]: invalid configuration
//!
//! # Example
//!
//! ```rust,ignore
//! match shop.error() {
//!     Some(err) if err.is_transient() => show_retry_banner(),
//!     Some(StorefrontError::Auth(_)) => go_to_login(),
//!     _ => {}
//! }
//! ```

use reqwest::StatusCode;
use thiserror::Error;

/// Convenience alias used across the crate
pub type Result<T, E = StorefrontError> = std::result::Result<T, E>;

/// The main error type of the storefront client
///
/// Errors are `Clone` so a failed request can be kept in a view model next to
/// the products that were already rendered.
#[derive(Debug, Clone, Error)]
pub enum StorefrontError {
    /// Transport failures and non-2xx responses
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Unexpected payload shapes
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Authentication failures after the refresh path was exhausted
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StorefrontError {
    /// Stable error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            StorefrontError::Network(e) => e.error_code(),
            StorefrontError::Parse(_) => "PARSE_ERROR",
            StorefrontError::Auth(e) => e.error_code(),
            StorefrontError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Whether retrying the same request may succeed
    ///
    /// Only network failures qualify: parse and auth errors repeat
    /// deterministically.
    pub fn is_transient(&self) -> bool {
        match self {
            StorefrontError::Network(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Whether the session has to be re-established by the user
    pub fn requires_login(&self) -> bool {
        matches!(self, StorefrontError::Auth(_))
    }
}

// =============================================================================
// Network Errors
// =============================================================================

/// No response, or a response with a non-success status
#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    /// The request never produced a response (connect, timeout, DNS...)
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The backend answered with a non-2xx status
    #[error("request to {url} returned {status}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
}

impl NetworkError {
    pub fn error_code(&self) -> &'static str {
        match self {
            NetworkError::Transport { .. } => "NETWORK_UNREACHABLE",
            NetworkError::Status { status, .. } if status.is_server_error() => "SERVER_ERROR",
            NetworkError::Status { .. } => "REQUEST_REJECTED",
        }
    }

    /// Transport failures, 5xx and 429 are worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            NetworkError::Transport { .. } => true,
            NetworkError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
        }
    }

    /// Status code of the response, if one was received
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            NetworkError::Transport { .. } => None,
            NetworkError::Status { status, .. } => Some(*status),
        }
    }

    pub(crate) fn transport(url: impl Into<String>, err: &reqwest::Error) -> Self {
        NetworkError::Transport {
            url: url.into(),
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Parse Errors
// =============================================================================

/// The backend answered, but not with the shape this client expects
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    /// Body did not deserialize into the expected schema
    #[error("unexpected payload from {url}: {message}")]
    Payload { url: String, message: String },

    /// The `next` link of a page could not be turned into a cursor
    #[error("invalid page cursor '{value}': {message}")]
    Cursor { value: String, message: String },
}

// =============================================================================
// Auth Errors
// =============================================================================

/// Authentication failures; never retried
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The backend rejected the request and no refresh was possible
    #[error("request was not authorized: {message}")]
    Unauthorized { message: String },

    /// The refresh token was rejected; credentials have been cleared
    #[error("session expired: token refresh failed ({message})")]
    RefreshFailed { message: String },

    /// The operation needs a logged in user
    #[error("no active session")]
    NotLoggedIn,

    /// Login was rejected
    #[error("invalid credentials")]
    InvalidCredentials,
}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Unauthorized { .. } => "UNAUTHORIZED",
            AuthError::RefreshFailed { .. } => "SESSION_EXPIRED",
            AuthError::NotLoggedIn => "NOT_LOGGED_IN",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
        }
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A field has an unusable value
    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// The configuration source could not be read or parsed
    #[error("failed to load configuration: {message}")]
    Load { message: String },
}
