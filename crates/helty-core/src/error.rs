//! Error types for helty-core.
//!
//! Every failure at the client boundary falls into one of two kinds:
//!
//! | Kind | Meaning | Caller's usual reaction |
//! |------|---------|-------------------------|
//! | [`Error::Auth`] | Credentials rejected, unknown user, unsupported challenge, or no way to renew the token | Ask the user to sign in again |
//! | [`Error::Connection`] | Transport failure, non-2xx response, repeated unauthorized response, malformed payload | Treat data as temporarily unavailable and try again later |
//!
//! The client itself never retries beyond the single unauthorized retry in the
//! request path; backoff policy belongs to the caller.
//!
//! ```ignore
//! match client.read_sensors(&board, &serial).await {
//!     Ok(reading) => publish(reading),
//!     Err(e) if e.is_auth() => start_reauth_flow(),
//!     Err(e) => tracing::warn!("data unavailable: {}", e),
//! }
//! ```

use thiserror::Error;

/// Errors that can occur when talking to the identity provider or the cloud API.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// Authentication failed and cannot be recovered automatically.
    #[error("Authentication failed: {0}")]
    Auth(AuthFailureReason),

    /// The provider or the cloud API could not be reached or answered badly.
    #[error("Connection error: {0}")]
    Connection(ConnectionFailureReason),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Structured reasons for authentication failures.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthFailureReason {
    /// The provider rejected the email/password or the refresh token.
    InvalidCredentials,
    /// The account does not exist.
    UserNotFound,
    /// The provider asked for an interactive challenge (MFA, new password...).
    ChallengeRequired { challenge: String },
    /// The token expired and no credentials are stored to log in again.
    NoCredentials,
    /// A refresh was requested but the session holds no refresh token.
    NoRefreshToken,
}

impl std::fmt::Display for AuthFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid email or password"),
            Self::UserNotFound => write!(f, "user not found"),
            Self::ChallengeRequired { challenge } => {
                write!(f, "authentication challenge required: {}", challenge)
            }
            Self::NoCredentials => write!(f, "token expired and no credentials available"),
            Self::NoRefreshToken => write!(f, "no refresh token available"),
        }
    }
}

/// Structured reasons for connection failures.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionFailureReason {
    /// The request never produced an HTTP response (DNS, refused, timeout...).
    Transport(String),
    /// The API answered 401 again after the token had been renewed.
    Unauthorized { body: String },
    /// The API answered with a non-2xx status.
    Status { status: u16, body: String },
    /// The identity provider reported an error that is not an auth failure.
    Provider { error_type: String, message: String },
    /// The response body could not be decoded.
    MalformedResponse(String),
}

impl std::fmt::Display for ConnectionFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "request failed: {}", msg),
            Self::Unauthorized { body } => write!(f, "unauthorized after token renewal: {}", body),
            Self::Status { status, body } => write!(f, "HTTP {}: {}", status, body),
            Self::Provider {
                error_type,
                message,
            } => write!(f, "identity provider error: {} - {}", error_type, message),
            Self::MalformedResponse(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

impl Error {
    /// Create a transport failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Connection(ConnectionFailureReason::Transport(message.into()))
    }

    /// Create a malformed response failure.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Connection(ConnectionFailureReason::MalformedResponse(message.into()))
    }

    /// Create a non-2xx status failure.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Connection(ConnectionFailureReason::Status {
            status,
            body: body.into(),
        })
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// True for authentication failures.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// True for connection failures.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// True when the API kept answering 401 after a renewal.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Connection(ConnectionFailureReason::Unauthorized { .. })
        )
    }

    /// Whether a later attempt may succeed without user intervention.
    pub fn is_transient(&self) -> bool {
        self.is_connection()
    }
}

/// Result type alias using helty-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
