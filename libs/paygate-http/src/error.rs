use crate::validation::ValidationError;
use thiserror::Error;

/// Closed set of failure kinds surfaced by the HTTP layer.
///
/// Every [`HttpError`] maps to exactly one kind through [`HttpError::kind`].
/// Collaborators branch on this rather than on message text, e.g. showing an
/// "update the app" prompt for [`ErrorKind::TransportInitialization`] or
/// [`ErrorKind::UpgradeRequired`] and a generic retry prompt for
/// [`ErrorKind::Server`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The authorization string could not be resolved into a credential.
    InvalidCredential,
    /// No acceptable TLS protocol or trust anchor is available on this host.
    TransportInitialization,
    /// HTTP 401.
    Authentication,
    /// HTTP 403.
    Authorization,
    /// HTTP 429.
    RateLimit,
    /// HTTP 426.
    UpgradeRequired,
    /// HTTP 422, with structured field errors.
    Validation,
    /// HTTP 500.
    Server,
    /// HTTP 503.
    ServiceUnavailable,
    /// Any other non-success status, or a success body the parser rejected.
    Unexpected,
    /// I/O failure during the exchange (timeout, refused, TLS handshake).
    Transport,
    /// The request itself is malformed (URL, scheme, header).
    InvalidRequest,
    /// Every attempt allowed by the retry policy failed.
    RetryLimitExceeded,
}

impl ErrorKind {
    /// Whether failures of this kind are usually transient.
    ///
    /// Informational only: the retry loop retries every kind the same way
    /// when the request's policy allows it.
    #[must_use]
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::Server
                | ErrorKind::ServiceUnavailable
                | ErrorKind::Transport
                | ErrorKind::RateLimit
        )
    }
}

/// Classification of URL validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUriKind {
    /// URL could not be parsed (malformed syntax)
    ParseError,
    /// URL is missing required host/authority component
    MissingAuthority,
}

/// HTTP layer error.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    /// Authorization string rejected before any request was made.
    ///
    /// The message never contains the raw credential.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// TLS configuration could not be built (protocol not supported by the
    /// crypto provider, no usable trust anchors). Not retryable.
    #[error("Secure transport unavailable: {0}")]
    TransportInitialization(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Authorization failed: {message}")]
    Authorization { message: String },

    #[error("Rate limited: {message}")]
    RateLimit { message: String },

    #[error("Upgrade required: {message}")]
    UpgradeRequired { message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Server error: {message}")]
    Server { message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Unexpected HTTP {status}: {message}")]
    Unexpected { status: u16, message: String },

    /// Transport error (network, connection, TLS handshake, timeout)
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid URL (failed to parse)
    ///
    /// Match on `kind`; `reason` is a diagnostic message for logs only.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUri {
        url: String,
        kind: InvalidUriKind,
        reason: String,
    },

    /// URL scheme rejected by the transport security mode
    #[error("URL scheme '{scheme}' not allowed: {reason}")]
    InvalidScheme { scheme: String, reason: String },

    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// Request body could not be serialized
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Retry bound exhausted. Supersedes the last attempt's error, which is
    /// kept as the source for diagnostics.
    #[error("Retry limit exceeded after {attempts} attempts")]
    RetryLimitExceeded {
        attempts: u32,
        #[source]
        last: Box<HttpError>,
    },
}

impl HttpError {
    /// The taxonomy kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            HttpError::InvalidCredential(_) => ErrorKind::InvalidCredential,
            HttpError::TransportInitialization(_) => ErrorKind::TransportInitialization,
            HttpError::Authentication { .. } => ErrorKind::Authentication,
            HttpError::Authorization { .. } => ErrorKind::Authorization,
            HttpError::RateLimit { .. } => ErrorKind::RateLimit,
            HttpError::UpgradeRequired { .. } => ErrorKind::UpgradeRequired,
            HttpError::Validation(_) => ErrorKind::Validation,
            HttpError::Server { .. } => ErrorKind::Server,
            HttpError::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            HttpError::Unexpected { .. } => ErrorKind::Unexpected,
            HttpError::Transport(_) => ErrorKind::Transport,
            HttpError::InvalidUri { .. }
            | HttpError::InvalidScheme { .. }
            | HttpError::InvalidHeaderName(_)
            | HttpError::InvalidHeaderValue(_)
            | HttpError::Json(_) => ErrorKind::InvalidRequest,
            HttpError::RetryLimitExceeded { .. } => ErrorKind::RetryLimitExceeded,
        }
    }

    /// HTTP status that produced this error, when it came from a response.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            HttpError::Authentication { .. } => Some(401),
            HttpError::Authorization { .. } => Some(403),
            HttpError::RateLimit { .. } => Some(429),
            HttpError::UpgradeRequired { .. } => Some(426),
            HttpError::Validation(v) => Some(v.status_code()),
            HttpError::Server { .. } => Some(500),
            HttpError::ServiceUnavailable { .. } => Some(503),
            HttpError::Unexpected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Field-level errors when this is a validation failure.
    #[must_use]
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            HttpError::Validation(v) => Some(v),
            _ => None,
        }
    }
}
