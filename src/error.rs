/// Category of a session failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FailureKind {
    /// Endpoint descriptor or credential missing or malformed.
    Configuration,
    /// Inbound `Authorization` header missing or not a bearer token.
    AuthHeader,
    /// Handshake failure or connection-level fault before the query ran.
    Connection,
    /// Failure during or after query submission.
    Query,
}

/// Error type returned by this crate.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// Bad or missing endpoint descriptor. Raised before any I/O.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Missing or malformed bearer header. Raised before any I/O.
    #[error("authorization header error: {0}")]
    AuthHeader(String),
    /// Handshake error, transport fault or connect timeout.
    #[error("connection error: {0}")]
    Connection(String),
    /// Query-level error, row error, request timeout or a rejected submission.
    #[error("query error: {0}")]
    Query(String),
}

impl SessionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Configuration(_) => FailureKind::Configuration,
            Self::AuthHeader(_) => FailureKind::AuthHeader,
            Self::Connection(_) => FailureKind::Connection,
            Self::Query(_) => FailureKind::Query,
        }
    }

    /// Message text without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Configuration(message)
            | Self::AuthHeader(message)
            | Self::Connection(message)
            | Self::Query(message) => message,
        }
    }

    /// HTTP status the gateway answers with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::AuthHeader(_) => 401,
            Self::Configuration(_) | Self::Connection(_) | Self::Query(_) => 500,
        }
    }
}
