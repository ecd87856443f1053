use std::fmt;
use std::time::Duration;

use crate::{Result, SessionError};

/// Resolved connection target for one session.
///
/// The descriptor is built once per request from configuration and is never
/// mutated by the session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EndpointDescriptor {
    /// Server host, optionally with a `:port` suffix. No scheme.
    pub host: String,
    /// Database (dataset) name on the server.
    pub database: String,
    /// Whether the connection must be encrypted.
    pub encrypt: bool,
    /// Handshake timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Query timeout in milliseconds, measured from submission.
    pub request_timeout_ms: u64,
}

impl EndpointDescriptor {
    pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

    pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            database: database.into(),
            encrypt: true,
            connect_timeout_ms: Self::DEFAULT_TIMEOUT_MS,
            request_timeout_ms: Self::DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_encrypt(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    pub fn with_timeouts(mut self, connect_timeout_ms: u64, request_timeout_ms: u64) -> Self {
        self.connect_timeout_ms = connect_timeout_ms;
        self.request_timeout_ms = request_timeout_ms;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Checks that every field is present and well formed.
    pub fn validate(&self) -> Result<()> {
        let host = self.host.as_str();
        if host.trim().is_empty() {
            return Err(configuration("endpoint host is empty"));
        }
        if host.contains("://") {
            return Err(configuration(format!(
                "endpoint host '{host}' must not include a scheme"
            )));
        }
        if !host
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_' | ':' | '[' | ']'))
        {
            return Err(configuration(format!(
                "endpoint host '{host}' contains invalid characters"
            )));
        }

        let database = self.database.as_str();
        if database.trim().is_empty() {
            return Err(configuration("endpoint database is empty"));
        }
        if database
            .chars()
            .any(|ch| ch.is_whitespace() || ch.is_control() || matches!(ch, '/' | '?' | '#'))
        {
            return Err(configuration(format!(
                "endpoint database '{database}' contains invalid characters"
            )));
        }

        if self.connect_timeout_ms == 0 {
            return Err(configuration("connect timeout must be greater than zero"));
        }
        if self.request_timeout_ms == 0 {
            return Err(configuration("request timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// Bearer token supplied with a single request.
#[derive(Clone, Eq, PartialEq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value, without any `Bearer ` prefix.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn validate(&self) -> Result<()> {
        if self.0.trim().is_empty() {
            return Err(configuration("credential is empty"));
        }
        if self.0.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
            return Err(configuration("credential contains whitespace"));
        }
        Ok(())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Everything a transport needs to open one connection.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    pub endpoint: EndpointDescriptor,
    pub access_token: Credential,
}

fn configuration(message: impl Into<String>) -> SessionError {
    SessionError::Configuration(message.into())
}
