//! Configuration for the gateway binary.
//!
//! CLI arguments with environment variable fallbacks, using clap.

use std::net::SocketAddr;

use clap::Parser;

use crate::{EndpointDescriptor, Result, SessionError};

/// tabular-gateway - answers bearer-authenticated HTTP requests with the rows
/// of one fixed query
#[derive(Parser, Debug, Clone)]
#[command(name = "tabular-gateway")]
#[command(about = "HTTP gateway running a fixed query against a tabular data server")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "TABULAR_LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Tabular server host, optionally with port, without scheme
    #[arg(long, env = "TABULAR_HOST")]
    pub host: Option<String>,

    /// Database (dataset) to query
    #[arg(long, env = "TABULAR_DATABASE")]
    pub database: Option<String>,

    /// Use an encrypted connection
    #[arg(long, env = "TABULAR_ENCRYPT", default_value_t = true, action = clap::ArgAction::Set)]
    pub encrypt: bool,

    /// Handshake timeout in milliseconds
    #[arg(
        long,
        env = "TABULAR_CONNECT_TIMEOUT_MS",
        default_value_t = EndpointDescriptor::DEFAULT_TIMEOUT_MS
    )]
    pub connect_timeout_ms: u64,

    /// Query timeout in milliseconds
    #[arg(
        long,
        env = "TABULAR_REQUEST_TIMEOUT_MS",
        default_value_t = EndpointDescriptor::DEFAULT_TIMEOUT_MS
    )]
    pub request_timeout_ms: u64,

    /// Query text sent on every request
    #[arg(long, env = "TABULAR_QUERY")]
    pub query: String,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Resolves the endpoint descriptor.
    ///
    /// A missing or invalid endpoint is not fatal at startup; the server
    /// reports it on each request instead.
    pub fn endpoint(&self) -> Result<EndpointDescriptor> {
        let host = self
            .host
            .as_deref()
            .filter(|host| !host.trim().is_empty())
            .ok_or_else(|| SessionError::Configuration("TABULAR_HOST is not set".to_owned()))?;
        let database = self
            .database
            .as_deref()
            .filter(|database| !database.trim().is_empty())
            .ok_or_else(|| {
                SessionError::Configuration("TABULAR_DATABASE is not set".to_owned())
            })?;

        let endpoint = EndpointDescriptor::new(host.trim(), database.trim())
            .with_encrypt(self.encrypt)
            .with_timeouts(self.connect_timeout_ms, self.request_timeout_ms);
        endpoint.validate()?;
        Ok(endpoint)
    }

    /// Checks settings that must be right before the server starts.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.query.trim().is_empty() {
            return Err("TABULAR_QUERY must not be empty".to_owned());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Args;
    use crate::FailureKind;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("tabular-gateway").chain(args.iter().copied()))
            .expect("arguments must parse")
    }

    #[test]
    fn builds_endpoint_from_flags() {
        let args = parse(&[
            "--host",
            "api.example.com",
            "--database",
            "sales",
            "--encrypt",
            "false",
            "--connect-timeout-ms",
            "500",
            "--query",
            "EVALUATE Sales",
        ]);

        let endpoint = args.endpoint().expect("endpoint must resolve");
        assert_eq!(endpoint.host, "api.example.com");
        assert_eq!(endpoint.database, "sales");
        assert!(!endpoint.encrypt);
        assert_eq!(endpoint.connect_timeout_ms, 500);
        assert_eq!(endpoint.request_timeout_ms, 30_000);
    }

    #[test]
    fn missing_host_is_a_configuration_error() {
        let args = parse(&["--database", "sales", "--query", "EVALUATE Sales"]);
        let err = args.endpoint().expect_err("must fail");
        assert_eq!(err.kind(), FailureKind::Configuration);
    }

    #[test]
    fn blank_query_fails_validation() {
        let args = parse(&["--query", " "]);
        assert!(args.validate().is_err());
    }
}
