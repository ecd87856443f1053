//! `tabular-session` runs one query against a bearer-authenticated tabular
//! data server and reduces everything the transport reports to exactly one
//! [`Outcome`].
//!
//! - [`QuerySession::run`] drives a single connection/query lifecycle.
//! - [`Transport`] / [`Connector`] describe the event-driven connection it
//!   runs over; [`HttpConnector`] is the bundled REST implementation.
//! - With the `server` feature, [`server::router`] exposes sessions over
//!   HTTP.

mod decode;
mod endpoint;
mod error;
mod http_transport;
mod outcome;
mod row;
mod session;
pub mod transport;
mod value;
mod wire;

pub mod auth;
#[cfg(feature = "server")]
pub mod config;
#[cfg(feature = "server")]
pub mod server;

pub use endpoint::{ConnectionConfig, Credential, EndpointDescriptor};
pub use error::{FailureKind, SessionError};
pub use http_transport::{HttpConnector, HttpTransport};
pub use outcome::Outcome;
pub use row::Row;
pub use session::QuerySession;
pub use transport::{Connector, EventSink, Transport, TransportEvent};
pub use value::Value;

pub type Result<T> = std::result::Result<T, SessionError>;
