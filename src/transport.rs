//! Transport capability consumed by [`QuerySession`](crate::QuerySession).
//!
//! A transport is event driven: `connect`, `submit` and `close` only start
//! work, and results come back later as [`TransportEvent`]s on the
//! [`EventSink`] the transport was created with. Events may arrive in any
//! order and may repeat; the session reconciles them.

use tokio::sync::mpsc;

use crate::{ConnectionConfig, Row};

/// Everything a transport can report to its session.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    /// Handshake succeeded.
    Connected,
    /// Handshake failed.
    ConnectFailed(String),
    /// Connection-level fault raised outside the handshake.
    Fault(String),
    /// One result row.
    Row(Row),
    /// A single row could not be produced.
    RowError(String),
    /// The submitted request finished, with an error message on failure.
    RequestCompleted(Option<String>),
    /// The connection is fully closed.
    Drained,
}

/// Sending half handed to a transport. Sends after the session is gone are
/// dropped silently.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, event: TransportEvent) {
        let _ = self.tx.send(event);
    }

    pub fn connected(&self) {
        self.send(TransportEvent::Connected);
    }

    pub fn connect_failed(&self, message: impl Into<String>) {
        self.send(TransportEvent::ConnectFailed(message.into()));
    }

    pub fn fault(&self, message: impl Into<String>) {
        self.send(TransportEvent::Fault(message.into()));
    }

    pub fn row(&self, row: Row) {
        self.send(TransportEvent::Row(row));
    }

    pub fn row_error(&self, message: impl Into<String>) {
        self.send(TransportEvent::RowError(message.into()));
    }

    pub fn request_completed(&self, result: Result<(), String>) {
        self.send(TransportEvent::RequestCompleted(result.err()));
    }

    pub fn drained(&self) {
        self.send(TransportEvent::Drained);
    }
}

/// One physical connection to a tabular server.
pub trait Transport: Send {
    /// Starts the handshake. The result arrives as
    /// [`TransportEvent::Connected`] or [`TransportEvent::ConnectFailed`].
    fn connect(&mut self);

    /// Submits the query. Rows and completion arrive as events; an `Err`
    /// means the submission was rejected synchronously.
    fn submit(&mut self, query: &str) -> Result<(), String>;

    /// Starts closing the connection. Completion arrives as
    /// [`TransportEvent::Drained`].
    fn close(&mut self);
}

/// Creates transports, one per session.
pub trait Connector: Send + Sync {
    type Transport: Transport;

    /// Builds an unconnected transport. An `Err` is reported as a
    /// connection error.
    fn create(
        &self,
        config: &ConnectionConfig,
        events: EventSink,
    ) -> Result<Self::Transport, String>;
}

impl<C: Connector + ?Sized> Connector for std::sync::Arc<C> {
    type Transport = C::Transport;

    fn create(
        &self,
        config: &ConnectionConfig,
        events: EventSink,
    ) -> Result<Self::Transport, String> {
        (**self).create(config, events)
    }
}
