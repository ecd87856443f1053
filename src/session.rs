//! The query session: one connection, one query, one [`Outcome`].
//!
//! The transport reports the connection lifecycle, the query lifecycle and
//! row delivery as independent events. The session folds them into an
//! explicit [`State`] plus two first-write-wins error witnesses, and computes
//! the outcome once, after the connection has been closed.

use std::fmt;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{timeout_at, Instant};

use crate::{
    transport::{Connector, EventSink, Transport, TransportEvent},
    ConnectionConfig, Credential, EndpointDescriptor, Outcome, Row, SessionError,
};

/// Runs single-shot queries through transports built by `C`.
#[derive(Clone)]
pub struct QuerySession<C> {
    connector: C,
}

impl<C> fmt::Debug for QuerySession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySession").finish_non_exhaustive()
    }
}

impl<C: Connector> QuerySession<C> {
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Opens a connection, runs `query` and returns the single outcome.
    ///
    /// Invalid descriptors or credentials fail with
    /// [`SessionError::Configuration`] before any transport is created. On
    /// every other path the connection close is requested before this
    /// returns.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "query_session",
            skip_all,
            fields(host = %endpoint.host, database = %endpoint.database)
        )
    )]
    pub async fn run(
        &self,
        endpoint: &EndpointDescriptor,
        credential: &Credential,
        query: &str,
    ) -> Outcome {
        if let Err(err) = endpoint.validate().and_then(|()| credential.validate()) {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %err, "rejecting session before connect");
            return Outcome::Failure(err);
        }

        let config = ConnectionConfig {
            endpoint: endpoint.clone(),
            access_token: credential.clone(),
        };
        let (sink, events) = EventSink::channel();
        let transport = match self.connector.create(&config, sink) {
            Ok(transport) => transport,
            Err(message) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %message, "transport could not be created");
                return Outcome::Failure(SessionError::Connection(message));
            }
        };

        let outcome = Driver::new(transport, events, endpoint).drive(query).await;
        log_outcome(&outcome);
        outcome
    }

    /// Callback form of [`QuerySession::run`]. `on_complete` runs exactly
    /// once with the outcome.
    pub async fn run_with_callback<F>(
        &self,
        endpoint: &EndpointDescriptor,
        credential: &Credential,
        query: &str,
        on_complete: F,
    ) where
        F: FnOnce(Outcome),
    {
        on_complete(self.run(endpoint, credential, query).await);
    }
}

#[cfg(feature = "tracing")]
fn log_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Success(rows) => tracing::debug!(rows = rows.len(), "session succeeded"),
        Outcome::Failure(err) => tracing::debug!(error = %err, "session failed"),
    }
}

#[cfg(not(feature = "tracing"))]
fn log_outcome(_outcome: &Outcome) {}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Idle,
    Connecting,
    Connected,
    Querying,
    Completing,
    ConnectFailed,
    Closed,
}

impl State {
    /// Close has been requested and the session waits for the drain.
    fn is_draining(self) -> bool {
        matches!(self, Self::Completing | Self::ConnectFailed)
    }
}

/// First connection-phase and first query-phase error of a run.
#[derive(Debug, Default)]
struct Witnesses {
    connection: Option<String>,
    query: Option<String>,
}

impl Witnesses {
    fn connection(&mut self, message: String) {
        if self.connection.is_none() {
            self.connection = Some(message);
        } else {
            #[cfg(feature = "tracing")]
            tracing::trace!(error = %message, "ignoring repeated connection error");
        }
    }

    fn query(&mut self, message: String) {
        if self.query.is_none() {
            self.query = Some(message);
        } else {
            #[cfg(feature = "tracing")]
            tracing::trace!(error = %message, "ignoring repeated query error");
        }
    }

    /// Connection error, then query error, then the rows.
    fn resolve(self, rows: Vec<Row>) -> Outcome {
        if let Some(message) = self.connection {
            Outcome::Failure(SessionError::Connection(message))
        } else if let Some(message) = self.query {
            Outcome::Failure(SessionError::Query(message))
        } else {
            Outcome::Success(rows)
        }
    }
}

/// Owns the transport and requests close exactly once, at the latest when
/// dropped.
struct ConnectionGuard<T: Transport> {
    transport: T,
    close_requested: bool,
}

impl<T: Transport> ConnectionGuard<T> {
    fn new(transport: T) -> Self {
        Self {
            transport,
            close_requested: false,
        }
    }

    fn close(&mut self) {
        if !self.close_requested {
            self.close_requested = true;
            self.transport.close();
        }
    }
}

impl<T: Transport> Drop for ConnectionGuard<T> {
    fn drop(&mut self) {
        self.close();
    }
}

struct Driver<'a, T: Transport> {
    state: State,
    witnesses: Witnesses,
    rows: Vec<Row>,
    connection: ConnectionGuard<T>,
    events: UnboundedReceiver<TransportEvent>,
    endpoint: &'a EndpointDescriptor,
    deadline: Instant,
}

impl<'a, T: Transport> Driver<'a, T> {
    fn new(
        transport: T,
        events: UnboundedReceiver<TransportEvent>,
        endpoint: &'a EndpointDescriptor,
    ) -> Self {
        Self {
            state: State::Idle,
            witnesses: Witnesses::default(),
            rows: Vec::new(),
            connection: ConnectionGuard::new(transport),
            events,
            endpoint,
            deadline: Instant::now(),
        }
    }

    async fn drive(mut self, query: &str) -> Outcome {
        self.transition(State::Connecting);
        self.deadline = Instant::now() + self.endpoint.connect_timeout();
        self.connection.transport.connect();

        while self.state != State::Closed {
            match timeout_at(self.deadline, self.events.recv()).await {
                Ok(Some(event)) => self.on_event(event, query),
                Ok(None) => self.on_events_ended(),
                Err(_) => self.on_deadline(),
            }
        }

        self.connection.close();
        let rows = std::mem::take(&mut self.rows);
        std::mem::take(&mut self.witnesses).resolve(rows)
    }

    fn on_event(&mut self, event: TransportEvent, query: &str) {
        match self.state {
            State::Connecting => self.on_connecting_event(event, query),
            State::Querying => self.on_querying_event(event),
            state if state.is_draining() => self.on_draining_event(event),
            _ => {}
        }
    }

    fn on_connecting_event(&mut self, event: TransportEvent, query: &str) {
        match event {
            TransportEvent::Connected => {
                self.transition(State::Connected);
                self.submit(query);
            }
            TransportEvent::ConnectFailed(message) | TransportEvent::Fault(message) => {
                self.witnesses.connection(message);
                self.begin_close(State::ConnectFailed);
            }
            TransportEvent::Drained => {
                self.witnesses
                    .connection("connection closed before handshake completed".to_owned());
                self.connection.close();
                self.transition(State::Closed);
            }
            TransportEvent::Row(_)
            | TransportEvent::RowError(_)
            | TransportEvent::RequestCompleted(_) => self.ignore(&event),
        }
    }

    fn on_querying_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Row(row) => self.rows.push(row),
            TransportEvent::RowError(message) => self.witnesses.query(message),
            TransportEvent::RequestCompleted(error) => {
                if let Some(message) = error {
                    self.witnesses.query(message);
                }
                self.begin_close(State::Completing);
            }
            TransportEvent::ConnectFailed(message) | TransportEvent::Fault(message) => {
                self.witnesses.connection(message);
                self.begin_close(State::Completing);
            }
            TransportEvent::Drained => {
                self.witnesses
                    .connection("connection closed while the query was running".to_owned());
                self.connection.close();
                self.transition(State::Closed);
            }
            TransportEvent::Connected => self.ignore(&event),
        }
    }

    fn on_draining_event(&mut self, event: TransportEvent) {
        let query_submitted = self.state == State::Completing;
        match event {
            TransportEvent::Drained => self.transition(State::Closed),
            TransportEvent::ConnectFailed(message) | TransportEvent::Fault(message) => {
                self.witnesses.connection(message);
            }
            TransportEvent::RowError(message) | TransportEvent::RequestCompleted(Some(message))
                if query_submitted =>
            {
                self.witnesses.query(message);
            }
            _ => self.ignore(&event),
        }
    }

    fn on_events_ended(&mut self) {
        match self.state {
            State::Connecting => {
                self.witnesses
                    .connection("transport ended before handshake completed".to_owned());
            }
            State::Querying => {
                self.witnesses
                    .connection("transport ended while the query was running".to_owned());
            }
            _ => {}
        }
        self.connection.close();
        self.transition(State::Closed);
    }

    fn on_deadline(&mut self) {
        match self.state {
            State::Connecting => {
                self.witnesses.connection(format!(
                    "connect timed out after {} ms",
                    self.endpoint.connect_timeout_ms
                ));
                self.begin_close(State::ConnectFailed);
            }
            State::Querying => {
                self.witnesses.query(format!(
                    "request timed out after {} ms",
                    self.endpoint.request_timeout_ms
                ));
                self.begin_close(State::Completing);
            }
            _ => {
                #[cfg(feature = "tracing")]
                tracing::warn!("transport did not report drained in time, finishing anyway");
                self.transition(State::Closed);
            }
        }
    }

    /// Submits the query right after the handshake. A synchronous rejection
    /// goes straight to `Closed` without waiting for the drain.
    fn submit(&mut self, query: &str) {
        match self.connection.transport.submit(query) {
            Ok(()) => {
                self.transition(State::Querying);
                self.deadline = Instant::now() + self.endpoint.request_timeout();
            }
            Err(message) => {
                self.witnesses.query(message);
                self.connection.close();
                self.transition(State::Closed);
            }
        }
    }

    /// Requests close and waits for the drain, bounded by the connect
    /// timeout.
    fn begin_close(&mut self, next: State) {
        self.transition(next);
        self.deadline = Instant::now() + self.endpoint.connect_timeout();
        self.connection.close();
    }

    fn transition(&mut self, next: State) {
        #[cfg(feature = "tracing")]
        tracing::debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }

    fn ignore(&self, _event: &TransportEvent) {
        #[cfg(feature = "tracing")]
        tracing::trace!(state = ?self.state, event = ?_event, "ignoring transport event");
    }
}

#[cfg(test)]
mod tests {
    use super::Witnesses;
    use crate::{Outcome, Row, SessionError};

    #[test]
    fn witnesses_keep_first_message() {
        let mut witnesses = Witnesses::default();
        witnesses.query("first".to_owned());
        witnesses.query("second".to_owned());
        assert_eq!(
            witnesses.resolve(Vec::new()),
            Outcome::Failure(SessionError::Query("first".to_owned()))
        );
    }

    #[test]
    fn connection_witness_outranks_query_witness() {
        let mut witnesses = Witnesses::default();
        witnesses.query("bad DAX".to_owned());
        witnesses.connection("reset".to_owned());
        assert_eq!(
            witnesses.resolve(vec![Row::new().with("a", 1)]),
            Outcome::Failure(SessionError::Connection("reset".to_owned()))
        );
    }

    #[test]
    fn no_witness_yields_rows_even_when_empty() {
        assert_eq!(
            Witnesses::default().resolve(Vec::new()),
            Outcome::Success(Vec::new())
        );
    }
}
