use std::fmt;
use std::time::Duration;

use reqwest::header;
use tokio::task::JoinHandle;

use crate::{
    decode::{decode_row, describe_http_error},
    transport::{Connector, EventSink, Transport},
    wire::{ExecuteQueriesRequest, ExecuteQueriesResponse},
    ConnectionConfig, EndpointDescriptor,
};

/// Path under the host where datasets live.
const DATASETS_PATH: &str = "v1.0/myorg/datasets";

/// Formats an endpoint into its dataset URL.
///
/// Example: host `"api.example.com"`, database `"sales"`, encrypted →
/// `"https://api.example.com/v1.0/myorg/datasets/sales"`
pub fn dataset_url(endpoint: &EndpointDescriptor) -> String {
    let scheme = if endpoint.encrypt { "https" } else { "http" };
    format!(
        "{scheme}://{}/{DATASETS_PATH}/{}",
        endpoint.host.trim(),
        endpoint.database.trim()
    )
}

/// Builds [`HttpTransport`]s that share one `reqwest` connection pool.
#[derive(Clone, Debug, Default)]
pub struct HttpConnector {
    http: reqwest::Client,
}

impl HttpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a preconfigured client (proxies, custom roots, …).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Connector for HttpConnector {
    type Transport = HttpTransport;

    fn create(
        &self,
        config: &ConnectionConfig,
        events: EventSink,
    ) -> Result<HttpTransport, String> {
        Ok(HttpTransport {
            http: self.http.clone(),
            dataset_url: dataset_url(&config.endpoint),
            authorization: format!("Bearer {}", config.access_token.expose()),
            connect_timeout: config.endpoint.connect_timeout(),
            request_timeout: config.endpoint.request_timeout(),
            events,
            phase: Phase::Idle,
            tasks: Vec::new(),
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    Idle,
    Connecting,
    Submitted,
    Closing,
}

/// Transport over a REST tabular query API.
///
/// The handshake is a `GET` of the dataset resource; the query is a single
/// `POST …/executeQueries`. Each runs on its own task and reports back
/// through the [`EventSink`].
pub struct HttpTransport {
    http: reqwest::Client,
    dataset_url: String,
    authorization: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    events: EventSink,
    phase: Phase,
    tasks: Vec<JoinHandle<()>>,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("dataset_url", &self.dataset_url)
            .field("authorization", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("phase", &self.phase)
            .finish()
    }
}

impl Transport for HttpTransport {
    fn connect(&mut self) {
        if self.phase != Phase::Idle {
            #[cfg(feature = "tracing")]
            tracing::debug!(phase = ?self.phase, "ignoring repeated connect");
            return;
        }
        self.phase = Phase::Connecting;

        let request = self
            .http
            .get(&self.dataset_url)
            .header(header::AUTHORIZATION, &self.authorization)
            .timeout(self.connect_timeout);
        let events = self.events.clone();

        self.tasks.push(tokio::spawn(async move {
            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        events.connected();
                    } else {
                        let body = response.text().await.unwrap_or_default();
                        events.connect_failed(describe_http_error(status.as_u16(), &body));
                    }
                }
                Err(err) => events.connect_failed(describe_transport_error(&err)),
            }
        }));
    }

    fn submit(&mut self, query: &str) -> Result<(), String> {
        match self.phase {
            Phase::Connecting => {}
            Phase::Idle => return Err("cannot submit a query before connecting".to_owned()),
            Phase::Submitted => {
                return Err("a query was already submitted on this connection".to_owned())
            }
            Phase::Closing => {
                return Err("cannot submit a query on a closing connection".to_owned())
            }
        }
        if query.trim().is_empty() {
            return Err("query text is empty".to_owned());
        }
        self.phase = Phase::Submitted;

        #[cfg(feature = "tracing")]
        tracing::debug!(url = %self.dataset_url, "submitting query");

        let request = self
            .http
            .post(format!("{}/executeQueries", self.dataset_url))
            .header(header::AUTHORIZATION, &self.authorization)
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(self.request_timeout)
            .json(&ExecuteQueriesRequest::single(query));
        let events = self.events.clone();

        self.tasks.push(tokio::spawn(async move {
            let response = match request.send().await {
                Ok(response) => response,
                // the connection itself went away, not the query
                Err(err) if err.is_connect() => {
                    events.fault(describe_transport_error(&err));
                    return;
                }
                Err(err) => {
                    events.request_completed(Err(describe_transport_error(&err)));
                    return;
                }
            };

            let status = response.status();
            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => {
                    events.request_completed(Err(describe_transport_error(&err)));
                    return;
                }
            };

            if !status.is_success() {
                events.request_completed(Err(describe_http_error(status.as_u16(), &body)));
                return;
            }

            match serde_json::from_str::<ExecuteQueriesResponse>(&body) {
                Ok(parsed) => emit_response(parsed, &events),
                Err(err) => events.request_completed(Err(format!(
                    "invalid executeQueries response JSON: {err}"
                ))),
            }
        }));

        Ok(())
    }

    fn close(&mut self) {
        if self.phase == Phase::Closing {
            return;
        }
        self.phase = Phase::Closing;

        let tasks = std::mem::take(&mut self.tasks);
        for task in &tasks {
            task.abort();
        }

        let events = self.events.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    for task in tasks {
                        let _ = task.await;
                    }
                    events.drained();
                });
            }
            // outside a runtime the aborted tasks can no longer run
            Err(_) => events.drained(),
        }
    }
}

/// Emits the rows of the first query result in order, then the completion.
fn emit_response(response: ExecuteQueriesResponse, events: &EventSink) {
    if let Some(error) = response.error {
        events.request_completed(Err(error.describe()));
        return;
    }

    let Some(result) = response.results.into_iter().next() else {
        events.request_completed(Err("executeQueries response contained no results".to_owned()));
        return;
    };

    if let Some(error) = result.error {
        events.request_completed(Err(error.describe()));
        return;
    }

    for table in result.tables {
        for raw in table.rows {
            match decode_row(raw) {
                Ok(row) => events.row(row),
                Err(message) => events.row_error(message),
            }
        }
    }
    events.request_completed(Ok(()));
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {err}")
    } else {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{dataset_url, emit_response};
    use crate::{
        transport::{EventSink, TransportEvent},
        wire::ExecuteQueriesResponse,
        ConnectionConfig, Connector, Credential, EndpointDescriptor, HttpConnector, Transport,
    };

    fn parse(body: serde_json::Value) -> ExecuteQueriesResponse {
        serde_json::from_value(body).expect("must parse response")
    }

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<TransportEvent>) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn dataset_url_uses_scheme_from_encrypt_flag() {
        let endpoint = EndpointDescriptor::new("api.example.com", "sales");
        assert_eq!(
            dataset_url(&endpoint),
            "https://api.example.com/v1.0/myorg/datasets/sales"
        );
        assert_eq!(
            dataset_url(&endpoint.with_encrypt(false)),
            "http://api.example.com/v1.0/myorg/datasets/sales"
        );
    }

    #[test]
    fn emit_response_streams_rows_then_completion() {
        let (sink, mut rx) = EventSink::channel();
        emit_response(
            parse(json!({
                "results": [{ "tables": [{ "rows": [{ "a": 1 }, "oops", { "a": 2 }] }] }]
            })),
            &sink,
        );

        let events = drain(&mut rx);
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], TransportEvent::Row(row) if row.get_i64("a") == Some(1)));
        assert!(matches!(&events[1], TransportEvent::RowError(_)));
        assert!(matches!(&events[2], TransportEvent::Row(row) if row.get_i64("a") == Some(2)));
        assert_eq!(events[3], TransportEvent::RequestCompleted(None));
    }

    #[test]
    fn emit_response_reports_result_error_without_rows() {
        let (sink, mut rx) = EventSink::channel();
        emit_response(
            parse(json!({ "results": [{ "error": { "message": "bad DAX" } }] })),
            &sink,
        );

        assert_eq!(
            drain(&mut rx),
            vec![TransportEvent::RequestCompleted(Some("bad DAX".to_owned()))]
        );
    }

    #[tokio::test]
    async fn submit_twice_is_rejected_synchronously() {
        let (sink, _rx) = EventSink::channel();
        let config = ConnectionConfig {
            endpoint: EndpointDescriptor::new("127.0.0.1:9", "d").with_encrypt(false),
            access_token: Credential::new("t"),
        };
        let mut transport = HttpConnector::new()
            .create(&config, sink)
            .expect("must create transport");

        assert!(transport.submit("EVALUATE x").is_err());
        transport.connect();
        transport.submit("EVALUATE x").expect("first submit is accepted");
        assert!(transport.submit("EVALUATE x").is_err());
        transport.close();
    }

    #[test]
    fn debug_redacts_authorization_value() {
        let (sink, _rx) = EventSink::channel();
        let config = ConnectionConfig {
            endpoint: EndpointDescriptor::new("h", "d"),
            access_token: Credential::new("secret-token"),
        };
        let transport = HttpConnector::new()
            .create(&config, sink)
            .expect("must create transport");
        let debug = format!("{transport:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }
}
