//! HTTP surface: one request, one session, one JSON response.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;

use crate::{
    auth::parse_bearer, Connector, EndpointDescriptor, Outcome, QuerySession, Result,
    SessionError,
};

/// Shared state for the gateway routes.
pub struct AppState<C> {
    session: QuerySession<C>,
    endpoint: Result<EndpointDescriptor>,
    query: String,
}

impl<C: Connector> AppState<C> {
    /// `endpoint` may be an error; every query request then answers with it.
    pub fn new(
        connector: C,
        endpoint: Result<EndpointDescriptor>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            session: QuerySession::new(connector),
            endpoint,
            query: query.into(),
        }
    }
}

/// Builds the gateway router.
///
/// - `GET|POST /query` runs the configured query with the caller's bearer
///   token.
/// - `GET /health` answers `ok`.
pub fn router<C>(state: AppState<C>) -> Router
where
    C: Connector + 'static,
{
    Router::new()
        .route("/query", get(query_handler::<C>).post(query_handler::<C>))
        .route("/health", get(health))
        .with_state(Arc::new(state))
}

/// Serves the gateway on `listener` until the process stops.
pub async fn serve<C>(listener: TcpListener, state: AppState<C>) -> std::io::Result<()>
where
    C: Connector + 'static,
{
    axum::serve(listener, router(state)).await
}

async fn health() -> &'static str {
    "ok"
}

async fn query_handler<C>(State(state): State<Arc<AppState<C>>>, headers: HeaderMap) -> Response
where
    C: Connector + 'static,
{
    let raw = headers
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str())
        .transpose();
    let credential = match raw {
        Ok(value) => parse_bearer(value),
        Err(_) => Err(SessionError::AuthHeader(
            "malformed Authorization header".to_owned(),
        )),
    };

    let outcome = match (credential, &state.endpoint) {
        (Err(err), _) => Outcome::Failure(err),
        (Ok(_), Err(err)) => Outcome::Failure(err.clone()),
        (Ok(credential), Ok(endpoint)) => {
            state.session.run(endpoint, &credential, &state.query).await
        }
    };

    match &outcome {
        Outcome::Success(rows) => tracing::info!(rows = rows.len(), "query succeeded"),
        Outcome::Failure(err) => tracing::warn!(kind = ?err.kind(), error = %err, "query failed"),
    }

    outcome.into_response()
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        let (status, body) = self.to_http_parts();
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}
