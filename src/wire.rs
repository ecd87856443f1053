use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteQueriesRequest {
    pub queries: Vec<QueryText>,
    pub serializer_settings: SerializerSettings,
}

impl ExecuteQueriesRequest {
    pub fn single(query: &str) -> Self {
        Self {
            queries: vec![QueryText {
                query: query.to_owned(),
            }],
            serializer_settings: SerializerSettings {
                include_nulls: true,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueryText {
    pub query: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializerSettings {
    pub include_nulls: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteQueriesResponse {
    #[serde(default)]
    pub results: Vec<QueryResult>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub rows: Vec<serde_json::Value>,
}

/// Error payload returned both at top level and per query result.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "pbi.error", default)]
    pub detail: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub details: Vec<ErrorDetailEntry>,
}

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct ErrorDetailEntry {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub detail: Option<ErrorDetailValue>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetailValue {
    #[serde(default)]
    pub value: Option<String>,
}

/// Envelope for non-success HTTP bodies: `{ "error": { … } }`.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiError,
}
