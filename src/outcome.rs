use serde_json::json;

use crate::{Result, Row, SessionError};

/// The single terminal result of a session run.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Success(Vec<Row>),
    Failure(SessionError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_result(self) -> Result<Vec<Row>> {
        match self {
            Self::Success(rows) => Ok(rows),
            Self::Failure(err) => Err(err),
        }
    }

    /// HTTP status and JSON body the gateway sends for this outcome.
    ///
    /// Rows become a JSON array of objects; failures become
    /// `{ "message": … }`.
    pub fn to_http_parts(&self) -> (u16, serde_json::Value) {
        match self {
            Self::Success(rows) => (
                200,
                serde_json::to_value(rows).unwrap_or_else(|_| json!([])),
            ),
            Self::Failure(err) => (err.http_status(), json!({ "message": err.message() })),
        }
    }
}

impl From<Result<Vec<Row>>> for Outcome {
    fn from(result: Result<Vec<Row>>) -> Self {
        match result {
            Ok(rows) => Self::Success(rows),
            Err(err) => Self::Failure(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{Outcome, Row, SessionError};

    #[test]
    fn success_maps_to_row_array() {
        let outcome = Outcome::Success(vec![Row::new().with("a", 1), Row::new().with("a", 2)]);
        assert_eq!(outcome.to_http_parts(), (200, json!([{"a": 1}, {"a": 2}])));
    }

    #[test]
    fn empty_success_is_an_empty_array() {
        assert_eq!(Outcome::Success(Vec::new()).to_http_parts(), (200, json!([])));
    }

    #[test]
    fn failure_maps_to_message_object() {
        let outcome = Outcome::Failure(SessionError::Connection("timeout".to_owned()));
        assert_eq!(outcome.to_http_parts(), (500, json!({"message": "timeout"})));
    }
}
