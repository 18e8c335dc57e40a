//! Records responses.
//!
//! Every records route answers in one of three shapes:
//!
//! | Outcome | Status | Body |
//! |---|---|---|
//! | records found (or the unfiltered list is empty) | 200 | JSON array of records |
//! | filtered query matched nothing | 404 | `{"message": "..."}` |
//! | store failure | 500 | `{"error": "..."}` |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use globalindex_lib::{QueryOutcome, Record};
use serde::{Deserialize, Serialize};

/// Body of a 404 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundBody {
    pub message: String,
}

/// Body of a 500 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// HTTP response for a resolved records query.
#[derive(Debug)]
pub enum RecordsResponse {
    Records(Vec<Record>),
    NotFound(NotFoundBody),
    Error(ErrorBody),
}

impl RecordsResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            RecordsResponse::Records(_) => StatusCode::OK,
            RecordsResponse::NotFound(_) => StatusCode::NOT_FOUND,
            RecordsResponse::Error(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The store error is dropped here; it has already been logged with the
/// operation label and must not reach the client.
impl From<QueryOutcome> for RecordsResponse {
    fn from(outcome: QueryOutcome) -> Self {
        match outcome {
            QueryOutcome::Found(records) => RecordsResponse::Records(records),
            QueryOutcome::NotFound { message } => RecordsResponse::NotFound(NotFoundBody {
                message: message.to_string(),
            }),
            QueryOutcome::Failed { message, .. } => RecordsResponse::Error(ErrorBody {
                error: message.to_string(),
            }),
        }
    }
}

impl IntoResponse for RecordsResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            RecordsResponse::Records(records) => (status, Json(records)).into_response(),
            RecordsResponse::NotFound(body) => (status, Json(body)).into_response(),
            RecordsResponse::Error(body) => (status, Json(body)).into_response(),
        }
    }
}
