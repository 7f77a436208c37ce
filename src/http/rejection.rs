//! Requests refused by the pipeline and their HTTP responses.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Why the pipeline refused a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The request carried no key; the governor was not consulted
    #[error("API key is missing")]
    MissingKey,

    /// The governor denied the request
    #[error("Too Many Requests")]
    QuotaExceeded { retry_after: Duration },
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::MissingKey => StatusCode::BAD_REQUEST,
            Rejection::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

/// Whole seconds, rounded up, never below one.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "statusCode": status.as_u16(),
            "message": self.to_string(),
        }));

        let mut response = (status, body).into_response();
        if let Rejection::QuotaExceeded { retry_after } = self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs(retry_after)),
            );
        }
        response
    }
}
