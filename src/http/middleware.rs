//! Rate limiting step of the request pipeline.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::{debug, warn};

use super::key::ClientKey;
use super::rejection::Rejection;
use crate::ratelimit::{Clock, RateLimitBackend, Verdict};

/// Shared state handed to the rate limiting middleware.
#[derive(Clone)]
pub struct GateState {
    /// The limiter consulted for every keyed request
    pub limiter: Arc<dyn RateLimitBackend>,
    /// Source of the timestamp passed to the limiter
    pub clock: Arc<dyn Clock>,
    /// Header the caller's key is read from
    pub key_header: HeaderName,
}

impl GateState {
    pub fn new(
        limiter: Arc<dyn RateLimitBackend>,
        clock: Arc<dyn Clock>,
        key_header: HeaderName,
    ) -> Self {
        Self {
            limiter,
            clock,
            key_header,
        }
    }

    /// Decide whether a request with these headers may proceed.
    ///
    /// A request without a key is refused before the limiter is consulted.
    pub fn admit(&self, headers: &HeaderMap) -> Result<(), Rejection> {
        let Some(key) = ClientKey::from_headers(headers, &self.key_header) else {
            warn!(header = %self.key_header, "Rejecting request without API key");
            return Err(Rejection::MissingKey);
        };

        match self.limiter.check(key.as_str(), self.clock.now()) {
            Verdict::Admit { remaining } => {
                debug!(key = %key, remaining, "Request admitted");
                Ok(())
            }
            Verdict::Deny { retry_after } => {
                debug!(
                    key = %key,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Request denied by rate limit"
                );
                Err(Rejection::QuotaExceeded { retry_after })
            }
        }
    }
}

/// Axum middleware enforcing the per-key quota on every request.
pub async fn enforce_rate_limit(
    State(gate): State<GateState>,
    request: Request,
    next: Next,
) -> Response {
    match gate.admit(request.headers()) {
        Ok(()) => next.run(request).await,
        Err(rejection) => rejection.into_response(),
    }
}
