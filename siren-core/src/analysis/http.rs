//! Shared HTTP plumbing for collaborator clients.
//!
//! Transient/permanent classification drives both the retry policy of the
//! analysis clients and the prune-vs-keep decision of the push delivery
//! client in the server crate.

use reqwest::StatusCode;

/// Check if a reqwest error is transient and should be retried.
pub fn is_transient_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

/// Check if an HTTP status code indicates a transient error.
pub fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::BAD_GATEWAY
    )
}

/// Check if an HTTP status code signals a permanently dead endpoint.
///
/// Push endpoints answer 404 or 410 once the subscription on the other side
/// has been discarded; anything else is treated as recoverable.
pub fn is_gone_status(status: StatusCode) -> bool {
    matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE)
}
