//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;
use tgrelay_session::SessionState;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `"ok"` while the session is authorized, `"degraded"` otherwise.
    pub status: &'static str,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Session lifecycle state.
    pub session_state: SessionState,
}

/// Build a health response.
pub fn health_check(start_time: Instant, session_state: SessionState) -> HealthResponse {
    HealthResponse {
        status: if session_state == SessionState::Authorized {
            "ok"
        } else {
            "degraded"
        },
        uptime_secs: start_time.elapsed().as_secs(),
        session_state,
    }
}
