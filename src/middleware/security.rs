use axum::{
    extract::{Request, State},
    http::header::HOST,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::AppError, state::AppState};

/// Rejects requests whose `Host` is not in `TRUSTED_HOSTS`. A `*` entry
/// disables the check.
pub async fn enforce_trusted_hosts(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if host_is_trusted(&host, &state.config.trusted_hosts) {
        return next.run(request).await;
    }

    tracing::warn!(host = %host, "Rejected request from untrusted host");
    AppError::Forbidden("Untrusted host.".to_string()).into_response()
}

pub fn host_is_trusted(host_header: &str, trusted_hosts: &[String]) -> bool {
    let host = strip_port(host_header.trim()).to_ascii_lowercase();
    trusted_hosts.iter().any(|trusted| {
        let trusted = trusted.trim().to_ascii_lowercase();
        if trusted == "*" {
            return true;
        }
        if let Some(suffix) = trusted.strip_prefix("*.") {
            return host.ends_with(&format!(".{suffix}"));
        }
        !host.is_empty() && host == trusted
    })
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // [::1]:8000
        return host
            .split_once(']')
            .map(|(address, _)| address.trim_start_matches('['))
            .unwrap_or(host);
    }
    host.rsplit_once(':')
        .filter(|(_, port)| port.chars().all(|ch| ch.is_ascii_digit()))
        .map_or(host, |(name, _)| name)
}
