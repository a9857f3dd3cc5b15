use axum::{
    http::Uri,
    routing::get,
    Router,
};

use crate::{error::AppError, state::AppState};

pub mod auth;
pub mod dormitory;
pub mod health;
pub mod registration;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(auth::router())
        .merge(dormitory::router())
        .merge(registration::router())
        .fallback(not_found)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

/// Stand-in for the institute's portal API, served on an ephemeral port.
#[cfg(test)]
pub(crate) mod remote_stub {
    use crate::{config::AppConfig, state::AppState};

    pub async fn serve(remote: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub");
        let address = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            axum::serve(listener, axum::Router::new().nest("/api", remote))
                .await
                .ok();
        });
        format!("http://{address}/api/")
    }

    pub fn config_for(base_url: &str) -> AppConfig {
        let mut config = AppConfig::from_env();
        config.portal_api_base_url = base_url.to_string();
        config
    }

    pub fn state_for(base_url: &str) -> AppState {
        AppState::build(config_for(base_url)).expect("state")
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::v1_router;
    use crate::{config::AppConfig, state::AppState};

    #[tokio::test]
    async fn unknown_paths_get_a_json_not_found() {
        let state = AppState::build(AppConfig::from_env()).expect("state");
        let response = v1_router()
            .with_state(state)
            .oneshot(
                Request::builder()
                    .uri("/dormitory/unknown")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
