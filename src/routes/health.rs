use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    // The probe carries its own short timeout so the healthcheck always
    // answers quickly, even when the portal API hangs.
    let portal_api_ok = state.portal_api.ping().await;

    let status = if portal_api_ok { "ok" } else { "degraded" };
    Json(json!({
        "status": status,
        "now": Utc::now().to_rfc3339(),
        "institute_today": state.config.institute_today().to_string(),
        "portal_api": portal_api_ok
    }))
}
