use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    schemas::{validate_input, LoginInput},
    session::Session,
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/auth/login", axum::routing::post(login))
        .route("/auth/logout", axum::routing::post(logout))
        .route("/me", axum::routing::get(me))
}

/// Forwards credentials; the browser keeps the returned token and sends it
/// back as `Authorization: Bearer`.
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginInput>,
) -> AppResult<Json<Value>> {
    validate_input(&payload)?;
    let outcome = state.portal_api.login(&payload).await?;

    tracing::info!("Login forwarded");

    Ok(Json(json!({
        "token": outcome.token,
        "token_type": "Bearer",
        "user": outcome.user,
    })))
}

/// The remote API revokes the token; the response tells the browser to drop
/// its copy.
async fn logout(State(state): State<AppState>, mut session: Session) -> AppResult<Json<Value>> {
    state.portal_api.logout(&session).await?;
    session.clear();
    Ok(Json(json!({
        "message": "Signed out.",
        "authenticated": session.is_authenticated(),
        "token": session.bearer(),
    })))
}

async fn me(State(state): State<AppState>, session: Session) -> AppResult<Json<Value>> {
    let user = state.portal_api.current_user(&session).await?;
    Ok(Json(json!({ "data": user })))
}
