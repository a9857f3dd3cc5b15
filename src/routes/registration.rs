use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::{field_error_map, AppError, AppResult},
    schemas::RegistrationStepPath,
    services::registration::{RegistrationDraft, RegistrationStep, RegistrationWizard},
    session::Session,
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/registration/steps/{step}",
            axum::routing::post(validate_step),
        )
        .route(
            "/registration/steps/{step}/back",
            axum::routing::post(step_back),
        )
        .route("/registration/submit", axum::routing::post(submit))
}

fn parse_step(raw: &str) -> AppResult<RegistrationStep> {
    raw.parse::<RegistrationStep>()
        .map_err(|_| AppError::NotFound(format!("Unknown registration step: {raw}")))
}

/// Validates the named step of the posted draft and reports where the wizard
/// goes next. Failures come back as 422 with a per-field error map.
async fn validate_step(
    State(state): State<AppState>,
    Path(path): Path<RegistrationStepPath>,
    Json(draft): Json<RegistrationDraft>,
) -> AppResult<Json<Value>> {
    let step = parse_step(&path.step)?;

    let mut wizard = RegistrationWizard::resume(draft, step);
    let outcome = wizard.advance(state.config.institute_today())?;

    Ok(Json(json!({
        "step": step,
        "step_number": step.number(),
        "valid": true,
        "outcome": outcome,
        "current": wizard.current(),
        "previous": step.previous(),
    })))
}

/// Steps back without validating, so a half-filled step never blocks
/// going back to fix an earlier one.
async fn step_back(Path(path): Path<RegistrationStepPath>) -> AppResult<Json<Value>> {
    let step = parse_step(&path.step)?;
    let mut wizard = RegistrationWizard::resume(RegistrationDraft::default(), step);
    let current = wizard.back();

    Ok(Json(json!({
        "step": step,
        "current": current,
        "step_number": current.number(),
        "at_first_step": current.previous().is_none(),
    })))
}

async fn submit(
    State(state): State<AppState>,
    session: Session,
    Json(draft): Json<RegistrationDraft>,
) -> AppResult<(StatusCode, Json<Value>)> {
    session.require()?;
    let today = state.config.institute_today();
    let wizard = RegistrationWizard::new(draft);

    if !wizard.can_submit(today) {
        if let Some((step, errors)) = wizard.draft().first_invalid_step(today) {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "detail": "Registration is incomplete.",
                    "step": step,
                    "errors": field_error_map(&errors),
                })),
            ));
        }
    }

    let draft = wizard.into_draft();
    let created = state
        .portal_api
        .submit_registration(&session, &draft)
        .await?;
    tracing::info!("Trainee registration forwarded");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration submitted.",
            "data": created,
        })),
    ))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{config::AppConfig, state::AppState};

    fn app() -> axum::Router {
        let state = AppState::build(AppConfig::from_env()).expect("state");
        super::router().with_state(state)
    }

    async fn post(uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        let response = app().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let payload = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, payload)
    }

    #[tokio::test]
    async fn valid_emergency_contact_moves_to_education() {
        let (status, body) = post(
            "/registration/steps/emergency_contact",
            json!({
                "emergency_contact": {
                    "full_name": "Maria Dela Cruz",
                    "relationship": "Mother",
                    "mobile_number": "09171234567"
                }
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["outcome"]["outcome"], "moved");
        assert_eq!(body["outcome"]["step"], "education");
        assert_eq!(body["current"], "education");
    }

    #[tokio::test]
    async fn missing_section_is_rejected_with_field_errors() {
        let (status, body) = post("/registration/steps/contact", json!({})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["errors"].get("contact").is_some(), "{body}");
    }

    #[tokio::test]
    async fn unknown_step_is_not_found() {
        let (status, _) = post("/registration/steps/payment", json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn going_back_skips_validation() {
        let (status, body) = post("/registration/steps/education/back", json!({})).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["current"], "emergency_contact");
        assert_eq!(body["at_first_step"], false);

        let (status, body) = post("/registration/steps/personal/back", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current"], "personal");
        assert_eq!(body["at_first_step"], true);
    }

    #[tokio::test]
    async fn submit_requires_a_session() {
        let (status, _) = post("/registration/submit", json!({})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
