use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    schemas::{AsOfQuery, PaymentSummaryQuery, QuoteInput, RoomPath, TenancyStatus},
    services::{
        billing_views::{
            overdue_tenant_rows, payment_summary, quote, room_tenant_rows, select_tenancy,
            OverdueTenantList, PaymentSummary, StayQuote,
        },
        stay_cost::OverduePolicy,
    },
    session::Session,
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/dormitory/rooms/{room_id}/tenants",
            axum::routing::get(list_room_tenants),
        )
        .route(
            "/dormitory/tenants/overdue",
            axum::routing::get(list_overdue_tenants),
        )
        .route(
            "/dormitory/me/payment-summary",
            axum::routing::get(get_payment_summary),
        )
        .route("/dormitory/quote", axum::routing::post(create_quote))
}

fn resolve_today(state: &AppState, query: &AsOfQuery) -> AppResult<NaiveDate> {
    Ok(query
        .pinned_day()?
        .unwrap_or_else(|| state.config.institute_today()))
}

async fn list_room_tenants(
    State(state): State<AppState>,
    Path(path): Path<RoomPath>,
    Query(query): Query<AsOfQuery>,
    session: Session,
) -> AppResult<Json<Value>> {
    let today = resolve_today(&state, &query)?;
    let tenancies = state
        .portal_api
        .room_tenancies(&session, &path.room_id)
        .await?;
    let rows = room_tenant_rows(&tenancies, today);

    Ok(Json(json!({
        "room_id": path.room_id,
        "as_of": today,
        "data": rows,
    })))
}

async fn list_overdue_tenants(
    State(state): State<AppState>,
    Query(query): Query<AsOfQuery>,
    session: Session,
) -> AppResult<Json<OverdueTenantList>> {
    let today = resolve_today(&state, &query)?;
    let policy = OverduePolicy::from_requires_approval(state.config.overdue_list_requires_approval);

    // With the approval gate on, only approved stays can show up, so let the
    // remote API filter them.
    let status_filter = policy
        .requires_approval()
        .then_some(TenancyStatus::Approved);
    let tenancies = state
        .portal_api
        .all_tenancies(&session, status_filter)
        .await?;

    let list = overdue_tenant_rows(&tenancies, today, policy);
    tracing::info!(
        count = list.count,
        total_outstanding = %list.total_outstanding,
        "Built overdue tenant list"
    );
    Ok(Json(list))
}

async fn get_payment_summary(
    State(state): State<AppState>,
    Query(query): Query<PaymentSummaryQuery>,
    session: Session,
) -> AppResult<Json<PaymentSummary>> {
    let today = resolve_today(
        &state,
        &AsOfQuery {
            as_of: query.as_of.clone(),
        },
    )?;
    let tenancies = state.portal_api.my_tenancies(&session).await?;
    let tenancy = select_tenancy(&tenancies, query.tenancy_id.as_deref())
        .ok_or_else(|| AppError::NotFound("No dormitory stay found.".to_string()))?;

    Ok(Json(payment_summary(tenancy, today)))
}

async fn create_quote(Json(payload): Json<QuoteInput>) -> Json<StayQuote> {
    Json(quote(payload.from_date, payload.to_date, payload.daily_rate))
}
