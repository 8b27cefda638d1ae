//! Manager API routes
//!
//! CRUD plus the three lifecycle transitions. Activation and suspension
//! return the updated manager so clients never need a follow-up read.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::contracts::{
    ActivateManagerRequestV1, ActivateManagerResponseV1, CreateManagerRequestV1,
    ManagerListResponseV1, ManagerResponseV1, SuspendManagerRequestV1,
};
use crate::models::ManagerStatus;
use crate::repos::manager_repo;
use crate::services::stats_service::{self, StatsError, StatsPeriod};
use crate::services::subscription_service::{self, SubscriptionError};
use crate::services::token_codec::TokenError;

use super::HttpError;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Query parameters for GET /api/managers
#[derive(Debug, Deserialize)]
pub struct ManagerListQuery {
    pub status: Option<ManagerStatus>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Query parameters for GET /api/managers/{id}
#[derive(Debug, Deserialize)]
pub struct ManagerDetailQuery {
    /// Window for the recharge rollup, defaults to month
    pub period: Option<StatsPeriod>,
}

/// POST /api/managers
pub async fn create_manager(
    State(pool): State<Arc<PgPool>>,
    Json(req): Json<CreateManagerRequestV1>,
) -> Result<Json<ManagerResponseV1>, HttpError> {
    let manager = subscription_service::create_manager(&pool, &req.email, &req.display_name)
        .await
        .map_err(map_error)?;

    Ok(Json(ManagerResponseV1::from(manager)))
}

/// GET /api/managers
pub async fn list_managers(
    State(pool): State<Arc<PgPool>>,
    Query(params): Query<ManagerListQuery>,
) -> Result<Json<ManagerListResponseV1>, HttpError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1) * limit;
    let search = params.search.as_deref();

    let managers = manager_repo::list(&pool, params.status, search, limit, offset)
        .await
        .map_err(map_db_error)?;
    let total = manager_repo::count(&pool, params.status, search)
        .await
        .map_err(map_db_error)?;

    let pages = if total == 0 { 0 } else { (total + limit - 1) / limit };

    Ok(Json(ManagerListResponseV1 {
        managers: managers.into_iter().map(ManagerResponseV1::from).collect(),
        total,
        page,
        pages,
    }))
}

/// GET /api/managers/{id}
///
/// Detail view: the manager plus voucher rollup, reseller count and the
/// windowed recharge rollup.
pub async fn get_manager(
    State(pool): State<Arc<PgPool>>,
    Path(id): Path<Uuid>,
    Query(params): Query<ManagerDetailQuery>,
) -> Result<Json<stats_service::ManagerDetail>, HttpError> {
    let period = params.period.unwrap_or(StatsPeriod::Month);

    let detail = stats_service::manager_detail(&pool, id, period)
        .await
        .map_err(map_stats_error)?;

    Ok(Json(detail))
}

/// DELETE /api/managers/{id}
pub async fn delete_manager(
    State(pool): State<Arc<PgPool>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, HttpError> {
    subscription_service::delete_manager(&pool, id)
        .await
        .map_err(map_error)?;

    Ok(Json(json!({ "deleted": true, "manager_id": id })))
}

/// POST /api/managers/{id}/activate
///
/// Empty body accepted: one month at the default price, recorded as manual.
pub async fn activate_manager(
    State(pool): State<Arc<PgPool>>,
    Path(id): Path<Uuid>,
    body: Option<Json<ActivateManagerRequestV1>>,
) -> Result<Json<ActivateManagerResponseV1>, HttpError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let auto_note = format!("Activated by admin for {} month(s)", req.months);
    let notes = req.notes.as_deref().unwrap_or(&auto_note);

    let manager = subscription_service::activate(
        &pool,
        id,
        req.months,
        req.amount_minor,
        req.method,
        req.transaction_id.as_deref(),
        Some(notes),
    )
    .await
    .map_err(map_error)?;

    Ok(Json(ActivateManagerResponseV1::from(manager)))
}

/// POST /api/managers/{id}/suspend
pub async fn suspend_manager(
    State(pool): State<Arc<PgPool>>,
    Path(id): Path<Uuid>,
    body: Option<Json<SuspendManagerRequestV1>>,
) -> Result<Json<ManagerResponseV1>, HttpError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let manager = subscription_service::suspend(&pool, id, req.reason.as_deref())
        .await
        .map_err(map_error)?;

    Ok(Json(ManagerResponseV1::from(manager)))
}

/// POST /api/managers/{id}/reinstate
pub async fn reinstate_manager(
    State(pool): State<Arc<PgPool>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ManagerResponseV1>, HttpError> {
    let manager = subscription_service::reinstate(&pool, id)
        .await
        .map_err(map_error)?;

    Ok(Json(ManagerResponseV1::from(manager)))
}

fn map_error(e: SubscriptionError) -> HttpError {
    let status = match &e {
        SubscriptionError::NotFound(_) => StatusCode::NOT_FOUND,
        SubscriptionError::EmailTaken(_) => StatusCode::CONFLICT,
        SubscriptionError::AlreadyTerminal { .. } => StatusCode::CONFLICT,
        SubscriptionError::InvalidMonths(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SubscriptionError::Token(TokenError::InvalidFormat) => StatusCode::BAD_REQUEST,
        SubscriptionError::Token(TokenError::MonthsOutOfRange(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SubscriptionError::Database(db) => {
            tracing::error!("Database error: {}", db);
            return HttpError::internal();
        }
    };

    HttpError::new(status, e.to_string())
}

fn map_stats_error(e: StatsError) -> HttpError {
    match e {
        StatsError::ManagerNotFound(_) => HttpError::not_found(e.to_string()),
        StatsError::Database(db) => {
            tracing::error!("Database error: {}", db);
            HttpError::internal()
        }
    }
}

fn map_db_error(e: sqlx::Error) -> HttpError {
    tracing::error!("Database error: {}", e);
    HttpError::internal()
}
