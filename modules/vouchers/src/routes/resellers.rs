//! Reseller API routes
//!
//! Balance mutations are single atomic statements in the repo; these
//! handlers only translate errors. Deduction failures distinguish missing,
//! inactive and underfunded resellers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::contracts::{BalanceChangeRequestV1, CreateResellerRequestV1, ResellerDetailResponseV1};
use crate::models::{Reseller, ResellerStatus};
use crate::repos::recharge_repo;
use crate::repos::reseller_repo::{self, ResellerError};

use super::HttpError;

/// Query parameters for GET /api/resellers
#[derive(Debug, Deserialize)]
pub struct ResellerListQuery {
    pub manager_id: Uuid,
    pub status: Option<ResellerStatus>,
}

/// POST /api/resellers
pub async fn create_reseller(
    State(pool): State<Arc<PgPool>>,
    Json(req): Json<CreateResellerRequestV1>,
) -> Result<Json<Reseller>, HttpError> {
    // Codes print on receipts; stored upper-cased like voucher codes
    let code = req.code.trim().to_uppercase();

    let reseller = reseller_repo::create(
        &pool,
        req.manager_id,
        &req.name,
        &code,
        req.commission_rate,
        req.initial_balance_minor,
        req.notes.as_deref(),
    )
    .await
    .map_err(map_error)?;

    Ok(Json(reseller))
}

/// GET /api/resellers
pub async fn list_resellers(
    State(pool): State<Arc<PgPool>>,
    Query(params): Query<ResellerListQuery>,
) -> Result<Json<Vec<Reseller>>, HttpError> {
    let resellers = reseller_repo::list_by_manager(&pool, params.manager_id, params.status)
        .await
        .map_err(map_error)?;

    Ok(Json(resellers))
}

/// GET /api/resellers/{id}
pub async fn get_reseller(
    State(pool): State<Arc<PgPool>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResellerDetailResponseV1>, HttpError> {
    let reseller = reseller_repo::find_by_id(&pool, id)
        .await
        .map_err(map_error)?
        .ok_or_else(|| HttpError::not_found(format!("Reseller not found: {}", id)))?;

    let recharges = recharge_repo::rollup_for_reseller(&pool, id)
        .await
        .map_err(map_db_error)?;

    Ok(Json(ResellerDetailResponseV1 {
        reseller,
        recharges,
    }))
}

/// POST /api/resellers/{id}/balance/add
pub async fn add_balance(
    State(pool): State<Arc<PgPool>>,
    Path(id): Path<Uuid>,
    Json(req): Json<BalanceChangeRequestV1>,
) -> Result<Json<Reseller>, HttpError> {
    if req.amount_minor <= 0 {
        return Err(HttpError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "amount_minor must be positive",
        ));
    }

    let reseller = reseller_repo::add_balance(&pool, id, req.amount_minor)
        .await
        .map_err(map_error)?;

    Ok(Json(reseller))
}

/// POST /api/resellers/{id}/balance/deduct
pub async fn deduct_balance(
    State(pool): State<Arc<PgPool>>,
    Path(id): Path<Uuid>,
    Json(req): Json<BalanceChangeRequestV1>,
) -> Result<Json<Reseller>, HttpError> {
    if req.amount_minor <= 0 {
        return Err(HttpError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "amount_minor must be positive",
        ));
    }

    let reseller = reseller_repo::deduct_balance(&pool, id, req.amount_minor)
        .await
        .map_err(map_error)?;

    Ok(Json(reseller))
}

fn map_error(e: ResellerError) -> HttpError {
    let status = match &e {
        ResellerError::NotFound(_) => StatusCode::NOT_FOUND,
        ResellerError::Inactive { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ResellerError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ResellerError::CodeTaken(_) => StatusCode::CONFLICT,
        ResellerError::Database(db) => {
            tracing::error!("Database error: {}", db);
            return HttpError::internal();
        }
    };

    HttpError::new(status, e.to_string())
}

fn map_db_error(e: sqlx::Error) -> HttpError {
    tracing::error!("Database error: {}", e);
    HttpError::internal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_code_maps_to_conflict() {
        let err = map_error(ResellerError::CodeTaken("CK1".to_string()));
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[test]
    fn test_insufficient_balance_message_names_both_amounts() {
        let err = map_error(ResellerError::InsufficientBalance {
            available: 100,
            requested: 150,
        });
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.message.contains("100"));
        assert!(err.message.contains("150"));
    }
}
