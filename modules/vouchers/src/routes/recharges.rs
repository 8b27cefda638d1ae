//! Recharge API routes

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::contracts::{CreateRechargeRequestV1, RechargeResponseV1};
use crate::models::Recharge;
use crate::repos::recharge_repo;
use crate::repos::reseller_repo::ResellerError;
use crate::services::recharge_service::{self, RechargeError, RechargeRequest};

use super::HttpError;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 200;

/// Query parameters for GET /api/recharges
#[derive(Debug, Deserialize)]
pub struct RechargeListQuery {
    pub manager_id: Option<Uuid>,
    pub reseller_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// POST /api/recharges
pub async fn create_recharge(
    State(pool): State<Arc<PgPool>>,
    Json(req): Json<CreateRechargeRequestV1>,
) -> Result<Json<RechargeResponseV1>, HttpError> {
    let request = RechargeRequest {
        voucher_code: req.voucher_code,
        reseller_id: req.reseller_id,
        amount_minor: req.amount_minor,
        data_added_gb: req.data_added_gb,
        commission_minor: req.commission_minor,
        system_fee_minor: req.system_fee_minor,
        payment_method: req.payment_method,
        notes: req.notes,
    };

    let outcome = recharge_service::execute(&pool, &request)
        .await
        .map_err(map_error)?;

    Ok(Json(RechargeResponseV1::from(outcome)))
}

/// GET /api/recharges
pub async fn list_recharges(
    State(pool): State<Arc<PgPool>>,
    Query(params): Query<RechargeListQuery>,
) -> Result<Json<Vec<Recharge>>, HttpError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let recharges =
        recharge_repo::list_recent(&pool, params.manager_id, params.reseller_id, limit)
            .await
            .map_err(map_db_error)?;

    Ok(Json(recharges))
}

fn map_error(e: RechargeError) -> HttpError {
    let status = match &e {
        RechargeError::VoucherNotFound(_) => StatusCode::NOT_FOUND,
        RechargeError::NotRechargeable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        RechargeError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RechargeError::Reseller(inner) => match inner {
            ResellerError::NotFound(_) => StatusCode::NOT_FOUND,
            ResellerError::Inactive { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ResellerError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ResellerError::CodeTaken(_) => StatusCode::CONFLICT,
            ResellerError::Database(db) => {
                tracing::error!("Database error: {}", db);
                return HttpError::internal();
            }
        },
        RechargeError::Database(db) => {
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
    use crate::models::VoucherStatus;

    #[test]
    fn test_insufficient_balance_maps_to_unprocessable() {
        let err = map_error(RechargeError::Reseller(ResellerError::InsufficientBalance {
            available: 100,
            requested: 900,
        }));
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_not_rechargeable_maps_to_unprocessable() {
        let err = map_error(RechargeError::NotRechargeable {
            code: "ABCD123456".to_string(),
            status: VoucherStatus::Active,
        });
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_missing_voucher_maps_to_not_found() {
        let err = map_error(RechargeError::VoucherNotFound("NOPE".to_string()));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
