//! Voucher API routes
//!
//! Vouchers are addressed by code, not id; codes are what gets printed and
//! typed in at the point of sale.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::contracts::{
    CreateVoucherBatchRequestV1, MarkVoucherUsedRequestV1, VoucherBatchResponseV1,
};
use crate::models::{Voucher, VoucherStatus};
use crate::repos::voucher_repo;
use crate::services::voucher_service::{self, VoucherBatch, VoucherError};

use super::HttpError;

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 500;

/// Query parameters for GET /api/vouchers
#[derive(Debug, Deserialize)]
pub struct VoucherListQuery {
    pub manager_id: Uuid,
    pub status: Option<VoucherStatus>,
    pub shelf_id: Option<String>,
    pub reseller_id: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// POST /api/vouchers
pub async fn create_voucher_batch(
    State(pool): State<Arc<PgPool>>,
    Json(req): Json<CreateVoucherBatchRequestV1>,
) -> Result<Json<VoucherBatchResponseV1>, HttpError> {
    let batch = VoucherBatch {
        count: req.count,
        profile_name: req.profile_name,
        data_limit_gb: req.data_limit_gb,
        time_limit_hours: req.time_limit_hours,
        validity_days: req.validity_days,
        shelf_id: req.shelf_id,
        reseller_id: req.reseller_id,
        notes: req.notes,
    };

    let vouchers = voucher_service::create_batch(&pool, req.manager_id, &batch)
        .await
        .map_err(map_error)?;

    Ok(Json(VoucherBatchResponseV1 {
        manager_id: req.manager_id,
        created: vouchers.len() as i64,
        vouchers,
    }))
}

/// GET /api/vouchers
pub async fn list_vouchers(
    State(pool): State<Arc<PgPool>>,
    Query(params): Query<VoucherListQuery>,
) -> Result<Json<Vec<Voucher>>, HttpError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1) * limit;

    let vouchers = voucher_repo::list(
        &pool,
        params.manager_id,
        params.status,
        params.shelf_id.as_deref(),
        params.reseller_id,
        limit,
        offset,
    )
    .await
    .map_err(map_db_error)?;

    Ok(Json(vouchers))
}

/// GET /api/vouchers/{code}
pub async fn get_voucher(
    State(pool): State<Arc<PgPool>>,
    Path(code): Path<String>,
) -> Result<Json<Voucher>, HttpError> {
    let voucher = voucher_service::get(&pool, &code).await.map_err(map_error)?;

    Ok(Json(voucher))
}

/// POST /api/vouchers/{code}/use
pub async fn use_voucher(
    State(pool): State<Arc<PgPool>>,
    Path(code): Path<String>,
    body: Option<Json<MarkVoucherUsedRequestV1>>,
) -> Result<Json<Voucher>, HttpError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let voucher = voucher_service::mark_used(
        &pool,
        &code,
        req.mac.as_deref(),
        req.ip.as_deref(),
        req.device.as_deref(),
    )
    .await
    .map_err(map_error)?;

    Ok(Json(voucher))
}

/// POST /api/vouchers/{code}/print
pub async fn print_voucher(
    State(pool): State<Arc<PgPool>>,
    Path(code): Path<String>,
) -> Result<Json<Voucher>, HttpError> {
    let voucher = voucher_service::mark_printed(&pool, &code)
        .await
        .map_err(map_error)?;

    Ok(Json(voucher))
}

/// POST /api/vouchers/{code}/disable
pub async fn disable_voucher(
    State(pool): State<Arc<PgPool>>,
    Path(code): Path<String>,
) -> Result<Json<Voucher>, HttpError> {
    let voucher = voucher_service::disable(&pool, &code)
        .await
        .map_err(map_error)?;

    Ok(Json(voucher))
}

fn map_error(e: VoucherError) -> HttpError {
    let status = match &e {
        VoucherError::NotFound(_) => StatusCode::NOT_FOUND,
        VoucherError::ManagerNotFound(_) => StatusCode::NOT_FOUND,
        VoucherError::ResellerNotFound(_) => StatusCode::NOT_FOUND,
        VoucherError::InvalidStatus { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        VoucherError::InvalidBatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
        VoucherError::Database(db) => {
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
    fn test_disable_wrong_state_maps_to_unprocessable() {
        let err = map_error(VoucherError::InvalidStatus {
            code: "ABCD123456".to_string(),
            status: VoucherStatus::Used,
        });
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_oversized_batch_maps_to_unprocessable() {
        let err = map_error(VoucherError::InvalidBatch("count too large".to_string()));
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
