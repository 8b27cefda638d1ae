//! Dashboard and revenue reporting routes

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;

use crate::repos::payment_repo::{RevenueBucket, RevenuePeriod};
use crate::services::stats_service::{self, DashboardStats, StatsError};

use super::HttpError;

/// Query parameters for GET /api/revenue
#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    pub period: Option<RevenuePeriod>,
}

/// Revenue series response
#[derive(Debug, Serialize)]
pub struct RevenueResponse {
    pub period: RevenuePeriod,
    pub buckets: Vec<RevenueBucket>,
}

/// GET /api/dashboard
pub async fn get_dashboard(
    State(pool): State<Arc<PgPool>>,
) -> Result<Json<DashboardStats>, HttpError> {
    let stats = stats_service::dashboard(&pool).await.map_err(map_error)?;

    Ok(Json(stats))
}

/// GET /api/revenue
pub async fn get_revenue(
    State(pool): State<Arc<PgPool>>,
    Query(params): Query<RevenueQuery>,
) -> Result<Json<RevenueResponse>, HttpError> {
    let period = params.period.unwrap_or(RevenuePeriod::Month);

    let buckets = stats_service::revenue_series(&pool, period)
        .await
        .map_err(map_error)?;

    Ok(Json(RevenueResponse { period, buckets }))
}

fn map_error(e: StatsError) -> HttpError {
    match e {
        StatsError::ManagerNotFound(_) => HttpError::not_found(e.to_string()),
        StatsError::Database(db) => {
            tracing::error!("Database error: {}", db);
            HttpError::internal()
        }
    }
}
