use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;

/// Health check endpoint handler.
///
/// Pings the database: every operation this service offers goes through
/// Postgres, so an unreachable pool means not healthy, reported as 503.
pub async fn health(State(pool): State<Arc<PgPool>>) -> Result<Json<Value>, StatusCode> {
    let db_ok = sqlx::query("SELECT 1")
        .fetch_one(pool.as_ref())
        .await
        .is_ok();

    if !db_ok {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": "vouchers-rs",
        "version": env!("CARGO_PKG_VERSION"),
        "database": "connected"
    })))
}
