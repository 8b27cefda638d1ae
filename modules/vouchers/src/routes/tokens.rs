//! Activation token API routes

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::contracts::{
    ActivateManagerResponseV1, GenerateTokenRequestV1, GenerateTokenResponseV1,
    RedeemTokenRequestV1,
};
use crate::services::subscription_service::{self, SubscriptionError};
use crate::services::token_codec::TokenError;

use super::HttpError;

/// POST /api/tokens
pub async fn generate_token(
    State(pool): State<Arc<PgPool>>,
    Json(req): Json<GenerateTokenRequestV1>,
) -> Result<Json<GenerateTokenResponseV1>, HttpError> {
    let token = subscription_service::generate_token(&pool, req.manager_id, req.months)
        .await
        .map_err(map_error)?;

    Ok(Json(GenerateTokenResponseV1 {
        token,
        manager_id: req.manager_id,
        months: req.months,
    }))
}

/// POST /api/tokens/redeem
pub async fn redeem_token(
    State(pool): State<Arc<PgPool>>,
    Json(req): Json<RedeemTokenRequestV1>,
) -> Result<Json<ActivateManagerResponseV1>, HttpError> {
    let manager = subscription_service::redeem_token(&pool, &req.token)
        .await
        .map_err(map_error)?;

    Ok(Json(ActivateManagerResponseV1::from(manager)))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_months_out_of_range_maps_to_unprocessable() {
        let err = map_error(SubscriptionError::Token(TokenError::MonthsOutOfRange(100)));
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_unknown_prefix_maps_to_not_found() {
        let err = map_error(SubscriptionError::NotFound("DEADBEEF".to_string()));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
