//! Reseller API contract types (v1)

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Reseller;
use crate::repos::recharge_repo::ResellerRechargeRollup;

/// Body for POST /api/resellers
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateResellerRequestV1 {
    pub manager_id: Uuid,
    pub name: String,
    /// Short unique code, stored upper-cased
    pub code: String,
    #[serde(default = "default_commission_rate")]
    pub commission_rate: f64,
    #[serde(default)]
    pub initial_balance_minor: i64,
    pub notes: Option<String>,
}

fn default_commission_rate() -> f64 {
    0.10
}

/// Body for the balance add/deduct endpoints
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BalanceChangeRequestV1 {
    pub amount_minor: i64,
}

/// Reseller with their all-time recharge rollup
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResellerDetailResponseV1 {
    pub reseller: Reseller,
    pub recharges: ResellerRechargeRollup,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults() {
        let json = format!(
            r#"{{"manager_id": "{}", "name": "Corner kiosk", "code": "ck1"}}"#,
            Uuid::new_v4()
        );
        let req: CreateResellerRequestV1 = serde_json::from_str(&json).unwrap();
        assert_eq!(req.commission_rate, 0.10);
        assert_eq!(req.initial_balance_minor, 0);
        assert_eq!(req.notes, None);
    }
}
