//! Recharge API contract types (v1)

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Recharge, RechargeMethod, Voucher};
use crate::services::recharge_service::RechargeOutcome;

/// Body for POST /api/recharges
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRechargeRequestV1 {
    pub voucher_code: String,
    pub reseller_id: Uuid,
    pub amount_minor: i64,
    #[serde(default)]
    pub data_added_gb: i32,
    /// When absent the commission comes from the reseller's rate
    pub commission_minor: Option<i64>,
    #[serde(default)]
    pub system_fee_minor: i64,
    #[serde(default = "default_method")]
    pub payment_method: RechargeMethod,
    pub notes: Option<String>,
}

fn default_method() -> RechargeMethod {
    RechargeMethod::Cash
}

/// A completed recharge: the ledger row, the reset voucher, and what
/// happened to the reseller balance
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RechargeResponseV1 {
    pub recharge: Recharge,
    pub voucher: Voucher,
    /// Signed change applied to the balance: -(amount - commission)
    pub reseller_balance_delta: i64,
    pub reseller_balance_minor: i64,
}

impl From<RechargeOutcome> for RechargeResponseV1 {
    fn from(outcome: RechargeOutcome) -> Self {
        RechargeResponseV1 {
            recharge: outcome.recharge,
            voucher: outcome.voucher,
            reseller_balance_delta: outcome.reseller_balance_delta,
            reseller_balance_minor: outcome.reseller_balance_minor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults() {
        let json = format!(
            r#"{{"voucher_code": "ABCD123456", "reseller_id": "{}", "amount_minor": 1000}}"#,
            Uuid::new_v4()
        );
        let req: CreateRechargeRequestV1 = serde_json::from_str(&json).unwrap();
        assert_eq!(req.data_added_gb, 0);
        assert_eq!(req.commission_minor, None);
        assert_eq!(req.system_fee_minor, 0);
        assert_eq!(req.payment_method, RechargeMethod::Cash);
    }

    #[test]
    fn test_payment_method_wire_names() {
        let req: CreateRechargeRequestV1 = serde_json::from_str(&format!(
            r#"{{"voucher_code": "X", "reseller_id": "{}", "amount_minor": 1,
                 "payment_method": "mobile_money"}}"#,
            Uuid::new_v4()
        ))
        .unwrap();
        assert_eq!(req.payment_method, RechargeMethod::MobileMoney);
    }
}
