//! Activation token API contract types (v1)

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Body for POST /api/tokens
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GenerateTokenRequestV1 {
    pub manager_id: Uuid,
    #[serde(default = "default_months")]
    pub months: i32,
}

fn default_months() -> i32 {
    1
}

/// The generated token. Possession is not authorization; redemption resolves
/// and checks the manager again.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateTokenResponseV1 {
    pub token: String,
    pub manager_id: Uuid,
    pub months: i32,
}

/// Body for POST /api/tokens/redeem
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RedeemTokenRequestV1 {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_months_defaults_to_one() {
        let json = format!(r#"{{"manager_id": "{}"}}"#, Uuid::new_v4());
        let req: GenerateTokenRequestV1 = serde_json::from_str(&json).unwrap();
        assert_eq!(req.months, 1);
    }
}
