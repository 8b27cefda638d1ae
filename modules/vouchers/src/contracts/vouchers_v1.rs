//! Voucher API contract types (v1)

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Voucher;

/// Body for POST /api/vouchers
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateVoucherBatchRequestV1 {
    pub manager_id: Uuid,
    pub count: i32,
    pub profile_name: String,
    pub data_limit_gb: i32,
    pub time_limit_hours: i32,
    pub validity_days: i32,
    pub shelf_id: Option<String>,
    pub reseller_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// The freshly created batch, codes included
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VoucherBatchResponseV1 {
    pub manager_id: Uuid,
    pub created: i64,
    pub vouchers: Vec<Voucher>,
}

/// Body for POST /api/vouchers/{code}/use
///
/// All stamps are optional; whatever the access point reports gets stored.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct MarkVoucherUsedRequestV1 {
    pub mac: Option<String>,
    pub ip: Option<String>,
    pub device: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_request_optional_fields_default_to_none() {
        let json = format!(
            r#"{{"manager_id": "{}", "count": 10, "profile_name": "10GB",
                 "data_limit_gb": 10, "time_limit_hours": 72, "validity_days": 30}}"#,
            Uuid::new_v4()
        );
        let req: CreateVoucherBatchRequestV1 = serde_json::from_str(&json).unwrap();
        assert_eq!(req.count, 10);
        assert_eq!(req.shelf_id, None);
        assert_eq!(req.reseller_id, None);
    }

    #[test]
    fn test_mark_used_accepts_empty_body() {
        let req: MarkVoucherUsedRequestV1 = serde_json::from_str("{}").unwrap();
        assert_eq!(req.mac, None);
        assert_eq!(req.ip, None);
        assert_eq!(req.device, None);
    }
}
