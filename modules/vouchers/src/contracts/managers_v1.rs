//! Manager API contract types (v1)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Manager, ManagerStatus, PaymentMethod};
use crate::services::subscription_state;

/// Body for POST /api/managers
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateManagerRequestV1 {
    pub email: String,
    pub display_name: String,
}

/// Body for POST /api/managers/{id}/activate
///
/// Everything is optional: an empty body buys one month at the default
/// price, recorded as a manual payment.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ActivateManagerRequestV1 {
    #[serde(default = "default_months")]
    pub months: i32,
    #[serde(default = "default_amount_minor")]
    pub amount_minor: i64,
    #[serde(default = "default_method")]
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

impl Default for ActivateManagerRequestV1 {
    fn default() -> Self {
        ActivateManagerRequestV1 {
            months: default_months(),
            amount_minor: default_amount_minor(),
            method: default_method(),
            transaction_id: None,
            notes: None,
        }
    }
}

fn default_months() -> i32 {
    1
}

fn default_amount_minor() -> i64 {
    500
}

fn default_method() -> PaymentMethod {
    PaymentMethod::Manual
}

/// Response for activation (direct or via token redemption)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivateManagerResponseV1 {
    pub manager_id: Uuid,
    pub display_name: String,
    pub status: ManagerStatus,
    pub subscription_ends_at: Option<DateTime<Utc>>,
    pub days_left: i64,
}

impl From<Manager> for ActivateManagerResponseV1 {
    fn from(manager: Manager) -> Self {
        let days_left = subscription_state::days_left(&manager, Utc::now()).max(0);
        ActivateManagerResponseV1 {
            manager_id: manager.id,
            display_name: manager.display_name,
            status: manager.status,
            subscription_ends_at: manager.subscription_ends_at,
            days_left,
        }
    }
}

/// Body for POST /api/managers/{id}/suspend
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SuspendManagerRequestV1 {
    pub reason: Option<String>,
}

/// A manager as the API presents it, with the derived window fields the
/// stored row does not carry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ManagerResponseV1 {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub status: ManagerStatus,
    pub trial_started_at: DateTime<Utc>,
    pub trial_ends_at: DateTime<Utc>,
    pub subscription_started_at: Option<DateTime<Utc>>,
    pub subscription_ends_at: Option<DateTime<Utc>>,
    pub dormant: bool,
    pub last_activity_at: DateTime<Utc>,
    /// Whole days remaining in the governing window, clamped at 0 for display
    pub days_left: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Manager> for ManagerResponseV1 {
    fn from(manager: Manager) -> Self {
        let now = Utc::now();
        let days_left = subscription_state::days_left(&manager, now).max(0);
        let is_active = subscription_state::is_active(&manager, now);
        ManagerResponseV1 {
            id: manager.id,
            email: manager.email,
            display_name: manager.display_name,
            status: manager.status,
            trial_started_at: manager.trial_started_at,
            trial_ends_at: manager.trial_ends_at,
            subscription_started_at: manager.subscription_started_at,
            subscription_ends_at: manager.subscription_ends_at,
            dormant: manager.dormant,
            last_activity_at: manager.last_activity_at,
            days_left,
            is_active,
            created_at: manager.created_at,
            updated_at: manager.updated_at,
        }
    }
}

/// Paginated manager list
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ManagerListResponseV1 {
    pub managers: Vec<ManagerResponseV1>,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_activate_request_defaults() {
        let req: ActivateManagerRequestV1 = serde_json::from_str("{}").unwrap();
        assert_eq!(req.months, 1);
        assert_eq!(req.amount_minor, 500);
        assert_eq!(req.method, PaymentMethod::Manual);
        assert_eq!(req.transaction_id, None);
    }

    #[test]
    fn test_activate_request_explicit_fields() {
        let req: ActivateManagerRequestV1 = serde_json::from_str(
            r#"{"months": 6, "amount_minor": 3000, "method": "paypal", "transaction_id": "tx-1"}"#,
        )
        .unwrap();
        assert_eq!(req.months, 6);
        assert_eq!(req.amount_minor, 3000);
        assert_eq!(req.method, PaymentMethod::Paypal);
        assert_eq!(req.transaction_id.as_deref(), Some("tx-1"));
    }

    #[test]
    fn test_manager_response_clamps_days_left() {
        let now = Utc::now();
        let manager = Manager {
            id: Uuid::new_v4(),
            email: "shop@example.com".to_string(),
            display_name: "Shop".to_string(),
            status: ManagerStatus::Expired,
            trial_started_at: now - Duration::days(60),
            trial_ends_at: now - Duration::days(30),
            subscription_started_at: None,
            subscription_ends_at: None,
            dormant: false,
            last_activity_at: now,
            created_at: now,
            updated_at: now,
        };

        let resp = ManagerResponseV1::from(manager);
        assert_eq!(resp.days_left, 0);
        assert!(!resp.is_active);
    }
}
