use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ============================================================================
// Status enums (mirror the database enum types)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "manager_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ManagerStatus {
    Trial,
    Active,
    Expired,
    Suspended,
}

impl std::fmt::Display for ManagerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trial => write!(f, "trial"),
            Self::Active => write!(f, "active"),
            Self::Expired => write!(f, "expired"),
            Self::Suspended => write!(f, "suspended"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Manual,
    Paypal,
    Stripe,
    Crypto,
    Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "reseller_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResellerStatus {
    Active,
    Inactive,
    Suspended,
}

impl std::fmt::Display for ResellerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
            Self::Suspended => write!(f, "suspended"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "voucher_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VoucherStatus {
    Active,
    Used,
    Expired,
    Disabled,
    Recharged,
}

impl std::fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Used => write!(f, "used"),
            Self::Expired => write!(f, "expired"),
            Self::Disabled => write!(f, "disabled"),
            Self::Recharged => write!(f, "recharged"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "recharge_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RechargeMethod {
    Cash,
    Transfer,
    MobileMoney,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "recharge_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RechargeStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

// ============================================================================
// Manager
// ============================================================================

/// Tenant record. The subscription window (trial or paid, selected by status)
/// governs whether the manager may operate; `dormant` is an orthogonal
/// activity flag maintained by the reconciler and never replaces `status`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Manager {
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row in the append-only payment ledger.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ManagerPayment {
    pub id: Uuid,
    pub manager_id: Uuid,
    pub amount_minor: i64,
    pub months: i32,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Reseller
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Reseller {
    pub id: Uuid,
    pub manager_id: Uuid,
    pub name: String,
    pub code: String,
    pub balance_minor: i64,
    pub commission_rate: f64,
    pub total_commission_minor: i64,
    pub total_sales: i64,
    pub total_recharges: i64,
    pub total_revenue_minor: i64,
    pub status: ResellerStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Voucher
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Voucher {
    pub id: Uuid,
    pub manager_id: Uuid,
    pub code: String,
    pub profile_name: String,
    pub data_limit_gb: i32,
    pub time_limit_hours: i32,
    pub validity_days: i32,
    pub shelf_id: String,
    pub reseller_id: Option<Uuid>,
    pub status: VoucherStatus,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by_mac: Option<String>,
    pub used_by_ip: Option<String>,
    pub used_by_device: Option<String>,
    pub data_used_mb: i64,
    pub time_used_minutes: i64,
    pub expires_at: DateTime<Utc>,
    pub printed_at: Option<DateTime<Utc>>,
    pub print_count: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Voucher {
    /// Remaining data allowance in MB, clamped at zero.
    pub fn remaining_data_mb(&self) -> i64 {
        (self.data_limit_gb as i64 * 1024 - self.data_used_mb).max(0)
    }

    /// Remaining time allowance in minutes, clamped at zero.
    pub fn remaining_time_minutes(&self) -> i64 {
        (self.time_limit_hours as i64 * 60 - self.time_used_minutes).max(0)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

// ============================================================================
// Recharge
// ============================================================================

/// Immutable top-up ledger entry. References voucher, reseller and manager
/// for fast rollups; the event itself is the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Recharge {
    pub id: Uuid,
    pub voucher_id: Uuid,
    pub reseller_id: Uuid,
    pub manager_id: Uuid,
    pub amount_minor: i64,
    pub data_added_gb: i32,
    pub commission_minor: i64,
    pub system_fee_minor: i64,
    pub payment_method: RechargeMethod,
    pub status: RechargeStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Recharge {
    /// What the manager keeps after reseller commission and the platform fee.
    pub fn net_amount_minor(&self) -> i64 {
        self.amount_minor - self.commission_minor - self.system_fee_minor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voucher_fixture() -> Voucher {
        Voucher {
            id: Uuid::new_v4(),
            manager_id: Uuid::new_v4(),
            code: "ABCD123456".to_string(),
            profile_name: "10GB-30D".to_string(),
            data_limit_gb: 10,
            time_limit_hours: 72,
            validity_days: 30,
            shelf_id: "default".to_string(),
            reseller_id: None,
            status: VoucherStatus::Active,
            used_at: None,
            used_by_mac: None,
            used_by_ip: None,
            used_by_device: None,
            data_used_mb: 0,
            time_used_minutes: 0,
            expires_at: Utc::now() + chrono::Duration::days(30),
            printed_at: None,
            print_count: 0,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_remaining_data_full_allowance() {
        let v = voucher_fixture();
        assert_eq!(v.remaining_data_mb(), 10 * 1024);
    }

    #[test]
    fn test_remaining_data_never_negative() {
        let mut v = voucher_fixture();
        v.data_used_mb = 10 * 1024 + 500;
        assert_eq!(v.remaining_data_mb(), 0);
    }

    #[test]
    fn test_remaining_time_exact_exhaustion() {
        let mut v = voucher_fixture();
        v.time_used_minutes = 72 * 60;
        assert_eq!(v.remaining_time_minutes(), 0);
    }

    #[test]
    fn test_net_amount_subtracts_commission_and_fee() {
        let r = Recharge {
            id: Uuid::new_v4(),
            voucher_id: Uuid::new_v4(),
            reseller_id: Uuid::new_v4(),
            manager_id: Uuid::new_v4(),
            amount_minor: 10_000,
            data_added_gb: 10,
            commission_minor: 1_000,
            system_fee_minor: 250,
            payment_method: RechargeMethod::Cash,
            status: RechargeStatus::Completed,
            notes: None,
            created_at: Utc::now(),
        };
        assert_eq!(r.net_amount_minor(), 8_750);
    }

    #[test]
    fn test_status_serialization_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&ManagerStatus::Trial).unwrap(),
            "\"trial\""
        );
        assert_eq!(
            serde_json::to_string(&RechargeMethod::MobileMoney).unwrap(),
            "\"mobile_money\""
        );
    }
}
