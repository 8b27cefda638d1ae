//! Read-side aggregation: dashboard rollups, revenue buckets and per-manager
//! detail
//!
//! Everything here is derived from the payment and recharge ledgers plus live
//! entity counts. Nothing is cached; the denormalized counters on resellers
//! are not consulted by these queries.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Manager, ManagerStatus, VoucherStatus};
use crate::repos::payment_repo::{self, RevenueBucket, RevenuePeriod};
use crate::repos::recharge_repo::{self, ManagerRechargeRollup};
use crate::repos::{manager_repo, reseller_repo, voucher_repo};
use crate::services::subscription_state;

/// Managers whose window closes within this many days show up on the
/// dashboard's expiring list
pub const EXPIRING_SOON_DAYS: i32 = 3;

const RECENT_MANAGERS: i64 = 5;

/// Errors that can occur during stats queries
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("Manager not found: {0}")]
    ManagerNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Lookback window for recharge rollups. Day means since local midnight UTC;
/// the rest subtract calendar units from now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    Day,
    Week,
    Month,
    Year,
}

impl StatsPeriod {
    pub fn window_start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            StatsPeriod::Day => now.date_naive().and_time(NaiveTime::MIN).and_utc(),
            StatsPeriod::Week => now - chrono::Duration::days(7),
            StatsPeriod::Month => now - chrono::Months::new(1),
            StatsPeriod::Year => now - chrono::Months::new(12),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ManagerCounts {
    pub total: i64,
    pub trial: i64,
    pub active: i64,
    pub expired: i64,
    pub suspended: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecentManager {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub status: ManagerStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExpiringManager {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub status: ManagerStatus,
    pub days_left: i64,
    pub window_ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    pub managers: ManagerCounts,
    pub total_vouchers: i64,
    pub total_resellers: i64,
    pub total_payments: i64,
    pub total_revenue_minor: i64,
    pub recent_managers: Vec<RecentManager>,
    pub expiring_soon_count: i64,
    pub expiring_soon: Vec<ExpiringManager>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct VoucherStatusRollup {
    pub total: i64,
    pub active: i64,
    pub used: i64,
    pub expired: i64,
    pub disabled: i64,
    pub recharged: i64,
}

/// Everything the manager detail page needs in one response
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ManagerDetail {
    pub manager: Manager,
    pub days_left: i64,
    pub is_active: bool,
    pub vouchers: VoucherStatusRollup,
    pub reseller_count: i64,
    pub recharges: ManagerRechargeRollup,
}

pub async fn dashboard(pool: &PgPool) -> Result<DashboardStats, StatsError> {
    let mut managers = ManagerCounts::default();
    for row in manager_repo::count_by_status(pool).await? {
        managers.total += row.count;
        match row.status {
            ManagerStatus::Trial => managers.trial = row.count,
            ManagerStatus::Active => managers.active = row.count,
            ManagerStatus::Expired => managers.expired = row.count,
            ManagerStatus::Suspended => managers.suspended = row.count,
        }
    }

    let total_vouchers = voucher_repo::count_all(pool).await?;
    let total_resellers = reseller_repo::count_all(pool).await?;
    let payments = payment_repo::completed_totals(pool).await?;

    let now = Utc::now();
    let recent_managers = manager_repo::recent(pool, RECENT_MANAGERS)
        .await?
        .into_iter()
        .map(|m| RecentManager {
            id: m.id,
            display_name: m.display_name,
            email: m.email,
            status: m.status,
            created_at: m.created_at,
        })
        .collect();

    let expiring_soon: Vec<ExpiringManager> =
        manager_repo::find_expiring_within(pool, EXPIRING_SOON_DAYS)
            .await?
            .iter()
            .filter_map(|m| {
                let window_ends_at = subscription_state::governing_window_end(m)?;
                Some(ExpiringManager {
                    id: m.id,
                    display_name: m.display_name.clone(),
                    email: m.email.clone(),
                    status: m.status,
                    days_left: subscription_state::days_left(m, now),
                    window_ends_at,
                })
            })
            .collect();

    Ok(DashboardStats {
        managers,
        total_vouchers,
        total_resellers,
        total_payments: payments.total_payments,
        total_revenue_minor: payments.total_revenue_minor,
        recent_managers,
        expiring_soon_count: expiring_soon.len() as i64,
        expiring_soon,
    })
}

/// Bucketed revenue over completed payments
pub async fn revenue_series(
    pool: &PgPool,
    period: RevenuePeriod,
) -> Result<Vec<RevenueBucket>, StatsError> {
    Ok(payment_repo::revenue_series(pool, period).await?)
}

/// Manager plus the rollups the detail view shows
pub async fn manager_detail(
    pool: &PgPool,
    manager_id: Uuid,
    period: StatsPeriod,
) -> Result<ManagerDetail, StatsError> {
    let manager = manager_repo::find_by_id(pool, manager_id)
        .await?
        .ok_or(StatsError::ManagerNotFound(manager_id))?;

    let mut vouchers = VoucherStatusRollup::default();
    for row in voucher_repo::status_counts(pool, manager_id).await? {
        vouchers.total += row.count;
        match row.status {
            VoucherStatus::Active => vouchers.active = row.count,
            VoucherStatus::Used => vouchers.used = row.count,
            VoucherStatus::Expired => vouchers.expired = row.count,
            VoucherStatus::Disabled => vouchers.disabled = row.count,
            VoucherStatus::Recharged => vouchers.recharged = row.count,
        }
    }

    let reseller_count = reseller_repo::count_by_manager(pool, manager_id).await?;

    let now = Utc::now();
    let recharges =
        recharge_repo::rollup_for_manager(pool, manager_id, period.window_start(now)).await?;

    Ok(ManagerDetail {
        days_left: subscription_state::days_left(&manager, now),
        is_active: subscription_state::is_active(&manager, now),
        manager,
        vouchers,
        reseller_count,
        recharges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_window_starts_at_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 14, 30, 0).unwrap();
        let start = StatsPeriod::Day.window_start(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_week_window_is_seven_days() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 14, 30, 0).unwrap();
        let start = StatsPeriod::Week.window_start(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 8, 14, 30, 0).unwrap());
    }

    #[test]
    fn test_month_window_subtracts_calendar_month() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        let start = StatsPeriod::Month.window_start(now);
        // February has no 31st; chrono clamps to the month's last day
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_year_window_subtracts_twelve_months() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let start = StatsPeriod::Year.window_start(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 6, 15, 0, 0, 0).unwrap());
    }
}
