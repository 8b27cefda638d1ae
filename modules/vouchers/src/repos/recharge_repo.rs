use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Recharge, RechargeMethod};

/// Insert payload for one recharge ledger row
#[derive(Debug, Clone)]
pub struct NewRecharge {
    pub voucher_id: Uuid,
    pub reseller_id: Uuid,
    pub manager_id: Uuid,
    pub amount_minor: i64,
    pub data_added_gb: i32,
    pub commission_minor: i64,
    pub system_fee_minor: i64,
    pub payment_method: RechargeMethod,
    pub notes: Option<String>,
}

/// Windowed totals over completed recharges for one manager
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct ManagerRechargeRollup {
    pub total_recharges: i64,
    pub total_amount_minor: i64,
    pub total_commission_minor: i64,
    pub total_system_fee_minor: i64,
}

/// All-time totals over completed recharges for one reseller
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct ResellerRechargeRollup {
    pub total_recharges: i64,
    pub total_amount_minor: i64,
    pub total_commission_minor: i64,
}

/// Append one ledger row. Written in the same transaction as the voucher
/// reset and the reseller settlement; the ledger is the source of truth the
/// counters can be rebuilt from.
pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    recharge: &NewRecharge,
) -> Result<Recharge, sqlx::Error> {
    sqlx::query_as::<_, Recharge>(
        r#"
        INSERT INTO recharges
            (voucher_id, reseller_id, manager_id, amount_minor, data_added_gb,
             commission_minor, system_fee_minor, payment_method, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING
            id, voucher_id, reseller_id, manager_id, amount_minor, data_added_gb,
            commission_minor, system_fee_minor, payment_method, status, notes, created_at
        "#,
    )
    .bind(recharge.voucher_id)
    .bind(recharge.reseller_id)
    .bind(recharge.manager_id)
    .bind(recharge.amount_minor)
    .bind(recharge.data_added_gb)
    .bind(recharge.commission_minor)
    .bind(recharge.system_fee_minor)
    .bind(recharge.payment_method)
    .bind(&recharge.notes)
    .fetch_one(&mut **tx)
    .await
}

/// Recent recharges, optionally narrowed to one manager or one reseller
pub async fn list_recent(
    pool: &PgPool,
    manager_id: Option<Uuid>,
    reseller_id: Option<Uuid>,
    limit: i64,
) -> Result<Vec<Recharge>, sqlx::Error> {
    sqlx::query_as::<_, Recharge>(
        r#"
        SELECT
            id, voucher_id, reseller_id, manager_id, amount_minor, data_added_gb,
            commission_minor, system_fee_minor, payment_method, status, notes, created_at
        FROM recharges
        WHERE ($1::UUID IS NULL OR manager_id = $1)
          AND ($2::UUID IS NULL OR reseller_id = $2)
        ORDER BY created_at DESC
        LIMIT $3
        "#,
    )
    .bind(manager_id)
    .bind(reseller_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Totals for one manager over completed rows since the given instant.
/// SUM over BIGINT comes back as NUMERIC, hence the casts.
pub async fn rollup_for_manager(
    pool: &PgPool,
    manager_id: Uuid,
    since: DateTime<Utc>,
) -> Result<ManagerRechargeRollup, sqlx::Error> {
    sqlx::query_as::<_, ManagerRechargeRollup>(
        r#"
        SELECT
            COUNT(*) AS total_recharges,
            COALESCE(SUM(amount_minor), 0)::BIGINT AS total_amount_minor,
            COALESCE(SUM(commission_minor), 0)::BIGINT AS total_commission_minor,
            COALESCE(SUM(system_fee_minor), 0)::BIGINT AS total_system_fee_minor
        FROM recharges
        WHERE manager_id = $1
          AND status = 'completed'
          AND created_at >= $2
        "#,
    )
    .bind(manager_id)
    .bind(since)
    .fetch_one(pool)
    .await
}

/// All-time totals for one reseller over completed rows
pub async fn rollup_for_reseller(
    pool: &PgPool,
    reseller_id: Uuid,
) -> Result<ResellerRechargeRollup, sqlx::Error> {
    sqlx::query_as::<_, ResellerRechargeRollup>(
        r#"
        SELECT
            COUNT(*) AS total_recharges,
            COALESCE(SUM(amount_minor), 0)::BIGINT AS total_amount_minor,
            COALESCE(SUM(commission_minor), 0)::BIGINT AS total_commission_minor
        FROM recharges
        WHERE reseller_id = $1
          AND status = 'completed'
        "#,
    )
    .bind(reseller_id)
    .fetch_one(pool)
    .await
}
