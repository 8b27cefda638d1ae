use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{Voucher, VoucherStatus};

/// Insert payload for one voucher of a batch
#[derive(Debug, Clone)]
pub struct NewVoucher {
    pub code: String,
    pub profile_name: String,
    pub data_limit_gb: i32,
    pub time_limit_hours: i32,
    pub validity_days: i32,
    pub shelf_id: String,
    pub reseller_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Per-status row count for one manager
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VoucherStatusCount {
    pub status: VoucherStatus,
    pub count: i64,
}

/// Insert a voucher. expires_at is stamped from validity_days at insert time.
pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    manager_id: Uuid,
    voucher: &NewVoucher,
) -> Result<Voucher, sqlx::Error> {
    sqlx::query_as::<_, Voucher>(
        r#"
        INSERT INTO vouchers
            (manager_id, code, profile_name, data_limit_gb, time_limit_hours,
             validity_days, shelf_id, reseller_id, expires_at, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW() + make_interval(days => $6), $9)
        RETURNING
            id, manager_id, code, profile_name, data_limit_gb, time_limit_hours,
            validity_days, shelf_id, reseller_id, status, used_at, used_by_mac,
            used_by_ip, used_by_device, data_used_mb, time_used_minutes,
            expires_at, printed_at, print_count, notes, created_at, updated_at
        "#,
    )
    .bind(manager_id)
    .bind(&voucher.code)
    .bind(&voucher.profile_name)
    .bind(voucher.data_limit_gb)
    .bind(voucher.time_limit_hours)
    .bind(voucher.validity_days)
    .bind(&voucher.shelf_id)
    .bind(voucher.reseller_id)
    .bind(&voucher.notes)
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Voucher>, sqlx::Error> {
    sqlx::query_as::<_, Voucher>(
        r#"
        SELECT
            id, manager_id, code, profile_name, data_limit_gb, time_limit_hours,
            validity_days, shelf_id, reseller_id, status, used_at, used_by_mac,
            used_by_ip, used_by_device, data_used_mb, time_used_minutes,
            expires_at, printed_at, print_count, notes, created_at, updated_at
        FROM vouchers
        WHERE code = $1
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await
}

/// Fetch a voucher row with FOR UPDATE to serialize the recharge transaction
pub async fn lock_by_code_tx(
    tx: &mut Transaction<'_, Postgres>,
    code: &str,
) -> Result<Option<Voucher>, sqlx::Error> {
    sqlx::query_as::<_, Voucher>(
        r#"
        SELECT
            id, manager_id, code, profile_name, data_limit_gb, time_limit_hours,
            validity_days, shelf_id, reseller_id, status, used_at, used_by_mac,
            used_by_ip, used_by_device, data_used_mb, time_used_minutes,
            expires_at, printed_at, print_count, notes, created_at, updated_at
        FROM vouchers
        WHERE code = $1
        FOR UPDATE
        "#,
    )
    .bind(code)
    .fetch_optional(&mut **tx)
    .await
}

/// List a manager's vouchers with optional status, shelf and reseller filters
pub async fn list(
    pool: &PgPool,
    manager_id: Uuid,
    status: Option<VoucherStatus>,
    shelf_id: Option<&str>,
    reseller_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Voucher>, sqlx::Error> {
    sqlx::query_as::<_, Voucher>(
        r#"
        SELECT
            id, manager_id, code, profile_name, data_limit_gb, time_limit_hours,
            validity_days, shelf_id, reseller_id, status, used_at, used_by_mac,
            used_by_ip, used_by_device, data_used_mb, time_used_minutes,
            expires_at, printed_at, print_count, notes, created_at, updated_at
        FROM vouchers
        WHERE manager_id = $1
          AND ($2::voucher_status IS NULL OR status = $2)
          AND ($3::TEXT IS NULL OR shelf_id = $3)
          AND ($4::UUID IS NULL OR reseller_id = $4)
        ORDER BY created_at DESC
        LIMIT $5 OFFSET $6
        "#,
    )
    .bind(manager_id)
    .bind(status)
    .bind(shelf_id)
    .bind(reseller_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Stamp a voucher as used by a device. Deliberately unguarded: a repeat call
/// overwrites the previous device stamp, matching captive-portal retries.
pub async fn mark_used(
    pool: &PgPool,
    code: &str,
    mac: Option<&str>,
    ip: Option<&str>,
    device: Option<&str>,
) -> Result<Option<Voucher>, sqlx::Error> {
    sqlx::query_as::<_, Voucher>(
        r#"
        UPDATE vouchers
        SET status = 'used',
            used_at = NOW(),
            used_by_mac = $2,
            used_by_ip = $3,
            used_by_device = $4,
            updated_at = NOW()
        WHERE code = $1
        RETURNING
            id, manager_id, code, profile_name, data_limit_gb, time_limit_hours,
            validity_days, shelf_id, reseller_id, status, used_at, used_by_mac,
            used_by_ip, used_by_device, data_used_mb, time_used_minutes,
            expires_at, printed_at, print_count, notes, created_at, updated_at
        "#,
    )
    .bind(code)
    .bind(mac)
    .bind(ip)
    .bind(device)
    .fetch_optional(pool)
    .await
}

/// Record a print run. Status is untouched so reprints are always allowed.
pub async fn mark_printed(pool: &PgPool, code: &str) -> Result<Option<Voucher>, sqlx::Error> {
    sqlx::query_as::<_, Voucher>(
        r#"
        UPDATE vouchers
        SET printed_at = NOW(),
            print_count = print_count + 1,
            updated_at = NOW()
        WHERE code = $1
        RETURNING
            id, manager_id, code, profile_name, data_limit_gb, time_limit_hours,
            validity_days, shelf_id, reseller_id, status, used_at, used_by_mac,
            used_by_ip, used_by_device, data_used_mb, time_used_minutes,
            expires_at, printed_at, print_count, notes, created_at, updated_at
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await
}

/// Manual disable, only valid from active. Zero rows means the code is either
/// unknown or not in a disableable status; the caller disambiguates.
pub async fn disable_guarded(pool: &PgPool, code: &str) -> Result<Option<Voucher>, sqlx::Error> {
    sqlx::query_as::<_, Voucher>(
        r#"
        UPDATE vouchers
        SET status = 'disabled', updated_at = NOW()
        WHERE code = $1 AND status = 'active'
        RETURNING
            id, manager_id, code, profile_name, data_limit_gb, time_limit_hours,
            validity_days, shelf_id, reseller_id, status, used_at, used_by_mac,
            used_by_ip, used_by_device, data_used_mb, time_used_minutes,
            expires_at, printed_at, print_count, notes, created_at, updated_at
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await
}

/// Reset a voucher for a completed recharge: usage back to zero, validity
/// window restarted from now. Device stamps stay as audit trail.
pub async fn recharge_reset_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Voucher, sqlx::Error> {
    sqlx::query_as::<_, Voucher>(
        r#"
        UPDATE vouchers
        SET status = 'recharged',
            data_used_mb = 0,
            time_used_minutes = 0,
            expires_at = NOW() + make_interval(days => validity_days),
            updated_at = NOW()
        WHERE id = $1
        RETURNING
            id, manager_id, code, profile_name, data_limit_gb, time_limit_hours,
            validity_days, shelf_id, reseller_id, status, used_at, used_by_mac,
            used_by_ip, used_by_device, data_used_mb, time_used_minutes,
            expires_at, printed_at, print_count, notes, created_at, updated_at
        "#,
    )
    .bind(id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn status_counts(
    pool: &PgPool,
    manager_id: Uuid,
) -> Result<Vec<VoucherStatusCount>, sqlx::Error> {
    sqlx::query_as::<_, VoucherStatusCount>(
        r#"
        SELECT status, COUNT(*) AS count
        FROM vouchers
        WHERE manager_id = $1
        GROUP BY status
        "#,
    )
    .bind(manager_id)
    .fetch_all(pool)
    .await
}

pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vouchers")
        .fetch_one(pool)
        .await
}

/// Codes of vouchers whose validity window has elapsed but whose status has
/// not caught up yet
pub async fn find_expired_codes(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT code
        FROM vouchers
        WHERE status IN ('active', 'used', 'recharged')
          AND expires_at <= NOW()
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Flip one due voucher to expired, re-checking the window inside the UPDATE
/// so a concurrent recharge is never clobbered
pub async fn expire_guarded(pool: &PgPool, code: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE vouchers
        SET status = 'expired', updated_at = NOW()
        WHERE code = $1
          AND status IN ('active', 'used', 'recharged')
          AND expires_at <= NOW()
        "#,
    )
    .bind(code)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
