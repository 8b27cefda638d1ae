use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{Manager, ManagerStatus};

/// Per-status row count, used by the dashboard rollup
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ManagerStatusCount {
    pub status: ManagerStatus,
    pub count: i64,
}

/// Insert a new manager in trial status
/// A unique violation on email surfaces as sqlx::Error for the service to map
pub async fn create(
    pool: &PgPool,
    email: &str,
    display_name: &str,
    trial_ends_at: DateTime<Utc>,
) -> Result<Manager, sqlx::Error> {
    sqlx::query_as::<_, Manager>(
        r#"
        INSERT INTO managers (email, display_name, trial_ends_at)
        VALUES ($1, $2, $3)
        RETURNING
            id, email, display_name, status, trial_started_at, trial_ends_at,
            subscription_started_at, subscription_ends_at, dormant, last_activity_at,
            created_at, updated_at
        "#,
    )
    .bind(email)
    .bind(display_name)
    .bind(trial_ends_at)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Manager>, sqlx::Error> {
    sqlx::query_as::<_, Manager>(
        r#"
        SELECT
            id, email, display_name, status, trial_started_at, trial_ends_at,
            subscription_started_at, subscription_ends_at, dormant, last_activity_at,
            created_at, updated_at
        FROM managers
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Find a manager whose id starts with the given 8-char hex prefix.
/// The prefix comes from an activation token; uuid text renders lower-case,
/// so the caller's prefix is lower-cased before matching.
pub async fn find_by_id_prefix(
    pool: &PgPool,
    prefix: &str,
) -> Result<Option<Manager>, sqlx::Error> {
    sqlx::query_as::<_, Manager>(
        r#"
        SELECT
            id, email, display_name, status, trial_started_at, trial_ends_at,
            subscription_started_at, subscription_ends_at, dormant, last_activity_at,
            created_at, updated_at
        FROM managers
        WHERE id::TEXT LIKE $1 || '%'
        "#,
    )
    .bind(prefix.to_lowercase())
    .fetch_optional(pool)
    .await
}

/// Fetch a manager row with FOR UPDATE to serialize concurrent lifecycle writes
pub async fn lock_by_id_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Manager>, sqlx::Error> {
    sqlx::query_as::<_, Manager>(
        r#"
        SELECT
            id, email, display_name, status, trial_started_at, trial_ends_at,
            subscription_started_at, subscription_ends_at, dormant, last_activity_at,
            created_at, updated_at
        FROM managers
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

/// List managers with optional status and search filters, newest first
pub async fn list(
    pool: &PgPool,
    status: Option<ManagerStatus>,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Manager>, sqlx::Error> {
    sqlx::query_as::<_, Manager>(
        r#"
        SELECT
            id, email, display_name, status, trial_started_at, trial_ends_at,
            subscription_started_at, subscription_ends_at, dormant, last_activity_at,
            created_at, updated_at
        FROM managers
        WHERE ($1::manager_status IS NULL OR status = $1)
          AND ($2::TEXT IS NULL
               OR display_name ILIKE '%' || $2 || '%'
               OR email ILIKE '%' || $2 || '%')
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(status)
    .bind(search)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Total row count for the same filters as `list`, for pagination
pub async fn count(
    pool: &PgPool,
    status: Option<ManagerStatus>,
    search: Option<&str>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM managers
        WHERE ($1::manager_status IS NULL OR status = $1)
          AND ($2::TEXT IS NULL
               OR display_name ILIKE '%' || $2 || '%'
               OR email ILIKE '%' || $2 || '%')
        "#,
    )
    .bind(status)
    .bind(search)
    .fetch_one(pool)
    .await
}

pub async fn count_by_status(pool: &PgPool) -> Result<Vec<ManagerStatusCount>, sqlx::Error> {
    sqlx::query_as::<_, ManagerStatusCount>(
        r#"
        SELECT status, COUNT(*) AS count
        FROM managers
        GROUP BY status
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<Manager>, sqlx::Error> {
    sqlx::query_as::<_, Manager>(
        r#"
        SELECT
            id, email, display_name, status, trial_started_at, trial_ends_at,
            subscription_started_at, subscription_ends_at, dormant, last_activity_at,
            created_at, updated_at
        FROM managers
        ORDER BY created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Managers whose governing window closes within the next `days` days.
/// Trial managers are judged on trial_ends_at, everyone else on
/// subscription_ends_at; rows with no open window never match.
pub async fn find_expiring_within(
    pool: &PgPool,
    days: i32,
) -> Result<Vec<Manager>, sqlx::Error> {
    sqlx::query_as::<_, Manager>(
        r#"
        SELECT
            id, email, display_name, status, trial_started_at, trial_ends_at,
            subscription_started_at, subscription_ends_at, dormant, last_activity_at,
            created_at, updated_at
        FROM managers
        WHERE status IN ('trial', 'active')
          AND CASE WHEN status = 'trial' THEN trial_ends_at ELSE subscription_ends_at END > NOW()
          AND CASE WHEN status = 'trial' THEN trial_ends_at ELSE subscription_ends_at END
              <= NOW() + make_interval(days => $1)
        ORDER BY CASE WHEN status = 'trial' THEN trial_ends_at ELSE subscription_ends_at END ASC
        "#,
    )
    .bind(days)
    .fetch_all(pool)
    .await
}

/// Managers whose governing window has already closed but whose status has
/// not caught up yet
pub async fn find_expired_candidates(pool: &PgPool) -> Result<Vec<Manager>, sqlx::Error> {
    sqlx::query_as::<_, Manager>(
        r#"
        SELECT
            id, email, display_name, status, trial_started_at, trial_ends_at,
            subscription_started_at, subscription_ends_at, dormant, last_activity_at,
            created_at, updated_at
        FROM managers
        WHERE status IN ('trial', 'active')
          AND CASE WHEN status = 'trial' THEN trial_ends_at ELSE subscription_ends_at END <= NOW()
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Flip one manager to expired, re-checking the window inside the UPDATE so a
/// concurrent activation between sweep and write is never clobbered.
/// Returns false when the guard no longer matches.
pub async fn mark_expired_guarded_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE managers
        SET status = 'expired', updated_at = NOW()
        WHERE id = $1
          AND status IN ('trial', 'active')
          AND CASE WHEN status = 'trial' THEN trial_ends_at ELSE subscription_ends_at END <= NOW()
        "#,
    )
    .bind(id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Flag operating managers with no recorded activity for `inactive_days` as
/// dormant. Returns the newly flagged ids with their stale activity stamps.
pub async fn flag_dormant(
    pool: &PgPool,
    inactive_days: i32,
) -> Result<Vec<(Uuid, DateTime<Utc>)>, sqlx::Error> {
    sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
        r#"
        UPDATE managers
        SET dormant = TRUE, updated_at = NOW()
        WHERE dormant = FALSE
          AND status IN ('trial', 'active')
          AND last_activity_at < NOW() - make_interval(days => $1)
        RETURNING id, last_activity_at
        "#,
    )
    .bind(inactive_days)
    .fetch_all(pool)
    .await
}

/// Apply an activation: set active status and the new subscription window.
/// subscription_started_at is only stamped the first time.
pub async fn update_activation_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    started_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> Result<Manager, sqlx::Error> {
    sqlx::query_as::<_, Manager>(
        r#"
        UPDATE managers
        SET status = 'active',
            subscription_started_at = COALESCE(subscription_started_at, $2),
            subscription_ends_at = $3,
            updated_at = NOW()
        WHERE id = $1
        RETURNING
            id, email, display_name, status, trial_started_at, trial_ends_at,
            subscription_started_at, subscription_ends_at, dormant, last_activity_at,
            created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(started_at)
    .bind(ends_at)
    .fetch_one(&mut **tx)
    .await
}

pub async fn set_status_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    status: ManagerStatus,
) -> Result<Manager, sqlx::Error> {
    sqlx::query_as::<_, Manager>(
        r#"
        UPDATE managers
        SET status = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING
            id, email, display_name, status, trial_started_at, trial_ends_at,
            subscription_started_at, subscription_ends_at, dormant, last_activity_at,
            created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(status)
    .fetch_one(&mut **tx)
    .await
}

/// Record manager activity. Activity clears the dormant flag.
pub async fn touch_activity(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE managers
        SET last_activity_at = NOW(), dormant = FALSE, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Record manager activity within a transaction
pub async fn touch_activity_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE managers
        SET last_activity_at = NOW(), dormant = FALSE, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Delete a manager and, via FK cascade, all vouchers, resellers, recharges
/// and payments under it
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM managers WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}
