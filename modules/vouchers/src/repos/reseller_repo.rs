use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Reseller, ResellerStatus};

/// Errors that can occur during reseller repository operations
#[derive(Debug, Error)]
pub enum ResellerError {
    #[error("Reseller not found: {0}")]
    NotFound(Uuid),

    #[error("Reseller is not active: {id} (status={status})")]
    Inactive { id: Uuid, status: ResellerStatus },

    #[error("Insufficient balance: available={available}, requested={requested}")]
    InsufficientBalance { available: i64, requested: i64 },

    #[error("Reseller code already taken: {0}")]
    CodeTaken(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub async fn create(
    pool: &PgPool,
    manager_id: Uuid,
    name: &str,
    code: &str,
    commission_rate: f64,
    initial_balance_minor: i64,
    notes: Option<&str>,
) -> Result<Reseller, ResellerError> {
    let reseller = sqlx::query_as::<_, Reseller>(
        r#"
        INSERT INTO resellers (manager_id, name, code, commission_rate, balance_minor, notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING
            id, manager_id, name, code, balance_minor, commission_rate,
            total_commission_minor, total_sales, total_recharges, total_revenue_minor,
            status, notes, created_at, updated_at
        "#,
    )
    .bind(manager_id)
    .bind(name)
    .bind(code)
    .bind(commission_rate)
    .bind(initial_balance_minor)
    .bind(notes)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if e.as_database_error()
            .is_some_and(|db| db.is_unique_violation())
        {
            ResellerError::CodeTaken(code.to_string())
        } else {
            ResellerError::Database(e)
        }
    })?;

    Ok(reseller)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Reseller>, ResellerError> {
    let reseller = sqlx::query_as::<_, Reseller>(
        r#"
        SELECT
            id, manager_id, name, code, balance_minor, commission_rate,
            total_commission_minor, total_sales, total_recharges, total_revenue_minor,
            status, notes, created_at, updated_at
        FROM resellers
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(reseller)
}

/// Fetch a reseller row with FOR UPDATE to serialize balance writes
pub async fn lock_by_id_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Reseller>, ResellerError> {
    let reseller = sqlx::query_as::<_, Reseller>(
        r#"
        SELECT
            id, manager_id, name, code, balance_minor, commission_rate,
            total_commission_minor, total_sales, total_recharges, total_revenue_minor,
            status, notes, created_at, updated_at
        FROM resellers
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(reseller)
}

/// Ownership-scoped lookup: the reseller must belong to the given manager.
/// Plain sqlx error since this is an existence check, not a balance rule.
pub async fn find_for_manager_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    manager_id: Uuid,
) -> Result<Option<Reseller>, sqlx::Error> {
    sqlx::query_as::<_, Reseller>(
        r#"
        SELECT
            id, manager_id, name, code, balance_minor, commission_rate,
            total_commission_minor, total_sales, total_recharges, total_revenue_minor,
            status, notes, created_at, updated_at
        FROM resellers
        WHERE id = $1 AND manager_id = $2
        "#,
    )
    .bind(id)
    .bind(manager_id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn list_by_manager(
    pool: &PgPool,
    manager_id: Uuid,
    status: Option<ResellerStatus>,
) -> Result<Vec<Reseller>, ResellerError> {
    let resellers = sqlx::query_as::<_, Reseller>(
        r#"
        SELECT
            id, manager_id, name, code, balance_minor, commission_rate,
            total_commission_minor, total_sales, total_recharges, total_revenue_minor,
            status, notes, created_at, updated_at
        FROM resellers
        WHERE manager_id = $1
          AND ($2::reseller_status IS NULL OR status = $2)
        ORDER BY created_at DESC
        "#,
    )
    .bind(manager_id)
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(resellers)
}

pub async fn count_by_manager(pool: &PgPool, manager_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM resellers WHERE manager_id = $1")
        .bind(manager_id)
        .fetch_one(pool)
        .await
}

pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM resellers")
        .fetch_one(pool)
        .await
}

/// Credit a reseller's balance
pub async fn add_balance(pool: &PgPool, id: Uuid, amount: i64) -> Result<Reseller, ResellerError> {
    let updated = sqlx::query_as::<_, Reseller>(
        r#"
        UPDATE resellers
        SET balance_minor = balance_minor + $2, updated_at = NOW()
        WHERE id = $1
        RETURNING
            id, manager_id, name, code, balance_minor, commission_rate,
            total_commission_minor, total_sales, total_recharges, total_revenue_minor,
            status, notes, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(amount)
    .fetch_optional(pool)
    .await?;

    updated.ok_or(ResellerError::NotFound(id))
}

/// Debit a reseller's balance. The balance check lives inside the UPDATE so a
/// concurrent deduction can never drive the balance negative; a failed guard
/// leaves the row untouched.
pub async fn deduct_balance(
    pool: &PgPool,
    id: Uuid,
    amount: i64,
) -> Result<Reseller, ResellerError> {
    let updated = sqlx::query_as::<_, Reseller>(
        r#"
        UPDATE resellers
        SET balance_minor = balance_minor - $2, updated_at = NOW()
        WHERE id = $1 AND status = 'active' AND balance_minor >= $2
        RETURNING
            id, manager_id, name, code, balance_minor, commission_rate,
            total_commission_minor, total_sales, total_recharges, total_revenue_minor,
            status, notes, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(amount)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(reseller) => Ok(reseller),
        None => Err(classify_guard_failure(
            find_by_id(pool, id).await?,
            id,
            amount,
        )),
    }
}

/// Settle a completed recharge against the reseller in one statement: debit
/// the cost, credit commission and revenue, bump the recharge counter.
/// Guarded the same way as `deduct_balance`.
pub async fn apply_recharge_settlement_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    cost_minor: i64,
    commission_minor: i64,
    revenue_minor: i64,
) -> Result<Reseller, ResellerError> {
    let updated = sqlx::query_as::<_, Reseller>(
        r#"
        UPDATE resellers
        SET balance_minor = balance_minor - $2,
            total_commission_minor = total_commission_minor + $3,
            total_recharges = total_recharges + 1,
            total_revenue_minor = total_revenue_minor + $4,
            updated_at = NOW()
        WHERE id = $1 AND status = 'active' AND balance_minor >= $2
        RETURNING
            id, manager_id, name, code, balance_minor, commission_rate,
            total_commission_minor, total_sales, total_recharges, total_revenue_minor,
            status, notes, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(cost_minor)
    .bind(commission_minor)
    .bind(revenue_minor)
    .fetch_optional(&mut **tx)
    .await?;

    match updated {
        Some(reseller) => Ok(reseller),
        None => {
            let current = lock_by_id_tx(tx, id).await?;
            Err(classify_guard_failure(current, id, cost_minor))
        }
    }
}

/// Credit earned commission and the matching revenue
pub async fn add_commission(
    pool: &PgPool,
    id: Uuid,
    amount: i64,
) -> Result<Reseller, ResellerError> {
    let updated = sqlx::query_as::<_, Reseller>(
        r#"
        UPDATE resellers
        SET total_commission_minor = total_commission_minor + $2,
            total_revenue_minor = total_revenue_minor + $2,
            updated_at = NOW()
        WHERE id = $1
        RETURNING
            id, manager_id, name, code, balance_minor, commission_rate,
            total_commission_minor, total_sales, total_recharges, total_revenue_minor,
            status, notes, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(amount)
    .fetch_optional(pool)
    .await?;

    updated.ok_or(ResellerError::NotFound(id))
}

/// Record a completed sale: bumps total_sales and revenue.
/// Kept separate from `record_recharge`; the two counters never mix.
pub async fn record_sale(pool: &PgPool, id: Uuid, amount: i64) -> Result<Reseller, ResellerError> {
    let updated = sqlx::query_as::<_, Reseller>(
        r#"
        UPDATE resellers
        SET total_sales = total_sales + 1,
            total_revenue_minor = total_revenue_minor + $2,
            updated_at = NOW()
        WHERE id = $1
        RETURNING
            id, manager_id, name, code, balance_minor, commission_rate,
            total_commission_minor, total_sales, total_recharges, total_revenue_minor,
            status, notes, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(amount)
    .fetch_optional(pool)
    .await?;

    updated.ok_or(ResellerError::NotFound(id))
}

/// Record a completed recharge outside the settlement statement: bumps
/// total_recharges and revenue
pub async fn record_recharge(
    pool: &PgPool,
    id: Uuid,
    amount: i64,
) -> Result<Reseller, ResellerError> {
    let updated = sqlx::query_as::<_, Reseller>(
        r#"
        UPDATE resellers
        SET total_recharges = total_recharges + 1,
            total_revenue_minor = total_revenue_minor + $2,
            updated_at = NOW()
        WHERE id = $1
        RETURNING
            id, manager_id, name, code, balance_minor, commission_rate,
            total_commission_minor, total_sales, total_recharges, total_revenue_minor,
            status, notes, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(amount)
    .fetch_optional(pool)
    .await?;

    updated.ok_or(ResellerError::NotFound(id))
}

/// A guarded balance UPDATE matched zero rows; work out which invariant
/// stopped it from the current row state.
fn classify_guard_failure(current: Option<Reseller>, id: Uuid, requested: i64) -> ResellerError {
    match current {
        None => ResellerError::NotFound(id),
        Some(r) if r.status != ResellerStatus::Active => ResellerError::Inactive {
            id,
            status: r.status,
        },
        Some(r) => ResellerError::InsufficientBalance {
            available: r.balance_minor,
            requested,
        },
    }
}
