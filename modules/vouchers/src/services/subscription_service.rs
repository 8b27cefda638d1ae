//! Subscription lifecycle business logic
//!
//! Orchestrates manager state transitions over the pure rules in
//! `subscription_state`. Every mutating operation locks the manager row and
//! commits the state change, the payment row and the outbox event together,
//! so a crash can never leave an activation without its payment or event.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::events;
use crate::models::{Manager, ManagerPayment, ManagerStatus, PaymentMethod, PaymentStatus};
use crate::repos::{manager_repo, payment_repo};
use crate::services::subscription_state;
use crate::services::token_codec::{self, TokenError};

/// Trial window granted on signup, in days. `TRIAL_DAYS` overrides.
pub const DEFAULT_TRIAL_DAYS: i64 = 30;

/// Trial length in days, env-tunable for staging environments
pub fn trial_days() -> i64 {
    std::env::var("TRIAL_DAYS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|days| *days > 0)
        .unwrap_or(DEFAULT_TRIAL_DAYS)
}

/// Errors that can occur during subscription operations
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("Manager not found: {0}")]
    NotFound(String),

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("No transition from {status} for manager {id}")]
    AlreadyTerminal { id: Uuid, status: ManagerStatus },

    #[error("Invalid months: {0} (must be at least 1)")]
    InvalidMonths(i32),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for subscription operations
pub type SubscriptionResult<T> = Result<T, SubscriptionError>;

/// Create a manager in trial status with the standard trial window
///
/// Emails are stored lowercased; the unique index works on the normalized
/// form.
pub async fn create_manager(
    pool: &PgPool,
    email: &str,
    display_name: &str,
) -> SubscriptionResult<Manager> {
    let email = email.trim().to_lowercase();
    let trial_ends_at = Utc::now() + chrono::Duration::days(trial_days());

    let manager = manager_repo::create(pool, &email, display_name, trial_ends_at)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                SubscriptionError::EmailTaken(email.clone())
            } else {
                SubscriptionError::Database(e)
            }
        })?;

    tracing::info!(
        manager_id = %manager.id,
        email = %email,
        trial_ends_at = %trial_ends_at,
        "Manager created in trial"
    );

    Ok(manager)
}

/// Activate or extend a manager's subscription and record the payment
///
/// One transaction: lock the row, check the transition, extend the window,
/// flip to active, append a completed payment, enqueue the event. A suspended
/// manager has no edge through here; reinstate first.
pub async fn activate(
    pool: &PgPool,
    manager_id: Uuid,
    months: i32,
    amount_minor: i64,
    method: PaymentMethod,
    transaction_id: Option<&str>,
    notes: Option<&str>,
) -> SubscriptionResult<Manager> {
    if months < 1 {
        return Err(SubscriptionError::InvalidMonths(months));
    }

    let mut tx = pool.begin().await?;

    let manager = manager_repo::lock_by_id_tx(&mut tx, manager_id)
        .await?
        .ok_or_else(|| SubscriptionError::NotFound(manager_id.to_string()))?;

    if !subscription_state::can_activate(manager.status) {
        return Err(SubscriptionError::AlreadyTerminal {
            id: manager_id,
            status: manager.status,
        });
    }

    let now = Utc::now();
    let new_end = subscription_state::extended_end(manager.subscription_ends_at, now, months);

    let updated = manager_repo::update_activation_tx(&mut tx, manager_id, now, new_end).await?;

    payment_repo::insert_tx(
        &mut tx,
        manager_id,
        amount_minor,
        months,
        method,
        PaymentStatus::Completed,
        transaction_id,
        notes,
    )
    .await?;

    events::emit_tx(
        &mut tx,
        events::MANAGER_ACTIVATED,
        manager_id,
        events::ManagerActivated {
            months,
            amount_minor,
            method,
            subscription_ends_at: new_end,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        manager_id = %manager_id,
        months = months,
        subscription_ends_at = %new_end,
        "Subscription activated"
    );

    Ok(updated)
}

/// Suspend a manager. Allowed from any state; suspension outranks expiry.
pub async fn suspend(
    pool: &PgPool,
    manager_id: Uuid,
    reason: Option<&str>,
) -> SubscriptionResult<Manager> {
    let mut tx = pool.begin().await?;

    manager_repo::lock_by_id_tx(&mut tx, manager_id)
        .await?
        .ok_or_else(|| SubscriptionError::NotFound(manager_id.to_string()))?;

    let updated = manager_repo::set_status_tx(&mut tx, manager_id, ManagerStatus::Suspended).await?;

    events::emit_tx(
        &mut tx,
        events::MANAGER_SUSPENDED,
        manager_id,
        events::ManagerSuspended {
            reason: reason.map(String::from),
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(manager_id = %manager_id, "Manager suspended");

    Ok(updated)
}

/// Explicit path out of suspended. Lands on active, trial or expired
/// depending on which window is still open at reinstatement time.
pub async fn reinstate(pool: &PgPool, manager_id: Uuid) -> SubscriptionResult<Manager> {
    let mut tx = pool.begin().await?;

    let manager = manager_repo::lock_by_id_tx(&mut tx, manager_id)
        .await?
        .ok_or_else(|| SubscriptionError::NotFound(manager_id.to_string()))?;

    if manager.status != ManagerStatus::Suspended {
        return Err(SubscriptionError::AlreadyTerminal {
            id: manager_id,
            status: manager.status,
        });
    }

    let status = subscription_state::reinstated_status(&manager, Utc::now());
    let updated = manager_repo::set_status_tx(&mut tx, manager_id, status).await?;

    events::emit_tx(
        &mut tx,
        events::MANAGER_REINSTATED,
        manager_id,
        events::ManagerReinstated { status },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(manager_id = %manager_id, status = %status, "Manager reinstated");

    Ok(updated)
}

/// Generate an activation token for an existing manager
pub async fn generate_token(
    pool: &PgPool,
    manager_id: Uuid,
    months: i32,
) -> SubscriptionResult<String> {
    let manager = manager_repo::find_by_id(pool, manager_id)
        .await?
        .ok_or_else(|| SubscriptionError::NotFound(manager_id.to_string()))?;

    let token = token_codec::generate(manager.id, months)?;

    tracing::info!(manager_id = %manager_id, months = months, "Activation token generated");

    Ok(token)
}

/// Redeem an activation token
///
/// The codec only checks layout; the manager named by the id prefix must
/// exist. Redemption activates with the token's month count at zero amount,
/// keeping the token itself as the payment reference.
pub async fn redeem_token(pool: &PgPool, token: &str) -> SubscriptionResult<Manager> {
    let decoded = token_codec::parse(token)?;

    let manager = manager_repo::find_by_id_prefix(pool, &decoded.manager_prefix)
        .await?
        .ok_or_else(|| SubscriptionError::NotFound(decoded.manager_prefix.clone()))?;

    activate(
        pool,
        manager.id,
        decoded.months,
        0,
        PaymentMethod::Token,
        Some(token),
        Some("Activated via token"),
    )
    .await
}

/// Record a payment without touching subscription state
///
/// Activation records its payment inside its own transaction; this standalone
/// path exists for bookkeeping entries (refunds, pending gateway payments)
/// and never changes status or windows.
pub async fn record_payment(
    pool: &PgPool,
    manager_id: Uuid,
    amount_minor: i64,
    months: i32,
    method: PaymentMethod,
    status: PaymentStatus,
    transaction_id: Option<&str>,
    notes: Option<&str>,
) -> SubscriptionResult<ManagerPayment> {
    let mut tx = pool.begin().await?;

    let payment = payment_repo::insert_tx(
        &mut tx,
        manager_id,
        amount_minor,
        months,
        method,
        status,
        transaction_id,
        notes,
    )
    .await
    .map_err(|e| {
        if e.as_database_error()
            .is_some_and(|db| db.is_foreign_key_violation())
        {
            SubscriptionError::NotFound(manager_id.to_string())
        } else {
            SubscriptionError::Database(e)
        }
    })?;

    tx.commit().await?;

    Ok(payment)
}

/// Record manager activity; clears the dormant flag
pub async fn touch_activity(pool: &PgPool, manager_id: Uuid) -> SubscriptionResult<()> {
    let touched = manager_repo::touch_activity(pool, manager_id).await?;
    if !touched {
        return Err(SubscriptionError::NotFound(manager_id.to_string()));
    }

    Ok(())
}

/// Cascading tenant removal: vouchers, resellers, recharges and payments all
/// go with the manager
pub async fn delete_manager(pool: &PgPool, manager_id: Uuid) -> SubscriptionResult<()> {
    let deleted = manager_repo::delete(pool, manager_id).await?;
    if !deleted {
        return Err(SubscriptionError::NotFound(manager_id.to_string()));
    }

    tracing::info!(manager_id = %manager_id, "Manager deleted with cascade");

    Ok(())
}
