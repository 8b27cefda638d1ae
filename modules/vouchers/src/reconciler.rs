//! Time-based reconciliation sweeps
//!
//! Two background loops share this module. The reconciler walks managers and
//! vouchers whose windows have elapsed and flips them to their terminal
//! states, flags dormant managers, and enqueues expiring-soon notices. The
//! cleanup loop purges outbox rows that were published long ago.
//!
//! Every tick takes a Postgres advisory lock first, so running several
//! instances of the module is safe: one does the sweep, the rest skip.

use std::time::Duration;

use chrono::Utc;
use sqlx::postgres::PgPool;

use crate::events;
use crate::models::Manager;
use crate::repos::{manager_repo, outbox_repo, voucher_repo};
use crate::services::stats_service::EXPIRING_SOON_DAYS;
use crate::services::subscription_state;

/// Days without recorded activity before a manager is flagged dormant
pub const INACTIVITY_DAYS: i32 = 30;

/// Published outbox rows older than this are purged
pub const OUTBOX_RETENTION_DAYS: i64 = 7;

// Advisory lock keys, one per loop so cleanup never waits on a sweep
const RECONCILE_LOCK_KEY: i64 = 0x7663_6872_0001;
const CLEANUP_LOCK_KEY: i64 = 0x7663_6872_0002;

/// A held advisory lock bound to one pooled connection.
///
/// Advisory locks are session-scoped, so acquire and release must go through
/// the same connection. Holding the `PoolConnection` here guarantees that.
struct Lease {
    conn: sqlx::pool::PoolConnection<sqlx::Postgres>,
    key: i64,
}

impl Lease {
    async fn try_acquire(pool: &PgPool, key: i64) -> Result<Option<Lease>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(key)
            .fetch_one(&mut *conn)
            .await?;

        if acquired {
            Ok(Some(Lease { conn, key }))
        } else {
            Ok(None)
        }
    }

    async fn release(mut self) {
        // The lock would die with the session anyway; an explicit unlock
        // returns the connection to the pool clean.
        if let Err(e) = sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(self.key)
            .execute(&mut *self.conn)
            .await
        {
            tracing::warn!(key = self.key, "Failed to release advisory lock: {}", e);
        }
    }
}

/// Background task that runs the full reconciliation sweep on an interval.
/// Never returns; spawn it.
pub async fn run_reconciler_task(db: PgPool, interval_secs: u64) {
    tracing::info!(interval_secs, "Starting reconciler task");

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        interval.tick().await;

        match run_reconcile_tick(&db).await {
            Ok(true) => {}
            Ok(false) => tracing::info!("Reconcile tick skipped, lease held elsewhere"),
            Err(e) => tracing::error!("Reconcile tick failed: {}", e),
        }
    }
}

/// One full sweep. Returns false when another instance holds the lease.
pub async fn run_reconcile_tick(db: &PgPool) -> Result<bool, sqlx::Error> {
    let lease = match Lease::try_acquire(db, RECONCILE_LOCK_KEY).await? {
        Some(lease) => lease,
        None => return Ok(false),
    };

    // Each rule is independent; one failing must not starve the others
    if let Err(e) = expire_managers(db).await {
        tracing::error!("Manager expiry sweep failed: {}", e);
    }
    if let Err(e) = expire_vouchers(db).await {
        tracing::error!("Voucher expiry sweep failed: {}", e);
    }
    if let Err(e) = flag_dormant_managers(db).await {
        tracing::error!("Dormancy sweep failed: {}", e);
    }
    if let Err(e) = enqueue_expiring_notices(db).await {
        tracing::error!("Expiring-soon sweep failed: {}", e);
    }

    lease.release().await;
    Ok(true)
}

/// Flip managers whose governing window has elapsed to `expired`, with an
/// outbox event per manager. One small transaction per manager so a single
/// failure never aborts the sweep.
async fn expire_managers(db: &PgPool) -> Result<(), sqlx::Error> {
    let candidates = manager_repo::find_expired_candidates(db).await?;
    if candidates.is_empty() {
        return Ok(());
    }

    tracing::info!(
        candidates = candidates.len(),
        "Expiring managers with elapsed windows"
    );

    let mut expired = 0usize;
    for manager in &candidates {
        match expire_one_manager(db, manager).await {
            Ok(true) => expired += 1,
            // Zero rows means the manager was activated or suspended between
            // the scan and the write. Benign, skip.
            Ok(false) => {}
            Err(e) => {
                tracing::error!(manager_id = %manager.id, "Failed to expire manager: {}", e)
            }
        }
    }

    tracing::info!(expired, "Manager expiry sweep complete");
    Ok(())
}

async fn expire_one_manager(db: &PgPool, manager: &Manager) -> Result<bool, sqlx::Error> {
    let mut tx = db.begin().await?;

    if !manager_repo::mark_expired_guarded_tx(&mut tx, manager.id).await? {
        return Ok(false);
    }

    let window_ended_at =
        subscription_state::governing_window_end(manager).unwrap_or_else(Utc::now);
    events::emit_tx(
        &mut tx,
        events::MANAGER_EXPIRED,
        manager.id,
        events::ManagerExpired {
            previous_status: manager.status,
            window_ended_at,
        },
    )
    .await?;

    tx.commit().await?;
    Ok(true)
}

/// Expire vouchers whose validity window has elapsed. Guarded per code; a
/// voucher recharged between the scan and the write is left alone.
async fn expire_vouchers(db: &PgPool) -> Result<(), sqlx::Error> {
    let codes = voucher_repo::find_expired_codes(db).await?;
    if codes.is_empty() {
        return Ok(());
    }

    let mut expired = 0usize;
    for code in &codes {
        match voucher_repo::expire_guarded(db, code).await {
            Ok(true) => expired += 1,
            Ok(false) => {}
            Err(e) => tracing::error!(code = %code, "Failed to expire voucher: {}", e),
        }
    }

    tracing::info!(expired, scanned = codes.len(), "Voucher expiry sweep complete");
    Ok(())
}

/// Flag managers with no activity for `INACTIVITY_DAYS` as dormant and
/// enqueue a dormancy event for each.
async fn flag_dormant_managers(db: &PgPool) -> Result<(), sqlx::Error> {
    let flagged = manager_repo::flag_dormant(db, INACTIVITY_DAYS).await?;
    if flagged.is_empty() {
        return Ok(());
    }

    tracing::info!(flagged = flagged.len(), "Managers flagged dormant");

    for (manager_id, last_activity_at) in flagged {
        if let Err(e) = events::emit(
            db,
            events::MANAGER_DORMANT,
            manager_id,
            events::ManagerDormant { last_activity_at },
        )
        .await
        {
            tracing::error!(manager_id = %manager_id, "Failed to enqueue dormant event: {}", e);
        }
    }

    Ok(())
}

/// Enqueue expiring-soon notices for managers whose governing window closes
/// within `EXPIRING_SOON_DAYS`. Deduped on manager and window end date, so a
/// daily sweep notifies once per window.
async fn enqueue_expiring_notices(db: &PgPool) -> Result<(), sqlx::Error> {
    let now = Utc::now();
    let expiring = manager_repo::find_expiring_within(db, EXPIRING_SOON_DAYS).await?;
    if expiring.is_empty() {
        return Ok(());
    }

    let mut enqueued = 0usize;
    for manager in &expiring {
        let window_ends_at = match subscription_state::governing_window_end(manager) {
            Some(end) => end,
            None => continue,
        };

        let dedupe_key = format!(
            "expiring-soon:{}:{}",
            manager.id,
            window_ends_at.format("%Y-%m-%d")
        );
        let payload = events::ManagerExpiringSoon {
            email: manager.email.clone(),
            display_name: manager.display_name.clone(),
            window_ends_at,
            days_left: subscription_state::days_left(manager, now),
        };

        match events::emit_deduped(
            db,
            events::MANAGER_EXPIRING_SOON,
            manager.id,
            payload,
            &dedupe_key,
        )
        .await
        {
            Ok(Some(_)) => enqueued += 1,
            // Already enqueued for this window end
            Ok(None) => {}
            Err(e) => {
                tracing::error!(manager_id = %manager.id, "Failed to enqueue expiring notice: {}", e)
            }
        }
    }

    tracing::info!(
        expiring = expiring.len(),
        enqueued,
        "Expiring-soon sweep complete"
    );
    Ok(())
}

/// Background task that purges old published outbox rows on an interval.
/// Never returns; spawn it.
pub async fn run_cleanup_task(db: PgPool, interval_secs: u64) {
    tracing::info!(interval_secs, "Starting outbox cleanup task");

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        interval.tick().await;

        match run_cleanup_tick(&db).await {
            Ok(Some(purged)) if purged > 0 => {
                tracing::info!(purged, "Purged published outbox rows")
            }
            Ok(Some(_)) => {}
            Ok(None) => tracing::info!("Cleanup tick skipped, lease held elsewhere"),
            Err(e) => tracing::error!("Cleanup tick failed: {}", e),
        }
    }
}

/// One cleanup pass. Returns None when another instance holds the lease.
pub async fn run_cleanup_tick(db: &PgPool) -> Result<Option<u64>, sqlx::Error> {
    let lease = match Lease::try_acquire(db, CLEANUP_LOCK_KEY).await? {
        Some(lease) => lease,
        None => return Ok(None),
    };

    let cutoff = Utc::now() - chrono::Duration::days(OUTBOX_RETENTION_DAYS);
    let purged = outbox_repo::purge_published_before(db, cutoff).await;

    // Release before propagating so the lease never leaks on error
    lease.release().await;
    purged.map(Some)
}
