//! Reconciliation sweep tests: expiry, dormancy flagging, expiring-soon
//! dedupe and outbox cleanup, driven through single ticks.

mod common;

use common::{cleanup_manager, count_events, create_test_manager, get_test_pool};
use serial_test::serial;
use vouchers_rs::events;
use vouchers_rs::models::{ManagerStatus, VoucherStatus};
use vouchers_rs::reconciler;
use vouchers_rs::repos::{manager_repo, outbox_repo};
use vouchers_rs::services::subscription_service;
use vouchers_rs::services::voucher_service::{self, VoucherBatch};

#[tokio::test]
#[serial]
#[ignore = "requires a provisioned Postgres (DATABASE_URL)"]
async fn test_tick_expires_managers_with_elapsed_windows() {
    let pool = get_test_pool().await;
    let manager = create_test_manager(&pool, "sweep-expire").await;

    sqlx::query("UPDATE managers SET trial_ends_at = NOW() - INTERVAL '2 days' WHERE id = $1")
        .bind(manager.id)
        .execute(&pool)
        .await
        .expect("Failed to backdate trial window");

    let ran = reconciler::run_reconcile_tick(&pool)
        .await
        .expect("Tick failed");
    assert!(ran, "tick should acquire the lease");

    let expired = manager_repo::find_by_id(&pool, manager.id)
        .await
        .expect("Failed to fetch manager")
        .expect("Manager should exist");
    assert_eq!(expired.status, ManagerStatus::Expired);
    assert_eq!(
        count_events(&pool, events::MANAGER_EXPIRED, manager.id).await,
        1
    );

    cleanup_manager(&pool, manager.id).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a provisioned Postgres (DATABASE_URL)"]
async fn test_tick_leaves_open_windows_alone() {
    let pool = get_test_pool().await;
    let manager = create_test_manager(&pool, "sweep-open").await;

    reconciler::run_reconcile_tick(&pool)
        .await
        .expect("Tick failed");

    let untouched = manager_repo::find_by_id(&pool, manager.id)
        .await
        .expect("Failed to fetch manager")
        .expect("Manager should exist");
    assert_eq!(untouched.status, ManagerStatus::Trial);
    assert_eq!(
        count_events(&pool, events::MANAGER_EXPIRED, manager.id).await,
        0
    );

    cleanup_manager(&pool, manager.id).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a provisioned Postgres (DATABASE_URL)"]
async fn test_tick_expires_vouchers_past_their_window() {
    let pool = get_test_pool().await;
    let manager = create_test_manager(&pool, "sweep-vouchers").await;

    voucher_service::create_batch(
        &pool,
        manager.id,
        &VoucherBatch {
            count: 2,
            profile_name: "daily-5gb".to_string(),
            data_limit_gb: 5,
            time_limit_hours: 24,
            validity_days: 30,
            shelf_id: None,
            reseller_id: None,
            notes: None,
        },
    )
    .await
    .expect("Failed to create vouchers");

    sqlx::query("UPDATE vouchers SET expires_at = NOW() - INTERVAL '1 day' WHERE manager_id = $1")
        .bind(manager.id)
        .execute(&pool)
        .await
        .expect("Failed to backdate vouchers");

    reconciler::run_reconcile_tick(&pool)
        .await
        .expect("Tick failed");

    let expired: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM vouchers WHERE manager_id = $1 AND status = 'expired'",
    )
    .bind(manager.id)
    .fetch_one(&pool)
    .await
    .expect("Failed to count vouchers");
    assert_eq!(expired, 2);

    cleanup_manager(&pool, manager.id).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a provisioned Postgres (DATABASE_URL)"]
async fn test_tick_flags_dormant_managers_once() {
    let pool = get_test_pool().await;
    let manager = create_test_manager(&pool, "sweep-dormant").await;

    sqlx::query("UPDATE managers SET last_activity_at = NOW() - INTERVAL '40 days' WHERE id = $1")
        .bind(manager.id)
        .execute(&pool)
        .await
        .expect("Failed to backdate activity");

    reconciler::run_reconcile_tick(&pool)
        .await
        .expect("Tick failed");

    let flagged = manager_repo::find_by_id(&pool, manager.id)
        .await
        .expect("Failed to fetch manager")
        .expect("Manager should exist");
    assert!(flagged.dormant);
    assert_eq!(
        count_events(&pool, events::MANAGER_DORMANT, manager.id).await,
        1
    );

    // Already-dormant managers are not re-flagged on the next sweep
    reconciler::run_reconcile_tick(&pool)
        .await
        .expect("Second tick failed");
    assert_eq!(
        count_events(&pool, events::MANAGER_DORMANT, manager.id).await,
        1
    );

    // Activity clears the flag
    subscription_service::touch_activity(&pool, manager.id)
        .await
        .expect("Failed to touch activity");
    let cleared = manager_repo::find_by_id(&pool, manager.id)
        .await
        .expect("Failed to fetch manager")
        .expect("Manager should exist");
    assert!(!cleared.dormant);

    cleanup_manager(&pool, manager.id).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a provisioned Postgres (DATABASE_URL)"]
async fn test_tick_enqueues_expiring_notice_once_per_window() {
    let pool = get_test_pool().await;
    let manager = create_test_manager(&pool, "sweep-notice").await;

    sqlx::query("UPDATE managers SET trial_ends_at = NOW() + INTERVAL '1 day' WHERE id = $1")
        .bind(manager.id)
        .execute(&pool)
        .await
        .expect("Failed to shorten trial window");

    reconciler::run_reconcile_tick(&pool)
        .await
        .expect("Tick failed");
    assert_eq!(
        count_events(&pool, events::MANAGER_EXPIRING_SOON, manager.id).await,
        1
    );

    // Same window end, so the dedupe key suppresses a second notice
    reconciler::run_reconcile_tick(&pool)
        .await
        .expect("Second tick failed");
    assert_eq!(
        count_events(&pool, events::MANAGER_EXPIRING_SOON, manager.id).await,
        1
    );

    cleanup_manager(&pool, manager.id).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a provisioned Postgres (DATABASE_URL)"]
async fn test_cleanup_tick_purges_only_old_published_rows() {
    let pool = get_test_pool().await;

    let old_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO events_outbox (event_type, payload, created_at, published_at)
        VALUES ('manager.activated', '{}'::JSONB, NOW() - INTERVAL '9 days', NOW() - INTERVAL '8 days')
        RETURNING id
        "#,
    )
    .fetch_one(&pool)
    .await
    .expect("Failed to insert old published row");

    let fresh_id = outbox_repo::enqueue(&pool, "manager.activated", serde_json::json!({}))
        .await
        .expect("Failed to enqueue fresh row");

    let purged = reconciler::run_cleanup_tick(&pool)
        .await
        .expect("Cleanup tick failed")
        .expect("Lease should be free");
    assert!(purged >= 1, "the old published row should be purged");

    let old_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events_outbox WHERE id = $1)")
            .bind(old_id)
            .fetch_one(&pool)
            .await
            .expect("Failed to check old row");
    assert!(!old_exists);

    let fresh_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events_outbox WHERE id = $1)")
            .bind(fresh_id)
            .fetch_one(&pool)
            .await
            .expect("Failed to check fresh row");
    assert!(fresh_exists, "unpublished rows survive cleanup");

    sqlx::query("DELETE FROM events_outbox WHERE id = $1")
        .bind(fresh_id)
        .execute(&pool)
        .await
        .expect("Failed to clean up probe row");
}
