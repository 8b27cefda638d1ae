//! Dashboard and detail rollup tests. Assertions are written as deltas
//! against a snapshot taken before the test data lands, so leftover rows
//! from other runs never skew them.

mod common;

use chrono::Utc;
use common::{cleanup_manager, create_test_manager, create_test_reseller, get_test_pool};
use serial_test::serial;
use uuid::Uuid;
use vouchers_rs::models::PaymentMethod;
use vouchers_rs::repos::payment_repo::RevenuePeriod;
use vouchers_rs::services::stats_service::{self, StatsError, StatsPeriod};
use vouchers_rs::services::subscription_service;
use vouchers_rs::services::voucher_service::{self, VoucherBatch};

#[tokio::test]
#[serial]
#[ignore = "requires a provisioned Postgres (DATABASE_URL)"]
async fn test_dashboard_reflects_new_manager_and_revenue() {
    let pool = get_test_pool().await;

    let before = stats_service::dashboard(&pool)
        .await
        .expect("Failed to load dashboard");

    let manager = create_test_manager(&pool, "dash").await;
    subscription_service::activate(&pool, manager.id, 1, 750, PaymentMethod::Manual, None, None)
        .await
        .expect("Failed to activate");

    let after = stats_service::dashboard(&pool)
        .await
        .expect("Failed to reload dashboard");

    assert_eq!(after.managers.total, before.managers.total + 1);
    assert_eq!(after.managers.active, before.managers.active + 1);
    assert_eq!(after.total_payments, before.total_payments + 1);
    assert_eq!(after.total_revenue_minor, before.total_revenue_minor + 750);

    // A manager created seconds ago must show in the recent list
    assert!(
        after.recent_managers.iter().any(|m| m.id == manager.id),
        "freshly created manager should be in recent_managers"
    );

    cleanup_manager(&pool, manager.id).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a provisioned Postgres (DATABASE_URL)"]
async fn test_dashboard_surfaces_expiring_managers() {
    let pool = get_test_pool().await;
    let manager = create_test_manager(&pool, "dash-expiring").await;

    sqlx::query("UPDATE managers SET trial_ends_at = NOW() + INTERVAL '1 day' WHERE id = $1")
        .bind(manager.id)
        .execute(&pool)
        .await
        .expect("Failed to shorten trial window");

    let dashboard = stats_service::dashboard(&pool)
        .await
        .expect("Failed to load dashboard");

    let entry = dashboard
        .expiring_soon
        .iter()
        .find(|m| m.id == manager.id)
        .expect("Manager closing within the notice window should be listed");
    assert!(entry.days_left <= 1);
    assert!(dashboard.expiring_soon_count >= 1);

    cleanup_manager(&pool, manager.id).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a provisioned Postgres (DATABASE_URL)"]
async fn test_manager_detail_rolls_up_vouchers_and_resellers() {
    let pool = get_test_pool().await;
    let manager = create_test_manager(&pool, "detail").await;
    create_test_reseller(&pool, manager.id, 0.10, 0).await;

    let vouchers = voucher_service::create_batch(
        &pool,
        manager.id,
        &VoucherBatch {
            count: 3,
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

    voucher_service::mark_used(&pool, &vouchers[0].code, Some("AA:BB:CC:DD:EE:FF"), None, None)
        .await
        .expect("Failed to mark voucher used");

    let detail = stats_service::manager_detail(&pool, manager.id, StatsPeriod::Month)
        .await
        .expect("Failed to load manager detail");

    assert_eq!(detail.manager.id, manager.id);
    assert!(detail.is_active, "open trial window counts as active");
    assert!(detail.days_left > 0);
    assert_eq!(detail.vouchers.total, 3);
    assert_eq!(detail.vouchers.active, 2);
    assert_eq!(detail.vouchers.used, 1);
    assert_eq!(detail.reseller_count, 1);
    assert_eq!(detail.recharges.total_recharges, 0);

    cleanup_manager(&pool, manager.id).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a provisioned Postgres (DATABASE_URL)"]
async fn test_manager_detail_unknown_manager() {
    let pool = get_test_pool().await;

    let result = stats_service::manager_detail(&pool, Uuid::new_v4(), StatsPeriod::Week).await;
    assert!(matches!(result, Err(StatsError::ManagerNotFound(_))));
}

#[tokio::test]
#[serial]
#[ignore = "requires a provisioned Postgres (DATABASE_URL)"]
async fn test_revenue_series_buckets_todays_payments() {
    let pool = get_test_pool().await;

    let sum_today = |series: &[vouchers_rs::repos::payment_repo::RevenueBucket]| {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        series
            .iter()
            .find(|b| b.bucket == today)
            .map(|b| b.total_minor)
            .unwrap_or(0)
    };

    let before = stats_service::revenue_series(&pool, RevenuePeriod::Day)
        .await
        .expect("Failed to load revenue series");

    let manager = create_test_manager(&pool, "revenue").await;
    subscription_service::activate(&pool, manager.id, 1, 1234, PaymentMethod::Crypto, None, None)
        .await
        .expect("Failed to activate");

    let after = stats_service::revenue_series(&pool, RevenuePeriod::Day)
        .await
        .expect("Failed to reload revenue series");

    assert_eq!(
        sum_today(&after),
        sum_today(&before) + 1234,
        "today's bucket should grow by the completed payment"
    );

    cleanup_manager(&pool, manager.id).await;
}
