//! Activation token flow: generate against a real manager, redeem, and verify
//! the months land as a zero-amount token payment.

mod common;

use common::{cleanup_manager, create_test_manager, get_test_pool};
use serial_test::serial;
use uuid::Uuid;
use vouchers_rs::models::{ManagerStatus, PaymentMethod};
use vouchers_rs::repos::payment_repo;
use vouchers_rs::services::subscription_service::{self, SubscriptionError};
use vouchers_rs::services::token_codec::{self, TokenError};

#[tokio::test]
#[serial]
#[ignore = "requires a provisioned Postgres (DATABASE_URL)"]
async fn test_generate_and_redeem_token_activates_manager() {
    let pool = get_test_pool().await;
    let manager = create_test_manager(&pool, "token-redeem").await;

    let token = subscription_service::generate_token(&pool, manager.id, 3)
        .await
        .expect("Failed to generate token");

    let decoded = token_codec::parse(&token).expect("Generated token should parse");
    assert_eq!(decoded.months, 3);
    assert_eq!(
        decoded.manager_prefix,
        manager.id.simple().to_string()[..8].to_uppercase()
    );

    let redeemed = subscription_service::redeem_token(&pool, &token)
        .await
        .expect("Failed to redeem token");

    assert_eq!(redeemed.id, manager.id);
    assert_eq!(redeemed.status, ManagerStatus::Active);

    let payments = payment_repo::list_for_manager(&pool, manager.id, 10)
        .await
        .expect("Failed to list payments");
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount_minor, 0, "token redemptions carry no amount");
    assert_eq!(payments[0].months, 3);
    assert_eq!(payments[0].method, PaymentMethod::Token);
    assert_eq!(payments[0].transaction_id.as_deref(), Some(token.as_str()));

    cleanup_manager(&pool, manager.id).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a provisioned Postgres (DATABASE_URL)"]
async fn test_generate_token_unknown_manager() {
    let pool = get_test_pool().await;

    let result = subscription_service::generate_token(&pool, Uuid::new_v4(), 1).await;
    assert!(matches!(result, Err(SubscriptionError::NotFound(_))));
}

#[tokio::test]
#[serial]
#[ignore = "requires a provisioned Postgres (DATABASE_URL)"]
async fn test_redeem_token_for_unknown_manager() {
    let pool = get_test_pool().await;

    // Valid layout whose id prefix matches nobody
    let token = token_codec::generate(Uuid::new_v4(), 1).expect("Failed to build token");
    let result = subscription_service::redeem_token(&pool, &token).await;
    assert!(matches!(result, Err(SubscriptionError::NotFound(_))));
}

#[tokio::test]
#[serial]
#[ignore = "requires a provisioned Postgres (DATABASE_URL)"]
async fn test_redeem_rejects_malformed_token() {
    let pool = get_test_pool().await;

    let result = subscription_service::redeem_token(&pool, "VCHR-nope").await;
    assert!(matches!(
        result,
        Err(SubscriptionError::Token(TokenError::InvalidFormat))
    ));
}

#[tokio::test]
#[serial]
#[ignore = "requires a provisioned Postgres (DATABASE_URL)"]
async fn test_generate_token_rejects_out_of_range_months() {
    let pool = get_test_pool().await;
    let manager = create_test_manager(&pool, "token-months").await;

    let result = subscription_service::generate_token(&pool, manager.id, 100).await;
    assert!(matches!(
        result,
        Err(SubscriptionError::Token(TokenError::MonthsOutOfRange(100)))
    ));

    cleanup_manager(&pool, manager.id).await;
}
