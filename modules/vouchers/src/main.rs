use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use vouchers_rs::{
    config::{BusType, Config},
    events::{run_publisher_task, Bus},
    health::health,
    reconciler::{run_cleanup_task, run_reconciler_task},
    routes::managers::{
        activate_manager, create_manager, delete_manager, get_manager, list_managers,
        reinstate_manager, suspend_manager,
    },
    routes::recharges::{create_recharge, list_recharges},
    routes::resellers::{
        add_balance, create_reseller, deduct_balance, get_reseller, list_resellers,
    },
    routes::stats::{get_dashboard, get_revenue},
    routes::tokens::{generate_token, redeem_token},
    routes::vouchers::{
        create_voucher_batch, disable_voucher, get_voucher, list_vouchers, print_voucher,
        use_voucher,
    },
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting vouchers service...");

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration from environment");

    tracing::info!(
        "Configuration loaded: host={}, port={}, bus_type={:?}",
        config.host,
        config.port,
        config.bus_type
    );

    // Database connection
    tracing::info!("Connecting to database...");
    let pool = vouchers_rs::db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    sqlx::migrate!("./db/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Create event bus
    let bus = match config.bus_type {
        BusType::Nats => {
            let nats_url = config
                .nats_url
                .as_deref()
                .unwrap_or("nats://localhost:4222");
            tracing::info!("Connecting to NATS at {}", nats_url);
            let client = async_nats::connect(nats_url)
                .await
                .expect("Failed to connect to NATS");
            Bus::Nats(client)
        }
        BusType::Log => {
            tracing::info!("Using log event bus");
            Bus::Log
        }
    };

    // Start outbox publisher
    tokio::spawn(run_publisher_task(pool.clone(), bus));

    // Start reconciliation sweeps and outbox cleanup
    tokio::spawn(run_reconciler_task(
        pool.clone(),
        config.reconcile_interval_secs,
    ));
    tokio::spawn(run_cleanup_task(pool.clone(), config.cleanup_interval_secs));

    // Build the application router
    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/managers", post(create_manager).get(list_managers))
        .route(
            "/api/managers/{id}",
            get(get_manager).delete(delete_manager),
        )
        .route("/api/managers/{id}/activate", post(activate_manager))
        .route("/api/managers/{id}/suspend", post(suspend_manager))
        .route("/api/managers/{id}/reinstate", post(reinstate_manager))
        .route("/api/tokens", post(generate_token))
        .route("/api/tokens/redeem", post(redeem_token))
        .route("/api/vouchers", post(create_voucher_batch).get(list_vouchers))
        .route("/api/vouchers/{code}", get(get_voucher))
        .route("/api/vouchers/{code}/use", post(use_voucher))
        .route("/api/vouchers/{code}/print", post(print_voucher))
        .route("/api/vouchers/{code}/disable", post(disable_voucher))
        .route("/api/resellers", post(create_reseller).get(list_resellers))
        .route("/api/resellers/{id}", get(get_reseller))
        .route("/api/resellers/{id}/balance/add", post(add_balance))
        .route("/api/resellers/{id}/balance/deduct", post(deduct_balance))
        .route("/api/recharges", post(create_recharge).get(list_recharges))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/revenue", get(get_revenue))
        .with_state(Arc::new(pool.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    // Bind to the configured address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Vouchers service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    // Start the server
    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
