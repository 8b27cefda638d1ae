//! Outbound domain events
//!
//! Every lifecycle transition that other systems care about is written to the
//! transactional outbox alongside the state change and drained to the bus by
//! the background publisher. Payload structs here are the wire contract;
//! manager scoping lives on the envelope, not in the payloads.

pub mod bus;
pub mod publisher;

pub use bus::Bus;
pub use publisher::run_publisher_task;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{ManagerStatus, PaymentMethod};
use crate::repos::outbox_repo;

// Event types. The publisher maps these onto vouchers.events.* subjects.
pub const MANAGER_ACTIVATED: &str = "manager.activated";
pub const MANAGER_SUSPENDED: &str = "manager.suspended";
pub const MANAGER_REINSTATED: &str = "manager.reinstated";
pub const MANAGER_EXPIRED: &str = "manager.expired";
pub const MANAGER_EXPIRING_SOON: &str = "manager.expiring_soon";
pub const MANAGER_DORMANT: &str = "manager.dormant";
pub const VOUCHER_RECHARGED: &str = "voucher.recharged";

/// Standard event envelope wrapping every published payload
///
/// The manager is the tenant dimension of this service, so it rides on the
/// envelope for routing and isolation rather than being repeated per payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    /// Unique event identifier (idempotency key)
    pub event_id: Uuid,

    /// Timestamp when the event was generated
    pub occurred_at: DateTime<Utc>,

    /// Manager the event belongs to
    pub manager_id: Uuid,

    /// Module that generated the event
    pub source_module: String,

    /// Semantic version of the source module
    pub source_version: String,

    /// Event-specific payload
    pub payload: T,
}

impl<T> EventEnvelope<T> {
    pub fn new(manager_id: Uuid, payload: T) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            manager_id,
            source_module: "vouchers".to_string(),
            source_version: env!("CARGO_PKG_VERSION").to_string(),
            payload,
        }
    }
}

// ============================================================
// EVENT PAYLOADS
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerActivated {
    pub months: i32,
    pub amount_minor: i64,
    pub method: PaymentMethod,
    pub subscription_ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerSuspended {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerReinstated {
    pub status: ManagerStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerExpired {
    pub previous_status: ManagerStatus,
    pub window_ended_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerExpiringSoon {
    pub email: String,
    pub display_name: String,
    pub window_ends_at: DateTime<Utc>,
    pub days_left: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerDormant {
    pub last_activity_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherRecharged {
    pub voucher_id: Uuid,
    pub code: String,
    pub reseller_id: Uuid,
    pub amount_minor: i64,
    pub commission_minor: i64,
    pub expires_at: DateTime<Utc>,
}

// ============================================================
// EMIT HELPERS
// ============================================================

/// Wrap a payload in an envelope and enqueue it within a domain transaction
pub async fn emit_tx<T: Serialize>(
    tx: &mut Transaction<'_, Postgres>,
    event_type: &str,
    manager_id: Uuid,
    payload: T,
) -> Result<i64, sqlx::Error> {
    let envelope = EventEnvelope::new(manager_id, payload);
    let value =
        serde_json::to_value(&envelope).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    outbox_repo::enqueue_tx(tx, event_type, value).await
}

/// Wrap a payload in an envelope and enqueue it outside any transaction
pub async fn emit(
    pool: &PgPool,
    event_type: &str,
    manager_id: Uuid,
    payload: impl Serialize,
) -> Result<i64, sqlx::Error> {
    let envelope = EventEnvelope::new(manager_id, payload);
    let value =
        serde_json::to_value(&envelope).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    outbox_repo::enqueue(pool, event_type, value).await
}

/// Enqueue with a dedupe key; None means an event with that key already exists
pub async fn emit_deduped(
    pool: &PgPool,
    event_type: &str,
    manager_id: Uuid,
    payload: impl Serialize,
    dedupe_key: &str,
) -> Result<Option<i64>, sqlx::Error> {
    let envelope = EventEnvelope::new(manager_id, payload);
    let value =
        serde_json::to_value(&envelope).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    outbox_repo::enqueue_deduped(pool, event_type, value, dedupe_key).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_serializes_with_payload() {
        let manager_id = Uuid::new_v4();
        let envelope = EventEnvelope::new(
            manager_id,
            ManagerSuspended {
                reason: Some("payment dispute".to_string()),
            },
        );

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["manager_id"], manager_id.to_string());
        assert_eq!(value["source_module"], "vouchers");
        assert_eq!(value["payload"]["reason"], "payment dispute");
        assert!(value["event_id"].is_string());
        assert!(value["occurred_at"].is_string());
    }

    #[test]
    fn test_envelope_round_trips() {
        let envelope = EventEnvelope::new(
            Uuid::new_v4(),
            VoucherRecharged {
                voucher_id: Uuid::new_v4(),
                code: "A1B2C3D4E5".to_string(),
                reseller_id: Uuid::new_v4(),
                amount_minor: 5000,
                commission_minor: 500,
                expires_at: Utc::now(),
            },
        );

        let json = serde_json::to_string(&envelope).unwrap();
        let back: EventEnvelope<VoucherRecharged> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_id, envelope.event_id);
        assert_eq!(back.payload.code, "A1B2C3D4E5");
        assert_eq!(back.payload.amount_minor, 5000);
    }
}
