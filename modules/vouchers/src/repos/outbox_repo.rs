//! Outbox repository for reliable event publishing
//!
//! Uses the transactional outbox pattern: events are persisted within the
//! same transaction as the domain change and drained by the background
//! publisher. Reconciler notices carry a dedupe key so re-runs of the same
//! sweep cannot enqueue the same notice twice.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

/// Outbox record for fetching unpublished events
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutboxRecord {
    pub id: i64,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub dedupe_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Insert an event into the outbox within a domain transaction
pub async fn enqueue_tx(
    tx: &mut Transaction<'_, Postgres>,
    event_type: &str,
    payload: serde_json::Value,
) -> Result<i64, sqlx::Error> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO events_outbox (event_type, payload)
        VALUES ($1, $2)
        RETURNING id
        "#,
    )
    .bind(event_type)
    .bind(payload)
    .fetch_one(&mut **tx)
    .await?;

    tracing::debug!("Enqueued event {} of type {}", id, event_type);

    Ok(id)
}

/// Insert an event into the outbox outside any domain transaction
pub async fn enqueue(
    pool: &PgPool,
    event_type: &str,
    payload: serde_json::Value,
) -> Result<i64, sqlx::Error> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO events_outbox (event_type, payload)
        VALUES ($1, $2)
        RETURNING id
        "#,
    )
    .bind(event_type)
    .bind(payload)
    .fetch_one(pool)
    .await?;

    tracing::debug!("Enqueued event {} of type {}", id, event_type);

    Ok(id)
}

/// Insert an event keyed for idempotence. Returns None when an event with the
/// same dedupe key already exists, published or not.
pub async fn enqueue_deduped(
    pool: &PgPool,
    event_type: &str,
    payload: serde_json::Value,
    dedupe_key: &str,
) -> Result<Option<i64>, sqlx::Error> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO events_outbox (event_type, payload, dedupe_key)
        VALUES ($1, $2, $3)
        ON CONFLICT (dedupe_key) WHERE dedupe_key IS NOT NULL DO NOTHING
        RETURNING id
        "#,
    )
    .bind(event_type)
    .bind(payload)
    .bind(dedupe_key)
    .fetch_optional(pool)
    .await?;

    if let Some(id) = id {
        tracing::debug!("Enqueued deduped event {} with key {}", id, dedupe_key);
    }

    Ok(id)
}

/// Fetch unpublished events, oldest first
pub async fn fetch_unpublished(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<OutboxRecord>, sqlx::Error> {
    let records = sqlx::query_as::<_, OutboxRecord>(
        r#"
        SELECT id, event_type, payload, dedupe_key, created_at, published_at
        FROM events_outbox
        WHERE published_at IS NULL
        ORDER BY created_at ASC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Mark an event as published
pub async fn mark_as_published(pool: &PgPool, event_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE events_outbox
        SET published_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(event_id)
    .execute(pool)
    .await?;

    tracing::debug!("Marked event {} as published", event_id);

    Ok(())
}

/// Delete published rows older than the cutoff. Returns the purged row count.
pub async fn purge_published_before(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM events_outbox
        WHERE published_at IS NOT NULL
          AND published_at < $1
        "#,
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
