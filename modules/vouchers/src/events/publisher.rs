use sqlx::PgPool;
use std::time::Duration;

use crate::events::bus::Bus;
use crate::repos::outbox_repo::{fetch_unpublished, mark_as_published};

/// Background task that publishes events from the outbox to the event bus
///
/// Polls the events_outbox table for unpublished events and pushes them to
/// the configured bus. A row is only marked published after a successful
/// publish, so a bus outage leaves rows in place for the next tick.
pub async fn run_publisher_task(db: PgPool, bus: Bus) {
    tracing::info!("Starting event publisher task");

    let mut interval = tokio::time::interval(Duration::from_secs(1));
    let mut tick_count: u64 = 0;

    loop {
        interval.tick().await;
        tick_count += 1;

        match publish_batch(&db, &bus).await {
            Ok(count) if count > 0 => {
                tracing::info!(
                    "Publisher tick {}: published {} events from outbox",
                    tick_count,
                    count
                );
            }
            Ok(_) => {
                if tick_count <= 3 || tick_count % 60 == 0 {
                    tracing::info!("Publisher tick {}: no unpublished events", tick_count);
                }
            }
            Err(e) => {
                tracing::error!("Publisher tick {}: error publishing events: {}", tick_count, e);
            }
        }
    }
}

async fn publish_batch(db: &PgPool, bus: &Bus) -> Result<usize, Box<dyn std::error::Error>> {
    let events = fetch_unpublished(db, 100).await?;

    let mut published_count = 0;

    for event in events {
        let subject = format!("vouchers.events.{}", event.event_type);
        let payload = serde_json::to_vec(&event.payload)?;

        match bus.publish(&subject, payload).await {
            Ok(()) => {
                mark_as_published(db, event.id).await?;
                published_count += 1;
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    subject = %subject,
                    "Event published successfully"
                );
            }
            Err(e) => {
                // Left unpublished; retried on the next tick
                tracing::error!(
                    event_id = %event.id,
                    subject = %subject,
                    error = %e,
                    "Failed to publish event"
                );
            }
        }
    }

    Ok(published_count)
}
