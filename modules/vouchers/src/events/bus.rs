use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("Publish error: {0}")]
    Publish(String),
}

/// Event bus handle for the publisher task.
///
/// NATS carries events in production; the log variant lets local dev and
/// integration tests run without a broker while keeping the outbox draining.
#[derive(Clone)]
pub enum Bus {
    Nats(async_nats::Client),
    Log,
}

impl Bus {
    pub async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError> {
        match self {
            Bus::Nats(client) => client
                .publish(subject.to_string(), payload.into())
                .await
                .map_err(|e| BusError::Publish(e.to_string())),
            Bus::Log => {
                tracing::info!(
                    subject = %subject,
                    bytes = payload.len(),
                    "Event published (log bus)"
                );
                Ok(())
            }
        }
    }
}
