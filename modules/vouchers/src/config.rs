use std::env;

/// Event bus selection. `log` keeps the outbox draining in environments
/// without NATS; events are traced instead of published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusType {
    Nats,
    Log,
}

impl BusType {
    pub fn from_env() -> Self {
        match env::var("BUS_TYPE")
            .unwrap_or_else(|_| "log".to_string())
            .to_lowercase()
            .as_str()
        {
            "nats" => BusType::Nats,
            "log" => BusType::Log,
            _ => {
                tracing::warn!("Unknown BUS_TYPE, defaulting to log");
                BusType::Log
            }
        }
    }
}

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub bus_type: BusType,
    pub nats_url: Option<String>,
    pub reconcile_interval_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8097".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        let bus_type = BusType::from_env();

        let nats_url = match bus_type {
            BusType::Nats => Some(
                env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string()),
            ),
            BusType::Log => None,
        };

        let reconcile_interval_secs: u64 = env::var("RECONCILE_INTERVAL_SECS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .map_err(|_| "RECONCILE_INTERVAL_SECS must be a positive integer".to_string())?;

        let cleanup_interval_secs: u64 = env::var("CLEANUP_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .map_err(|_| "CLEANUP_INTERVAL_SECS must be a positive integer".to_string())?;

        Ok(Config {
            database_url,
            host,
            port,
            bus_type,
            nats_url,
            reconcile_interval_secs,
            cleanup_interval_secs,
        })
    }
}
