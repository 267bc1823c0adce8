//! Environment-driven configuration. Every knob has a default; a value
//! that fails to parse falls back to the default with a warning rather
//! than aborting startup.

use std::env;
use std::fmt::Debug;
use std::str::FromStr;
use std::time::Duration;

use chain::SubmitConfig;
use listener::ListenerConfig;
use tracing::warn;

fn var_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Debug,
{
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, raw = %raw, default = ?default, "unparseable env value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// WebSocket endpoint of the ledger node.
    pub chain_endpoint: String,
    /// Secret URI of the service signing key; empty means no signing key.
    pub chain_secret: String,
    /// SS58 network id used when rendering addresses.
    pub network_id: u16,

    pub shard_bits: u32,
    pub queue_capacity: usize,
    pub sweep_interval: Duration,
    pub base_poll_interval: Duration,
    pub max_poll_concurrency: usize,

    pub submit_retries: u32,
    pub submit_retry_delay: Duration,
    pub confirm_timeout: Duration,
    pub balances_pallet_index: u8,
    pub transfer_call_index: u8,

    /// Base URL of the storage gateway's file status endpoint.
    pub storage_status_url: String,
    /// Replace the gateway poller with the in-process mock.
    pub mock_storage_status: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            chain_endpoint: var_or("CHAIN_ENDPOINT", "ws://127.0.0.1:9944".to_string()),
            chain_secret: env::var("CHAIN_SECRET").unwrap_or_default(),
            network_id: var_or("CHAIN_NETWORK_ID", 42),
            shard_bits: var_or("LISTENER_SHARD_BITS", 3),
            queue_capacity: var_or("LISTENER_QUEUE_CAPACITY", 512),
            sweep_interval: Duration::from_secs(var_or("LISTENER_SWEEP_SECS", 10)),
            base_poll_interval: Duration::from_secs(var_or("LISTENER_BASE_POLL_SECS", 60)),
            max_poll_concurrency: var_or("LISTENER_MAX_CONCURRENCY", 16),
            submit_retries: var_or("SUBMIT_RETRIES", 3),
            submit_retry_delay: Duration::from_secs(var_or("SUBMIT_RETRY_DELAY_SECS", 3)),
            confirm_timeout: Duration::from_secs(var_or("SUBMIT_CONFIRM_TIMEOUT_SECS", 18)),
            balances_pallet_index: var_or("BALANCES_PALLET_INDEX", 6),
            transfer_call_index: var_or("TRANSFER_CALL_INDEX", 0),
            storage_status_url: var_or(
                "STORAGE_STATUS_URL",
                "http://127.0.0.1:8081/status".to_string(),
            ),
            mock_storage_status: var_or("MOCK_STORAGE_STATUS", false),
        }
    }

    pub fn listener(&self) -> ListenerConfig {
        ListenerConfig {
            shard_bits: self.shard_bits,
            queue_capacity: self.queue_capacity,
            sweep_interval: self.sweep_interval,
            base_interval: self.base_poll_interval,
            max_concurrency: self.max_poll_concurrency,
        }
    }

    pub fn submit(&self) -> SubmitConfig {
        SubmitConfig {
            retry_count: self.submit_retries,
            retry_delay: self.submit_retry_delay,
            confirm_timeout: self.confirm_timeout,
            balances_pallet_index: self.balances_pallet_index,
            transfer_call_index: self.transfer_call_index,
        }
    }
}
