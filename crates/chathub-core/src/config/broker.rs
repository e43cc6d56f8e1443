//! Pub/sub broker configuration.

use serde::{Deserialize, Serialize};

/// Pub/sub broker configuration.
///
/// The broker relays room traffic between server instances. The `memory`
/// provider keeps relay in-process and is only suitable for single-node
/// deployments and tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker provider: `"redis"` or `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Redis connection URL (ignored by the memory provider).
    #[serde(default = "default_url")]
    pub url: String,
    /// Per-subscription buffer size.
    #[serde(default = "default_subscription_buffer")]
    pub subscription_buffer: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            url: default_url(),
            subscription_buffer: default_subscription_buffer(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_subscription_buffer() -> usize {
    256
}
