//! Real-time WebSocket engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) engine configuration.
///
/// Carries the fixed operational constants of the connection lifecycle:
/// liveness deadlines, queue bounds, frame limits, and room eviction
/// windows. None of these are negotiated with the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Per-connection outbound queue capacity (messages).
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue_size: usize,
    /// Deadline for a single socket write in seconds.
    #[serde(default = "default_write_timeout")]
    pub write_timeout_seconds: u64,
    /// Deadline for inbound liveness in seconds; a connection that produces
    /// no frame (pong included) within this window is considered dead.
    #[serde(default = "default_pong_timeout")]
    pub pong_timeout_seconds: u64,
    /// Maximum inbound frame size in bytes.
    #[serde(default = "default_max_frame")]
    pub max_frame_bytes: usize,
    /// Grace window in seconds before an empty, untouched room is evicted.
    #[serde(default = "default_idle_grace")]
    pub room_idle_grace_seconds: u64,
    /// Interval in seconds between idle-room sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Hub command queue capacity.
    #[serde(default = "default_hub_queue")]
    pub hub_queue_size: usize,
    /// Per-room command queue capacity.
    #[serde(default = "default_room_queue")]
    pub room_queue_size: usize,
}

impl RealtimeConfig {
    /// Deadline applied to each socket write.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_seconds)
    }

    /// Deadline for inbound liveness.
    pub fn pong_timeout(&self) -> Duration {
        Duration::from_secs(self.pong_timeout_seconds)
    }

    /// Interval between liveness probes, derived from the pong deadline so
    /// a probe is always in flight before the deadline can fire.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.pong_timeout_seconds)
            .mul_f64(0.9)
            .max(Duration::from_secs(1))
    }

    /// Grace window before an idle room is evicted.
    pub fn room_idle_grace(&self) -> Duration {
        Duration::from_secs(self.room_idle_grace_seconds)
    }

    /// Interval between idle-room sweeps. Never zero; `tokio::time::interval`
    /// rejects a zero period.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds).max(Duration::from_secs(1))
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            outbound_queue_size: default_outbound_queue(),
            write_timeout_seconds: default_write_timeout(),
            pong_timeout_seconds: default_pong_timeout(),
            max_frame_bytes: default_max_frame(),
            room_idle_grace_seconds: default_idle_grace(),
            sweep_interval_seconds: default_sweep_interval(),
            hub_queue_size: default_hub_queue(),
            room_queue_size: default_room_queue(),
        }
    }
}

fn default_outbound_queue() -> usize {
    256
}

fn default_write_timeout() -> u64 {
    10
}

fn default_pong_timeout() -> u64 {
    60
}

fn default_max_frame() -> usize {
    64 * 1024
}

fn default_idle_grace() -> u64 {
    300
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_hub_queue() -> usize {
    1024
}

fn default_room_queue() -> usize {
    256
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RealtimeConfig::default();
        assert_eq!(config.outbound_queue_size, 256);
        assert_eq!(config.pong_timeout_seconds, 60);
        assert!(config.ping_interval() < config.pong_timeout());
    }

    #[test]
    fn test_ping_interval_floor() {
        let config = RealtimeConfig {
            pong_timeout_seconds: 1,
            ..RealtimeConfig::default()
        };
        assert_eq!(config.ping_interval(), Duration::from_secs(1));
    }
}
