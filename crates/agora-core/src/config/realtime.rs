//! Real-time messaging broker configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Per-connection outbound queue depth. A connection whose queue fills
    /// up is torn down rather than buffered without bound.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
    /// Depth of the hub's register/unregister/inbound queues.
    #[serde(default = "default_hub_queue_depth")]
    pub hub_queue_depth: usize,
    /// WebSocket ping interval in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Read deadline in seconds; a connection that produces no frame or
    /// pong within this window is considered dead.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_seconds: u64,
    /// Interval between inactivity sweeps in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Liveness threshold in seconds; connections whose last liveness
    /// report is older than this are evicted by the sweep.
    #[serde(default = "default_liveness_timeout")]
    pub liveness_timeout_seconds: u64,
    /// Maximum inbound frame size in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            outbound_buffer_size: default_outbound_buffer(),
            hub_queue_depth: default_hub_queue_depth(),
            ping_interval_seconds: default_ping_interval(),
            read_timeout_seconds: default_read_timeout(),
            sweep_interval_seconds: default_sweep_interval(),
            liveness_timeout_seconds: default_liveness_timeout(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_hub_queue_depth() -> usize {
    1024
}

fn default_ping_interval() -> u64 {
    54
}

fn default_read_timeout() -> u64 {
    60
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_liveness_timeout() -> u64 {
    120
}

fn default_max_frame_bytes() -> usize {
    512 * 1024
}
