//! Gateway configuration.
//!
//! All fields have defaults suitable for development. [`GatewayConfig::from_env`]
//! overlays environment variables on the defaults.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Configuration for the GET pipeline and the server binary.
///
/// # Examples
///
/// ```
/// use stripegate_gateway::config::GatewayConfig;
///
/// let config = GatewayConfig::default();
/// assert_eq!(config.listen, "0.0.0.0:8330");
/// assert_eq!(config.units_per_request, 8);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Bind address for the HTTP listener.
    #[builder(default = String::from("0.0.0.0:8330"))]
    pub listen: String,

    /// Log level filter used when `RUST_LOG` is unset.
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Maximum stripe units fetched by one backend read.
    #[builder(default = 8)]
    pub units_per_request: u64,

    /// Preferred block count for the first read of a large request. A small
    /// first read shortens time-to-first-byte.
    #[builder(default = 4)]
    pub first_read_blocks: u64,

    /// Multiplier applied to the per-layout read payload size to form the
    /// outbound buffering threshold.
    #[builder(default = 4)]
    pub write_buffer_multiple: u64,

    /// Throttle delay in milliseconds when backpressure is detected.
    #[builder(default = 10)]
    pub req_throttle_ms: u64,

    /// `Retry-After` value (seconds) on responses sent while quiescing.
    #[builder(default = 1)]
    pub retry_after_secs: u64,

    /// Response buffer pool capacity in bytes.
    #[builder(default = 256 * 1024 * 1024)]
    pub pool_capacity: u64,

    /// Minimum free fraction of the pool before backend reads are deferred.
    #[builder(default = 0.2)]
    pub pool_free_threshold: f64,

    /// Optional directory whose files are loaded into the in-memory backend
    /// at startup (development only).
    #[builder(default)]
    pub seed_dir: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults:
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8330` |
    /// | `LOG_LEVEL` | `info` |
    /// | `ENGINE_UNITS_PER_REQUEST` | `8` |
    /// | `ENGINE_FIRST_READ_BLOCKS` | `4` |
    /// | `WRITE_BUFFER_MULTIPLE` | `4` |
    /// | `REQ_THROTTLE_MS` | `10` |
    /// | `RETRY_AFTER_SECS` | `1` |
    /// | `POOL_CAPACITY_BYTES` | `268435456` |
    /// | `POOL_FREE_THRESHOLD` | `0.2` |
    /// | `SEED_DIR` | *(unset)* |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.listen = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("ENGINE_UNITS_PER_REQUEST") {
            if let Ok(n) = v.parse::<u64>() {
                config.units_per_request = n.max(1);
            }
        }
        if let Ok(v) = std::env::var("ENGINE_FIRST_READ_BLOCKS") {
            if let Ok(n) = v.parse::<u64>() {
                config.first_read_blocks = n.max(1);
            }
        }
        if let Ok(v) = std::env::var("WRITE_BUFFER_MULTIPLE") {
            if let Ok(n) = v.parse::<u64>() {
                config.write_buffer_multiple = n.max(1);
            }
        }
        if let Ok(v) = std::env::var("REQ_THROTTLE_MS") {
            if let Ok(n) = v.parse::<u64>() {
                config.req_throttle_ms = n;
            }
        }
        if let Ok(v) = std::env::var("RETRY_AFTER_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                config.retry_after_secs = n;
            }
        }
        if let Ok(v) = std::env::var("POOL_CAPACITY_BYTES") {
            if let Ok(n) = v.parse::<u64>() {
                config.pool_capacity = n;
            }
        }
        if let Ok(v) = std::env::var("POOL_FREE_THRESHOLD") {
            if let Ok(f) = v.parse::<f64>() {
                config.pool_free_threshold = f.clamp(0.0, 1.0);
            }
        }
        if let Ok(v) = std::env::var("SEED_DIR") {
            config.seed_dir = Some(v);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_create_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen, "0.0.0.0:8330");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.units_per_request, 8);
        assert_eq!(config.first_read_blocks, 4);
        assert_eq!(config.write_buffer_multiple, 4);
        assert_eq!(config.req_throttle_ms, 10);
        assert_eq!(config.retry_after_secs, 1);
        assert_eq!(config.pool_capacity, 256 * 1024 * 1024);
        assert!((config.pool_free_threshold - 0.2).abs() < f64::EPSILON);
        assert!(config.seed_dir.is_none());
    }

    #[test]
    fn test_should_build_with_typed_builder() {
        let config = GatewayConfig::builder()
            .listen("127.0.0.1:9000".into())
            .units_per_request(2)
            .first_read_blocks(1)
            .pool_capacity(1024)
            .build();

        assert_eq!(config.listen, "127.0.0.1:9000");
        assert_eq!(config.units_per_request, 2);
        assert_eq!(config.first_read_blocks, 1);
        assert_eq!(config.pool_capacity, 1024);
    }

    #[test]
    fn test_should_serialize_to_camel_case_json() {
        let config = GatewayConfig::default();
        let json = serde_json::to_string(&config).expect("test serialization");
        assert!(json.contains("unitsPerRequest"));
        assert!(json.contains("poolFreeThreshold"));
    }
}
