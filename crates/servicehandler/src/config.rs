//! Daemon configuration.
//!
//! Loaded from a YAML file; every section and field is optional and falls
//! back to its default.
//!
//! ```yaml
//! device:
//!   timeout_ms: 5000
//! renderer:
//!   max_parallel_nodes: 8
//! olm:
//!   verify_signal: false
//!   pm_attempts: 3
//!   pm_interval_ms: 1000
//! channels:
//!   capacity: 1024
//! simulation:
//!   nodes: [XPDR-A1, ROADM-A1, ROADM-C1, XPDR-C1]
//!   power_fail: false
//! ```

use crate::error::{ServiceHandlerError, ServiceHandlerResult};
use otn_renderer::{DeviceRendererConfig, ServiceOperationsConfig, DEFAULT_MAX_PARALLEL_NODES};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Device access settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSection {
    /// Budget for a single device call
    pub timeout_ms: u64,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

/// Renderer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSection {
    pub max_parallel_nodes: usize,
}

impl Default for RendererSection {
    fn default() -> Self {
        Self {
            max_parallel_nodes: DEFAULT_MAX_PARALLEL_NODES,
        }
    }
}

/// Power management and signal verification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OlmSection {
    pub verify_signal: bool,
    pub pm_attempts: u32,
    pub pm_interval_ms: u64,
}

impl Default for OlmSection {
    fn default() -> Self {
        Self {
            verify_signal: false,
            pm_attempts: 3,
            pm_interval_ms: 1000,
        }
    }
}

/// Notification topic settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSection {
    /// Buffered envelopes per topic
    pub capacity: usize,
}

impl Default for ChannelSection {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

/// Simulated network used by `transportd`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSection {
    /// Nodes mounted on the simulated device
    pub nodes: Vec<String>,
    /// Make every power setup fail
    pub power_fail: bool,
}

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub device: DeviceSection,
    pub renderer: RendererSection,
    pub olm: OlmSection,
    pub channels: ChannelSection,
    pub simulation: SimulationSection,
}

impl TransportConfig {
    /// Reads and validates a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> ServiceHandlerResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServiceHandlerError::config(path.display().to_string(), e.to_string())
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml_str(content: &str) -> ServiceHandlerResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects limits that would stall the daemon.
    pub fn validate(&self) -> ServiceHandlerResult<()> {
        if self.device.timeout_ms == 0 {
            return Err(ServiceHandlerError::config(
                "device.timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.renderer.max_parallel_nodes == 0 {
            return Err(ServiceHandlerError::config(
                "renderer.max_parallel_nodes",
                "must be greater than zero",
            ));
        }
        if self.olm.pm_attempts == 0 {
            return Err(ServiceHandlerError::config(
                "olm.pm_attempts",
                "must be greater than zero",
            ));
        }
        if self.channels.capacity == 0 {
            return Err(ServiceHandlerError::config(
                "channels.capacity",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn device_timeout(&self) -> Duration {
        Duration::from_millis(self.device.timeout_ms)
    }

    pub fn renderer_config(&self) -> DeviceRendererConfig {
        DeviceRendererConfig {
            max_parallel_nodes: self.renderer.max_parallel_nodes,
        }
    }

    pub fn operations_config(&self) -> ServiceOperationsConfig {
        ServiceOperationsConfig {
            verify_signal: self.olm.verify_signal,
            pm_attempts: self.olm.pm_attempts,
            pm_interval: Duration::from_millis(self.olm.pm_interval_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.device.timeout_ms, 5000);
        assert_eq!(config.renderer.max_parallel_nodes, 8);
        assert_eq!(config.olm.pm_attempts, 3);
        assert_eq!(config.channels.capacity, 1024);
        assert!(config.simulation.nodes.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = TransportConfig::from_yaml_str(
            "olm:\n  verify_signal: true\nsimulation:\n  nodes: [node1, node2]\n",
        )
        .unwrap();

        assert!(config.olm.verify_signal);
        assert_eq!(config.olm.pm_interval_ms, 1000);
        assert_eq!(config.simulation.nodes, vec!["node1", "node2"]);
        assert_eq!(config.device_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_zero_limits_are_rejected() {
        let err = TransportConfig::from_yaml_str("renderer:\n  max_parallel_nodes: 0\n").unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("renderer.max_parallel_nodes"));

        let err = TransportConfig::from_yaml_str("device:\n  timeout_ms: 0\n").unwrap_err();
        assert!(err.to_string().contains("device.timeout_ms"));
    }

    #[test]
    fn test_malformed_yaml() {
        let err = TransportConfig::from_yaml_str("device: [1, 2").unwrap_err();
        assert!(err.is_config());
    }
}
