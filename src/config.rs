//! Machine configuration.
//!
//! Loaded from a JSON file; every field is optional and falls back to the
//! reference machine's defaults.
//!
//! ```json
//! { "initial_sp": 244, "tick_interval_ms": 1, "interrupt_interval_ms": 1000 }
//! ```

use crate::cpu::registers::DEFAULT_SP;
use serde::{Serialize, Deserialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Tunables for a CPU and its clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MachineConfig {
    /// Stack pointer value loaded into R7 on reset.
    pub initial_sp: u8,
    /// Delay between execution ticks. Zero runs a tight loop.
    pub tick_interval_ms: u64,
    /// Period of the interrupt timer. Zero disables it.
    pub interrupt_interval_ms: u64,
    /// Stop after this many instructions.
    pub max_cycles: Option<u64>,
}

impl MachineConfig {
    /// Read a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_json(&text)
    }

    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// `None` when the interrupt timer is disabled.
    pub fn interrupt_interval(&self) -> Option<Duration> {
        (self.interrupt_interval_ms > 0).then(|| Duration::from_millis(self.interrupt_interval_ms))
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            initial_sp: DEFAULT_SP,
            tick_interval_ms: 1,
            interrupt_interval_ms: 1000,
            max_cycles: None,
        }
    }
}

/// Errors that can occur while loading a configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("invalid configuration: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MachineConfig::default();
        assert_eq!(config.initial_sp, 0xF4);
        assert_eq!(config.tick_interval(), Duration::from_millis(1));
        assert_eq!(config.interrupt_interval(), Some(Duration::from_secs(1)));
        assert_eq!(config.max_cycles, None);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = MachineConfig::from_json(r#"{ "initial_sp": 200, "max_cycles": 50 }"#).unwrap();
        assert_eq!(config.initial_sp, 200);
        assert_eq!(config.max_cycles, Some(50));
        assert_eq!(config.tick_interval_ms, 1);
    }

    #[test]
    fn test_zero_interrupt_interval_disables_timer() {
        let config = MachineConfig::from_json(r#"{ "interrupt_interval_ms": 0 }"#).unwrap();
        assert_eq!(config.interrupt_interval(), None);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(MachineConfig::from_json(r#"{ "initial_sp": 300 }"#).is_err());
        assert!(MachineConfig::from_json(r#"{ "stack": 1 }"#).is_err());
        assert!(MachineConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_demo_config_matches_defaults() {
        let config = MachineConfig::from_json(include_str!("../demos/machine.json")).unwrap();
        assert_eq!(config, MachineConfig::default());
    }
}
