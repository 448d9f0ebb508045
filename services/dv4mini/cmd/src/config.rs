//! Configuration for the dv4mini tool.
//!
//! Values come from a YAML file, then environment variables, then
//! command-line flags, each layer overriding the previous one.

use anyhow::{Context, Result};
use dv4mini_session::{SessionConfig, DEFAULT_READ_TIMEOUT, TX_CHUNK_SIZE};
use dv4mini_wire::Mode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Tool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DongleConfig {
    /// Serial device path
    pub device: String,
    /// Response read timeout in milliseconds
    pub read_timeout_ms: u64,
    /// Log every frame
    pub debug: bool,
    /// Bytes per TX packet
    pub tx_chunk_size: usize,
    /// Mode to select before streaming, if any
    pub mode: Option<String>,
}

impl Default for DongleConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyACM0".to_string(),
            read_timeout_ms: DEFAULT_READ_TIMEOUT.as_millis() as u64,
            debug: false,
            tx_chunk_size: TX_CHUNK_SIZE,
            mode: None,
        }
    }
}

/// Root of the YAML file
#[derive(Debug, Deserialize)]
struct RootConfig {
    dongle: Option<DongleSection>,
}

#[derive(Debug, Default, Deserialize)]
struct DongleSection {
    device: Option<String>,
    read_timeout_ms: Option<u64>,
    debug: Option<bool>,
    tx_chunk_size: Option<usize>,
    mode: Option<String>,
}

impl DongleConfig {
    /// Load from `path` and the process environment
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::default();

        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_yaml::from_str::<RootConfig>(&content) {
                Ok(root) => {
                    config.apply_root_config(root);
                    info!("Loaded configuration from {:?}", path.as_ref());
                }
                Err(e) => warn!(
                    "Failed to parse config file {:?}, using defaults: {}",
                    path.as_ref(),
                    e
                ),
            },
            Err(_) => warn!(
                "Config file {:?} not found, using defaults",
                path.as_ref()
            ),
        }

        config.apply_environment_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_root_config(&mut self, root: RootConfig) {
        let section = root.dongle.unwrap_or_default();
        if let Some(device) = section.device {
            self.device = device;
        }
        if let Some(timeout) = section.read_timeout_ms {
            self.read_timeout_ms = timeout;
        }
        if let Some(debug) = section.debug {
            self.debug = debug;
        }
        if let Some(size) = section.tx_chunk_size {
            self.tx_chunk_size = size;
        }
        if section.mode.is_some() {
            self.mode = section.mode;
        }
    }

    /// Apply `DV4MINI_*` overrides read through `lookup`
    fn apply_environment_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(device) = lookup("DV4MINI_DEVICE") {
            info!("Device overridden by environment: {}", device);
            self.device = device;
        }

        if let Some(debug) = lookup("DV4MINI_DEBUG") {
            self.debug = matches!(debug.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Some(timeout) = lookup("DV4MINI_READ_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(ms) => self.read_timeout_ms = ms,
                Err(_) => warn!("Ignoring invalid DV4MINI_READ_TIMEOUT_MS={}", timeout),
            }
        }
    }

    /// Configured mode, parsed
    pub fn mode(&self) -> Result<Option<Mode>> {
        self.mode
            .as_deref()
            .map(|s| s.parse::<Mode>().map_err(anyhow::Error::msg))
            .transpose()
            .context("invalid mode in configuration")
    }

    /// Session settings derived from this configuration
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            debug: self.debug,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            tx_chunk_size: self.tx_chunk_size,
            ..SessionConfig::default()
        }
    }
}
