//! Configuration surface consumed by the protocol core.

use std::time::Duration;

use crate::checksum;

pub use crate::channel::ChannelConfig;

/// Tunable protocol parameters for one endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolConfig {
    /// Checksum block width in bytes (1–4).
    pub block_size: usize,
    /// How long to wait for an ACK before retransmitting.
    pub timeout: Duration,
    /// Upper bound on a single transport read; expiry is steady-state, not an
    /// error.
    pub recv_timeout: Duration,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            block_size: 1,
            timeout: Duration::from_secs(5),
            recv_timeout: Duration::from_secs(1),
        }
    }
}

impl ProtocolConfig {
    /// Check the configuration before constructing an endpoint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !checksum::block_size_valid(self.block_size) {
            return Err(ConfigError::InvalidBlockSize(self.block_size));
        }
        Ok(())
    }
}

/// Rejected configuration values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Checksum block size outside the supported 1–4 byte range.
    InvalidBlockSize(usize),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidBlockSize(size) => {
                write!(f, "checksum block size must be 1..=4 bytes, got {size}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
