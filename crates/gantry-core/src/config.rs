//! gantry.toml configuration parser.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GantryConfig {
    pub server: ServerConfig,
    pub response: ResponseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind: String,
    /// Largest request head (request line plus headers) accepted, in bytes.
    pub max_request_head: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            max_request_head: 64 * 1024,
        }
    }
}

/// Limits applied while streaming a response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// Bytes an iterator body may send in one write-ready turn before
    /// yielding to other connections.
    pub turn_budget: usize,
    /// Size of each read from a file body.
    pub file_chunk_size: usize,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            turn_budget: 4096,
            file_chunk_size: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,gantryd=debug,gantry_gateway=debug".to_string(),
            json: false,
        }
    }
}

impl GantryConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: GantryConfig = toml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject limits that would stall the send loop.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.response.turn_budget == 0 {
            anyhow::bail!("response.turn_budget must be > 0");
        }
        if self.response.file_chunk_size == 0 {
            anyhow::bail!("response.file_chunk_size must be > 0");
        }
        if self.server.max_request_head == 0 {
            anyhow::bail!("server.max_request_head must be > 0");
        }
        Ok(())
    }
}
