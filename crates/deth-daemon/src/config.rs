//! Daemon configuration, read from `$DETH_DATA_DIR/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use deth_pool::ProtocolConfig;

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// JSON-RPC settings.
    #[serde(default)]
    pub rpc: RpcConfig,
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Genesis parameters, used when the database holds no ledger yet.
    #[serde(default)]
    pub protocol: ProtocolConfig,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// JSON-RPC configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Socket file name inside the data directory.
    #[serde(default = "default_socket_name")]
    pub socket_name: String,
    /// Per-subscriber event buffer.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level for deth crates: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Enable `dev_*` methods and client-supplied timestamps.
    #[serde(default)]
    pub dev_commands: bool,
}

fn default_socket_name() -> String {
    "deth.sock".to_string()
}

fn default_event_buffer() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            socket_name: default_socket_name(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dev_commands: false,
        }
    }
}

impl DaemonConfig {
    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// The data directory.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// Path of the JSON-RPC socket.
    pub fn socket_path(&self) -> PathBuf {
        self.data_dir().join(&self.rpc.socket_name)
    }

    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("DETH_DATA_DIR") {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".deth"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/deth"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.rpc.socket_name, "deth.sock");
        assert_eq!(config.rpc.event_buffer, 1000);
        assert_eq!(config.advanced.log_level, "info");
        assert!(!config.advanced.dev_commands);
        assert_eq!(config.protocol, ProtocolConfig::default());
    }

    #[test]
    fn test_config_round_trip() {
        let config = DaemonConfig::default();
        let text = toml::to_string(&config).expect("serialize");
        let parsed: DaemonConfig = toml::from_str(&text).expect("parse");
        assert_eq!(parsed.protocol, config.protocol);
    }

    #[test]
    fn test_partial_file() {
        let parsed: DaemonConfig = toml::from_str(
            r#"
            [storage]
            data_dir = "/var/lib/deth"

            [protocol]
            reserve_ratio = "100000000000000000"

            [advanced]
            dev_commands = true
            "#,
        )
        .expect("parse");
        assert_eq!(parsed.data_dir(), PathBuf::from("/var/lib/deth"));
        assert_eq!(parsed.socket_path(), PathBuf::from("/var/lib/deth/deth.sock"));
        assert_eq!(parsed.protocol.reserve_ratio, 100_000_000_000_000_000);
        assert!(parsed.advanced.dev_commands);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = DaemonConfig::load_from(Path::new("/nonexistent/deth/config.toml"))
            .expect("defaults");
        assert_eq!(config.rpc.socket_name, "deth.sock");
    }
}
