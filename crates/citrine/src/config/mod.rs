use citrine_transport::consts::{DEFAULT_BIND_ADDR, DEFAULT_PEER_ADDR, DEFAULT_RECV_TIMEOUT_MS};
use error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub mod error;

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub network: NetworkConfig,
    pub transfer: TransferConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NetworkConfig {
    pub bind: String,
    pub peer: String,
    pub recv_timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransferConfig {
    pub input: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDR.to_string(),
            peer: DEFAULT_PEER_ADDR.to_string(),
            recv_timeout_ms: DEFAULT_RECV_TIMEOUT_MS,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            input: "file.mp3".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            transfer: TransferConfig::default(),
        }
    }
}

impl Config {
    /// Defaults with a variant-specific input path.
    pub fn with_input(input: &str) -> Self {
        Self {
            network: NetworkConfig::default(),
            transfer: TransferConfig {
                input: input.to_string(),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if SocketAddr::from_str(&self.network.bind).is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid bind address format: '{}'. Expected format like 'IP:PORT'.",
                self.network.bind
            )));
        }

        if SocketAddr::from_str(&self.network.peer).is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid peer address format: '{}'. Expected format like 'IP:PORT'.",
                self.network.peer
            )));
        }

        if self.network.recv_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "Receive timeout must be greater than 0.".to_string(),
            ));
        }

        if self.transfer.input.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Input path cannot be empty.".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        SocketAddr::from_str(&self.network.bind).map_err(|e| {
            ConfigError::Validation(format!(
                "Invalid bind address '{}': {}",
                self.network.bind, e
            ))
        })
    }

    pub fn peer_addr(&self) -> Result<SocketAddr, ConfigError> {
        SocketAddr::from_str(&self.network.peer).map_err(|e| {
            ConfigError::Validation(format!(
                "Invalid peer address '{}': {}",
                self.network.peer, e
            ))
        })
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.network.recv_timeout_ms)
    }
}

/// Loads `config.toml` from the working directory, writing the given
/// defaults there on first run.
pub fn handle(defaults: Config) -> Result<Config, ConfigError> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);
    if config_path.exists() {
        let config_content = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&config_content)?;
        config.validate()?;
        Ok(config)
    } else {
        save(&defaults, &config_path)?;
        Ok(defaults)
    }
}

fn save(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let config_content = toml::to_string_pretty(config)?;
    let mut file = fs::File::create(path)?;
    file.write_all(config_content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr().unwrap().port(), 5002);
        assert_eq!(config.peer_addr().unwrap().port(), 5001);
        assert_eq!(config.recv_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_variant_input_override() {
        let config = Config::with_input("../file.mp3");
        assert_eq!(config.transfer.input, "../file.mp3");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::with_input("payload.bin");
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.transfer.input, "payload.bin");
        assert_eq!(parsed.network.bind, config.network.bind);
        assert_eq!(parsed.network.recv_timeout_ms, config.network.recv_timeout_ms);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.network.bind = "not-an-address".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.network.recv_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.transfer.input = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
