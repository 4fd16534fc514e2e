//! Daemon configuration management

use anyhow::{Context, Result, anyhow};
use protocol::DeviceIdentity;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// System-wide configuration file
pub const SYSTEM_CONFIG_PATH: &str = "/etc/barcode-daemon/daemon.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub daemon: DaemonSettings,
    #[serde(default)]
    pub scanners: ScannerSettings,
    #[serde(default)]
    pub nfc: NfcSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonSettings {
    #[serde(default = "DaemonSettings::default_log_level")]
    pub log_level: String,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

impl DaemonSettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

/// Which scan sources to watch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerSettings {
    /// Keyboard-emulation scanner, `vvvv[:pppp]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hid_vendor_product: Option<DeviceIdentity>,
    /// Contactless reader, `vvvv[:pppp]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nfc_vendor_product: Option<DeviceIdentity>,
    /// Serial scanner (reserved, no adapter)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(default)]
    pub read_stdin: bool,
}

/// Contactless reader tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NfcSettings {
    /// Seconds before the same tag is reported again
    #[serde(default = "NfcSettings::default_debounce_secs")]
    pub debounce_secs: u64,
    /// Reader response timeout for one poll
    #[serde(default = "NfcSettings::default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    /// Pause between poll rounds that found no tag
    #[serde(default = "NfcSettings::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for NfcSettings {
    fn default() -> Self {
        Self {
            debounce_secs: Self::default_debounce_secs(),
            poll_timeout_ms: Self::default_poll_timeout_ms(),
            poll_interval_ms: Self::default_poll_interval_ms(),
        }
    }
}

impl NfcSettings {
    fn default_debounce_secs() -> u64 {
        5
    }

    fn default_poll_timeout_ms() -> u64 {
        500
    }

    fn default_poll_interval_ms() -> u64 {
        100
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.debounce_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl DaemonConfig {
    /// Load configuration from `path`, or from the first standard location found
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => expand_path(&p),
            None => first_existing(&Self::candidates())
                .ok_or_else(|| anyhow!("No configuration file found"))?,
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: DaemonConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load the first standard configuration file, or defaults if there is none
    pub fn load_or_default() -> Result<Self> {
        Self::load_first(&Self::candidates())
    }

    /// Load the first of `candidates` that exists
    ///
    /// Defaults are used only when none exists; a file that is present but
    /// unreadable or invalid is an error.
    pub fn load_first(candidates: &[PathBuf]) -> Result<Self> {
        match first_existing(candidates) {
            Some(path) => Self::load(Some(path)),
            None => Ok(Self::default()),
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Per-user configuration file path
    pub fn default_path() -> PathBuf {
        match dirs::config_dir() {
            Some(config_dir) => config_dir.join("barcode-daemon").join("daemon.toml"),
            None => PathBuf::from(".config/barcode-daemon/daemon.toml"),
        }
    }

    fn candidates() -> Vec<PathBuf> {
        vec![Self::default_path(), PathBuf::from(SYSTEM_CONFIG_PATH)]
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.daemon.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.daemon.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.nfc.poll_timeout_ms == 0 {
            return Err(anyhow!("nfc.poll_timeout_ms must be greater than 0"));
        }

        Ok(())
    }
}

fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.exists()).cloned()
}

/// Parse a `vvvv[:pppp]` filter given on the command line
pub fn parse_filter(flag: &str, value: &str) -> Result<DeviceIdentity> {
    value
        .parse::<DeviceIdentity>()
        .with_context(|| format!("Invalid {} '{}'", flag, value))
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).as_ref()),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.daemon.log_level, "info");
        assert!(!config.scanners.read_stdin);
        assert_eq!(config.scanners.hid_vendor_product, None);
        assert_eq!(config.scanners.nfc_vendor_product, None);
        assert_eq!(config.nfc.debounce(), Duration::from_secs(5));
        assert_eq!(config.nfc.poll_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: DaemonConfig = toml::from_str(
            r#"
            [scanners]
            hid_vendor_product = "05E0:1200"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.scanners.hid_vendor_product,
            Some(DeviceIdentity::vendor_product("05e0", "1200"))
        );
        assert_eq!(config.daemon.log_level, "info");
        assert_eq!(config.nfc, NfcSettings::default());
    }

    #[test]
    fn test_invalid_filter_rejected_at_parse() {
        let result: std::result::Result<DaemonConfig, _> = toml::from_str(
            r#"
            [scanners]
            nfc_vendor_product = "zz:12"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = DaemonConfig::default();
        assert!(config.validate().is_ok());

        config.daemon.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        config.daemon.log_level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_poll_timeout() {
        let mut config = DaemonConfig::default();
        config.nfc.poll_timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
