//! Configuration file
//!
//! `config.toml` lives in `~/.config/sfs/`, or in `$SFS_CONFIG_DIR` when set.
//! It names the keyring and region to connect with and the worker budgets of
//! bulk transfers. Every section is optional; a missing file is the default
//! configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Version written to new files; older files are upgraded on load
pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "SFS_CONFIG_DIR";

/// Keyring file looked up in the configuration directory when none is configured
pub const KEYRING_FILE: &str = "keyring.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: u32,

    /// Store connection settings
    #[serde(default)]
    pub connection: Connection,

    /// Bulk transfer settings
    #[serde(default)]
    pub transfer: TransferLimits,
}

/// Where to find credentials and which region to talk to
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Connection {
    /// Path to the keyring JSON file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyring: Option<PathBuf>,

    /// Region whose object-store endpoint is used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Worker slot budgets for bulk operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLimits {
    /// Concurrent uploads per batch
    #[serde(default = "default_upload_slots")]
    pub upload_slots: usize,

    /// Concurrent downloads per batch
    #[serde(default = "default_download_slots")]
    pub download_slots: usize,

    /// Concurrent deletions per batch
    #[serde(default = "default_delete_slots")]
    pub delete_slots: usize,
}

fn default_upload_slots() -> usize {
    5
}

fn default_download_slots() -> usize {
    5
}

fn default_delete_slots() -> usize {
    10
}

impl Default for TransferLimits {
    fn default() -> Self {
        Self {
            upload_slots: default_upload_slots(),
            download_slots: default_download_slots(),
            delete_slots: default_delete_slots(),
        }
    }
}

impl TransferLimits {
    /// Same budget for every operation kind
    pub fn uniform(slots: usize) -> Self {
        Self {
            upload_slots: slots,
            download_slots: slots,
            delete_slots: slots,
        }
    }

    /// Clamp zero budgets to one so a batch can always make progress
    pub fn normalized(self) -> Self {
        Self {
            upload_slots: self.upload_slots.max(1),
            download_slots: self.download_slots.max(1),
            delete_slots: self.delete_slots.max(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            connection: Connection::default(),
            transfer: TransferLimits::default(),
        }
    }
}

/// Locates, reads and writes `config.toml`
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("Could not determine config directory".into()))?
                .join("sfs"),
        };
        Ok(Self {
            config_path: config_dir.join("config.toml"),
        })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Directory holding the configuration file
    pub fn config_dir(&self) -> &Path {
        self.config_path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Keyring to use: the configured one, or `keyring.json` next to the config file
    pub fn keyring_path(&self, config: &Config) -> PathBuf {
        config
            .connection
            .keyring
            .clone()
            .unwrap_or_else(|| self.config_dir().join(KEYRING_FILE))
    }

    /// Read the configuration, falling back to defaults when there is no file
    ///
    /// Zero worker budgets are raised to one.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "{} has schema version {}, newer than supported version {SCHEMA_VERSION}",
                self.config_path.display(),
                config.schema_version
            )));
        }
        // Version 0 files predate the field and share the current layout
        config.schema_version = SCHEMA_VERSION;

        config.transfer = config.transfer.normalized();
        Ok(config)
    }

    /// Write the configuration, readable by its owner only
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let manager = ConfigManager::with_path(config_path);
        (manager, temp_dir)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert!(config.connection.keyring.is_none());
        assert_eq!(config.transfer.upload_slots, 5);
        assert_eq!(config.transfer.download_slots, 5);
        assert_eq!(config.transfer.delete_slots, 10);
    }

    #[test]
    fn test_missing_file_is_default() {
        let (manager, _temp_dir) = temp_config_manager();
        let config = manager.load().unwrap();
        assert_eq!(config.transfer, TransferLimits::default());
        assert!(config.connection.region.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let (manager, _temp_dir) = temp_config_manager();

        let mut config = Config::default();
        config.connection.keyring = Some(PathBuf::from("/etc/sfs/keyring.json"));
        config.connection.region = Some("GRA1".to_string());
        config.transfer.upload_slots = 8;

        manager.save(&config).unwrap();
        let loaded = manager.load().unwrap();

        assert_eq!(loaded.connection.region.as_deref(), Some("GRA1"));
        assert_eq!(
            loaded.connection.keyring,
            Some(PathBuf::from("/etc/sfs/keyring.json"))
        );
        assert_eq!(loaded.transfer.upload_slots, 8);
        assert_eq!(loaded.transfer.delete_slots, 10);
    }

    #[test]
    fn test_keyring_path() {
        let (manager, temp_dir) = temp_config_manager();
        let mut config = Config::default();
        assert_eq!(
            manager.keyring_path(&config),
            temp_dir.path().join("keyring.json")
        );

        config.connection.keyring = Some(PathBuf::from("/srv/keyring.json"));
        assert_eq!(manager.keyring_path(&config), PathBuf::from("/srv/keyring.json"));
    }

    #[test]
    fn test_zero_slots_are_clamped() {
        let (manager, _temp_dir) = temp_config_manager();
        let content = format!(
            r#"
            schema_version = {SCHEMA_VERSION}

            [transfer]
            upload_slots = 0
            "#
        );
        std::fs::write(manager.config_path(), content).unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.transfer.upload_slots, 1);
        assert_eq!(config.transfer.download_slots, 5);
    }

    #[test]
    fn test_unversioned_file_is_upgraded() {
        let (manager, _temp_dir) = temp_config_manager();
        std::fs::write(manager.config_path(), "[connection]\nregion = \"SBG1\"\n").unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert_eq!(config.connection.region.as_deref(), Some("SBG1"));
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let (manager, _temp_dir) = temp_config_manager();
        let content = format!("schema_version = {}\n", SCHEMA_VERSION + 1);
        std::fs::write(manager.config_path(), content).unwrap();

        let err = manager.load().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("newer than supported"));
    }
}
