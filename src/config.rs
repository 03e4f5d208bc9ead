// Configuration parsing for swap-resizer
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use glob::glob;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::defaults;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Missing key: {0}")]
    MissingKey(String),
    #[error("Parse error for {0}: {1}")]
    ParseError(String, String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration paths
pub const DEF_CONFIG: &str = "/usr/share/swap-resizer/swap-resizer.conf";
pub const ETC_CONFIG: &str = "/etc/swap-resizer.conf";
pub const CONF_D_BASES: [&str; 3] = ["/usr/lib", "/run", "/etc"];

/// Configuration holder
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: HashMap<String, String>,
}

impl Config {
    /// Load configuration from all system sources
    pub fn load() -> Result<Self> {
        let fragment_dirs: Vec<PathBuf> = CONF_D_BASES
            .iter()
            .map(|base| Path::new(base).join("swap-resizer.conf.d"))
            .collect();
        Self::load_from(Path::new(DEF_CONFIG), Path::new(ETC_CONFIG), &fragment_dirs)
    }

    /// Load the default file, the main file, then `*.conf` fragments.
    /// Fragments with the same basename in a later directory replace earlier ones;
    /// fragments are applied in basename order.
    pub fn load_from(default: &Path, main: &Path, fragment_dirs: &[PathBuf]) -> Result<Self> {
        let mut values = HashMap::new();

        if default.exists() {
            if let Ok(cfg) = Self::parse_config(default) {
                values.extend(cfg);
            }
        }

        if main.exists() {
            match Self::parse_config(main) {
                Ok(cfg) => values.extend(cfg),
                Err(e) => warn!("Could not load {}: {}", main.display(), e),
            }
        }

        let mut config_files: HashMap<String, PathBuf> = HashMap::new();
        for dir in fragment_dirs {
            let pattern = format!("{}/*.conf", dir.display());
            if let Ok(entries) = glob(&pattern) {
                for entry in entries.flatten() {
                    if entry.is_file() {
                        if let Some(basename) = entry.file_name() {
                            debug!("Found {}", entry.display());
                            config_files
                                .insert(basename.to_string_lossy().to_string(), entry.clone());
                        }
                    }
                }
            }
        }

        let mut sorted_files: Vec<_> = config_files.into_iter().collect();
        sorted_files.sort_by(|a, b| a.0.cmp(&b.0));

        for (_, path) in sorted_files {
            info!("Load: {}", path.display());
            match Self::parse_config(&path) {
                Ok(cfg) => values.extend(cfg),
                Err(e) => warn!("Could not load {}: {}", path.display(), e),
            }
        }

        Ok(Self { values })
    }

    /// Parse a single config file. Values are taken literally.
    fn parse_config<P: AsRef<Path>>(path: P) -> Result<HashMap<String, String>> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse_str(&content))
    }

    fn parse_str(content: &str) -> HashMap<String, String> {
        let mut config = HashMap::new();

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.starts_with('#') || !line.contains('=') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().trim_matches('"');
                config.insert(key.trim().to_string(), value.to_string());
            }
        }

        config
    }

    /// Override a value (command line flags)
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Get a string value
    pub fn get(&self, key: &str) -> Result<&str> {
        self.values
            .get(key)
            .map(|s| s.as_str())
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
    }

    /// Get value as specific type
    pub fn get_as<T: std::str::FromStr>(&self, key: &str) -> Result<T>
    where
        T::Err: std::fmt::Display,
    {
        let value = self.get(key)?;
        value
            .parse()
            .map_err(|e: T::Err| ConfigError::ParseError(key.to_string(), e.to_string()))
    }
}

/// Typed settings for the resize controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizerConfig {
    pub swapfile_path: PathBuf,
    pub privilege_helper: String,
    pub max_size_mb: u64,
    pub meminfo_path: PathBuf,
    pub swaps_path: PathBuf,
}

impl Default for ResizerConfig {
    fn default() -> Self {
        Self {
            swapfile_path: PathBuf::from(defaults::SWAPFILE_PATH),
            privilege_helper: defaults::PRIVILEGE_HELPER.to_string(),
            max_size_mb: defaults::MAX_SIZE_MB,
            meminfo_path: PathBuf::from(defaults::MEMINFO_PATH),
            swaps_path: PathBuf::from(defaults::SWAPS_PATH),
        }
    }
}

impl ResizerConfig {
    /// Create settings from parsed Config
    pub fn from_config(config: &Config) -> Result<Self> {
        let max_size_mb = match config.get_as::<u64>("max_size_mb") {
            Ok(v) => v,
            Err(ConfigError::MissingKey(_)) => defaults::MAX_SIZE_MB,
            Err(e) => return Err(e),
        };

        let swapfile_path = config
            .get("swapfile_path")
            .unwrap_or(defaults::SWAPFILE_PATH)
            .trim_end_matches('/');
        if swapfile_path.is_empty() || !swapfile_path.starts_with('/') {
            return Err(ConfigError::ParseError(
                "swapfile_path".to_string(),
                format!("'{}' is not an absolute file path", swapfile_path),
            ));
        }

        Ok(Self {
            swapfile_path: PathBuf::from(swapfile_path),
            privilege_helper: config
                .get("privilege_helper")
                .unwrap_or(defaults::PRIVILEGE_HELPER)
                .to_string(),
            max_size_mb,
            meminfo_path: PathBuf::from(
                config.get("meminfo_path").unwrap_or(defaults::MEMINFO_PATH),
            ),
            swaps_path: PathBuf::from(config.get("swaps_path").unwrap_or(defaults::SWAPS_PATH)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_config() {
        let values = Config::parse_str(
            "# comment\n\nswapfile_path=/swap/file\n  max_size_mb = 8192 \n\
             bogus line\nprivilege_helper=\"doas\"\n",
        );
        assert_eq!(values.len(), 3);
        assert_eq!(values["swapfile_path"], "/swap/file");
        assert_eq!(values["max_size_mb"], "8192");
        assert_eq!(values["privilege_helper"], "doas");
    }

    #[test]
    fn test_load_order_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let default = dir.path().join("default.conf");
        let main = dir.path().join("main.conf");
        let lib_d = dir.path().join("lib.d");
        let etc_d = dir.path().join("etc.d");
        fs::create_dir_all(&lib_d).unwrap();
        fs::create_dir_all(&etc_d).unwrap();

        fs::write(&default, "max_size_mb=100\nswapfile_path=/swapfile\n").unwrap();
        fs::write(&main, "max_size_mb=200\n").unwrap();
        fs::write(lib_d.join("10-size.conf"), "max_size_mb=300\n").unwrap();
        fs::write(etc_d.join("10-size.conf"), "max_size_mb=400\n").unwrap();
        fs::write(lib_d.join("20-helper.conf"), "privilege_helper=sudo\n").unwrap();
        fs::write(etc_d.join("ignored.txt"), "max_size_mb=999\n").unwrap();

        let config = Config::load_from(&default, &main, &[lib_d, etc_d]).unwrap();
        assert_eq!(config.get_as::<u64>("max_size_mb").unwrap(), 400);
        assert_eq!(config.get("privilege_helper").unwrap(), "sudo");
        assert_eq!(config.get("swapfile_path").unwrap(), "/swapfile");
    }

    #[test]
    fn test_missing_files_give_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(
            &dir.path().join("a"),
            &dir.path().join("b"),
            &[dir.path().join("c")],
        )
        .unwrap();
        assert!(matches!(config.get("swapfile_path"), Err(ConfigError::MissingKey(_))));
        assert_eq!(ResizerConfig::from_config(&config).unwrap(), ResizerConfig::default());
    }

    #[test]
    fn test_resizer_config_from_values() {
        let mut config = Config::default();
        config.set("swapfile_path", "/var/swap/");
        config.set("privilege_helper", "doas");
        config.set("max_size_mb", "4096");

        let settings = ResizerConfig::from_config(&config).unwrap();
        assert_eq!(settings.swapfile_path, PathBuf::from("/var/swap"));
        assert_eq!(settings.privilege_helper, "doas");
        assert_eq!(settings.max_size_mb, 4096);
    }

    #[test]
    fn test_resizer_config_rejects_bad_values() {
        let mut config = Config::default();
        config.set("max_size_mb", "lots");
        assert!(matches!(
            ResizerConfig::from_config(&config),
            Err(ConfigError::ParseError(ref k, _)) if k == "max_size_mb"
        ));

        let mut config = Config::default();
        config.set("swapfile_path", "relative/swap");
        assert!(ResizerConfig::from_config(&config).is_err());
    }
}
