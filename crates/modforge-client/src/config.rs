//! modforge.yaml project configuration parsing.

use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "modforge.yaml";

#[derive(Debug, Deserialize)]
pub struct ModforgeConfig {
    pub name: String,
    pub version: String,
    /// Mod root, relative to the directory holding the config.
    #[serde(default = "default_mod_dir")]
    pub mod_dir: String,
    pub default_level: Option<String>,
    /// Used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
}

fn default_mod_dir() -> String {
    ".".to_string()
}

impl ModforgeConfig {
    /// Absolute mod root for a config found at `config_path`.
    pub fn mod_root(&self, config_path: &Path) -> PathBuf {
        config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&self.mod_dir)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    NotFound,
    Io(std::io::Error),
    Parse(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound => write!(f, "{} not found", CONFIG_FILE),
            ConfigError::Io(e) => write!(f, "IO error reading {}: {}", CONFIG_FILE, e),
            ConfigError::Parse(e) => write!(f, "Failed to parse {}: {}", CONFIG_FILE, e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Walk up from `start_dir` looking for `modforge.yaml`.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = start_dir.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Load and parse a `modforge.yaml` file.
pub fn load_config(path: &Path) -> Result<ModforgeConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::NotFound,
        _ => ConfigError::Io(e),
    })?;
    let config: ModforgeConfig = serde_yaml::from_str(&contents).map_err(ConfigError::Parse)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("modforge_test_config_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_find_config_walks_up() {
        let dir = temp_dir("walk");
        let nested = dir.join("levels").join("deep");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.join(CONFIG_FILE), "name: arena\nversion: \"1.0\"\n").unwrap();

        assert_eq!(find_config(&nested), Some(dir.join(CONFIG_FILE)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_defaults() {
        let dir = temp_dir("defaults");
        let path = dir.join(CONFIG_FILE);
        std::fs::write(&path, "name: arena\nversion: \"1.0\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.name, "arena");
        assert_eq!(config.mod_dir, ".");
        assert!(config.default_level.is_none());
        assert!(config.log_filter.is_none());
        assert_eq!(config.mod_root(&path), dir.join("."));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_full_config() {
        let dir = temp_dir("full");
        let path = dir.join(CONFIG_FILE);
        std::fs::write(
            &path,
            "name: arena\nversion: \"2\"\nmod_dir: content\ndefault_level: yard\nlog_filter: debug\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.mod_root(&path), dir.join("content"));
        assert_eq!(config.default_level.as_deref(), Some("yard"));
        assert_eq!(config.log_filter.as_deref(), Some("debug"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_errors() {
        let dir = temp_dir("errors");
        assert!(matches!(
            load_config(&dir.join(CONFIG_FILE)),
            Err(ConfigError::NotFound)
        ));
        std::fs::write(dir.join(CONFIG_FILE), "name: [unclosed\n").unwrap();
        assert!(matches!(
            load_config(&dir.join(CONFIG_FILE)),
            Err(ConfigError::Parse(_))
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
