use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use mailcanvas_editor::{SessionSettings, Skeleton};

pub const DEFAULT_CONFIG_NAME: &str = "mailcanvas.config.json";

/// Mailcanvas configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Templates and uploads live here
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Starting document when no template is opened ("email" or "popup")
    #[serde(default = "default_skeleton")]
    pub skeleton: String,

    #[serde(default = "default_undo_levels")]
    pub undo_levels: usize,

    #[serde(default = "default_placeholder_text")]
    pub placeholder_text: String,

    /// Fixed prefix for generated identities (random per session when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_seed: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4400
}

fn default_data_dir() -> String {
    ".mailcanvas".to_string()
}

fn default_skeleton() -> String {
    "email".to_string()
}

fn default_undo_levels() -> usize {
    SessionSettings::default().undo_levels
}

fn default_placeholder_text() -> String {
    SessionSettings::default().placeholder_text
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get absolute path to the data directory
    pub fn get_data_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.data_dir)
    }

    pub fn skeleton(&self) -> anyhow::Result<Skeleton> {
        Ok(self.skeleton.parse()?)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            placeholder_text: self.placeholder_text.clone(),
            undo_levels: self.undo_levels,
            id_seed: self.id_seed.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            skeleton: default_skeleton(),
            undo_levels: default_undo_levels(),
            placeholder_text: default_placeholder_text(),
            id_seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "port": 8080,
            "dataDir": "store",
            "skeleton": "popup",
            "undoLevels": 20,
            "idSeed": "demo"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.data_dir, "store");
        assert_eq!(config.skeleton().unwrap(), Skeleton::Popup);

        let settings = config.session_settings();
        assert_eq!(settings.undo_levels, 20);
        assert_eq!(settings.id_seed.as_deref(), Some("demo"));
        assert_eq!(settings.placeholder_text, "Drop content here");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.skeleton().unwrap(), Skeleton::Email);
        assert_eq!(config.undo_levels, 100);
        assert!(config.id_seed.is_none());

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"placeholderText\""));
        assert!(!json.contains("idSeed"));
    }

    #[test]
    fn test_unknown_skeleton() {
        let config = Config {
            skeleton: "newsletter".to_string(),
            ..Config::default()
        };
        assert!(config.skeleton().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config, Config::default());
    }
}
