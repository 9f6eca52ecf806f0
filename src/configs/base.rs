use serde::{Deserialize, Serialize};

use crate::{common::types::AnyResult, configs::*};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub emotes: EmotesConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load() -> AnyResult<Self> {
        let config_path = if std::path::Path::new("config.toml").exists() {
            "config.toml"
        } else if std::path::Path::new("config.default.toml").exists() {
            "config.default.toml"
        } else {
            return Err("config.toml or config.default.toml not found".into());
        };

        let config_str = std::fs::read_to_string(config_path)?;
        if config_str.trim().is_empty() {
            return Err(format!("{} is empty", config_path).into());
        }

        Self::parse(&config_str)
    }

    pub fn parse(config_str: &str) -> AnyResult<Self> {
        let config: Config = toml::from_str(config_str)?;
        if config.archive.api_base.is_empty() {
            return Err("archive.api_base must be set".into());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fills_defaults() {
        let config = Config::parse(
            r#"
            [archive]
            api_base = "https://archive.test"

            [chat]
            max_messages = 50
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.archive.api_base, "https://archive.test");
        assert_eq!(config.archive.vods_page_size, 50);
        assert_eq!(config.chat.max_messages, 50);
        assert_eq!(config.chat.tick_interval_ms, 1000);
        assert_eq!(config.player.sample_interval_ms, 1000);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_parse_rejects_missing_api_base() {
        assert!(Config::parse("[chat]\nmax_messages = 10\n").is_err());
    }
}
