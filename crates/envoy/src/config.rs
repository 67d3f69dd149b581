use anyhow::Result;
use prismchat_shared::RouteMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const SERVER_URL_ENV: &str = "PRISMCHAT_SERVER_URL";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub route: RouteMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            route: RouteMode::Prismguard,
        }
    }
}

impl Config {
    /// Reads `~/.config/prismchat/config.json`, creating it with defaults on
    /// first run. `PRISMCHAT_SERVER_URL` overrides the stored server URL for
    /// this process only.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::load_stored()?;

        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.trim().is_empty() {
                config.server_url = url.trim().to_string();
            }
        }

        Ok(config)
    }

    /// The file contents alone, without environment overrides. Use this
    /// before editing and saving.
    pub fn load_stored() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".config").join("prismchat").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_mock_and_prismguard() {
        let config = Config::default();
        assert_eq!(config.server_url, "http://localhost:8000");
        assert_eq!(config.route, RouteMode::Prismguard);
    }

    #[test]
    fn older_files_without_route_still_parse() {
        let config: Config = serde_json::from_str(r#"{ "server_url": "http://x:1" }"#).unwrap();
        assert_eq!(config.server_url, "http://x:1");
        assert_eq!(config.route, RouteMode::Prismguard);
    }
}
