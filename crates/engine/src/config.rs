use std::net::SocketAddr;
use std::path::PathBuf;

use snafu::{ResultExt, Snafu};

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Runtime settings for the mock backend, read from the environment
/// (and a `.env` file when present).
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub bind: SocketAddr,
    pub upload_dir: PathBuf,
    /// Base URL of the PrismGuard Vision service. Without it prismguard
    /// uploads are stored unredacted.
    pub vision_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            vision_url: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("PRISMCHAT_BIND") {
            config.bind = raw.parse().context(InvalidBindSnafu { raw })?;
        }
        if let Ok(dir) = std::env::var("PRISMCHAT_UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        config.vision_url = std::env::var("PRISMGUARD_VISION_URL")
            .ok()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        Ok(config)
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("PRISMCHAT_BIND '{raw}' is not a socket address"))]
    InvalidBind {
        raw: String,
        source: std::net::AddrParseError,
    },
}
