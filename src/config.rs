use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Which store the front end persists to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Local,
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalSettings {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSettings {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub backend: Backend,
    pub local: LocalSettings,
    pub remote: RemoteSettings,
    pub notice_seconds: u64,
    pub image_root: String,
    pub log_level: String,
}

impl Settings {
    /// Defaults, then `appsettings.*` if present, then `CATALOG__*` variables.
    ///
    /// A `.env` file is loaded into the environment first.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name("appsettings").required(false))
                .add_source(Environment::with_prefix("CATALOG").separator("__")),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder
            .set_default("backend", "local")?
            .set_default("local.dir", ".catalog")?
            .set_default("remote.base_url", "http://127.0.0.1:5000")?
            .set_default("notice_seconds", 5_i64)?
            .set_default("image_root", crate::models::DEFAULT_IMAGE_ROOT)?
            .set_default("log_level", "info")?
            .build()?
            .try_deserialize()
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_seconds)
    }
}
