use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::recorder::{ProfileSettings, ProfileTable};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub recorder: RecorderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecorderConfig {
    /// Directory for temporary artifacts (`~` is expanded)
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    #[serde(default = "ProfileSettings::narrowband")]
    pub narrowband: ProfileSettings,

    #[serde(default = "ProfileSettings::wideband")]
    pub wideband: ProfileSettings,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            narrowband: ProfileSettings::narrowband(),
            wideband: ProfileSettings::wideband(),
        }
    }
}

impl RecorderConfig {
    pub fn cache_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.cache_dir).into_owned())
    }

    pub fn profiles(&self) -> ProfileTable {
        ProfileTable {
            narrowband: self.narrowband.clone(),
            wideband: self.wideband.clone(),
        }
    }
}

fn default_cache_dir() -> String {
    std::env::temp_dir()
        .join("capture-session")
        .display()
        .to_string()
}

impl Config {
    /// Load configuration from an optional file plus `CAPTURE_SESSION__*` overrides
    ///
    /// e.g. `CAPTURE_SESSION__RECORDER__CACHE_DIR=/var/tmp/rec`
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("CAPTURE_SESSION").separator("__"))
            .build()
            .context("Failed to read configuration")?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}
