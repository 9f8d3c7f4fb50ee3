use std::path::PathBuf;

use msgboard_common::{Error, Result};
use tracing::info;

use crate::model::AppConfig;

const YAML_FILE: &str = "msgboard.yml";
const TOML_FILE: &str = "msgboard.toml";

pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Loader rooted at the process working directory.
    pub fn new() -> Result<Self> {
        let config_dir = std::env::current_dir()?;
        Ok(Self { config_dir })
    }

    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Parse the config file, falling back to defaults, with every relative
    /// path resolved against the config dir.
    pub fn load(&self) -> Result<AppConfig> {
        let yaml_path = self.config_dir.join(YAML_FILE);
        let toml_path = self.config_dir.join(TOML_FILE);

        let config = if yaml_path.exists() {
            info!("loading config from {}", yaml_path.display());
            let contents = std::fs::read_to_string(&yaml_path)?;
            serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("failed to parse YAML config: {e}")))?
        } else if toml_path.exists() {
            info!("loading config from {}", toml_path.display());
            let contents = std::fs::read_to_string(&toml_path)?;
            toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("failed to parse TOML config: {e}")))?
        } else {
            info!("no config file found, using defaults");
            AppConfig::default()
        };

        Ok(config.resolve_paths(&self.config_dir))
    }
}
