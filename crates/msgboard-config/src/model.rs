use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub web: WebConfig,

    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            storage: StorageConfig::default(),
            web: WebConfig::default(),
            log_level: Some("info".to_string()),
        }
    }
}

impl AppConfig {
    /// Anchor every relative path at `base`. Absolute paths are left alone.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let anchor = |path: PathBuf| {
            if path.is_relative() {
                base.join(path)
            } else {
                path
            }
        };
        self.storage.database_path = anchor(self.storage.database_path);
        self.web.static_dir = anchor(self.web.static_dir);
        self.web.landing_page = anchor(self.web.landing_page);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("database").join("messages.db")
}

/// Where the landing page and static assets live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    #[serde(default = "default_landing_page")]
    pub landing_page: PathBuf,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            static_dir: default_static_dir(),
            landing_page: default_landing_page(),
        }
    }
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_landing_page() -> PathBuf {
    PathBuf::from("templates").join("index.html")
}

#[cfg(test)]
mod tests {
    use super::AppConfig;
    use std::path::{Path, PathBuf};

    #[test]
    fn resolve_paths_anchors_relative_paths_only() {
        let mut config = AppConfig::default();
        config.web.static_dir = PathBuf::from("/srv/assets");

        let resolved = config.resolve_paths(Path::new("/opt/board"));

        assert_eq!(
            resolved.storage.database_path,
            PathBuf::from("/opt/board/database/messages.db")
        );
        assert_eq!(resolved.web.static_dir, PathBuf::from("/srv/assets"));
        assert_eq!(
            resolved.web.landing_page,
            PathBuf::from("/opt/board/templates/index.html")
        );
    }
}
