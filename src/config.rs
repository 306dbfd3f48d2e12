use std::path::{Path, PathBuf};

use serde::Deserialize;

const CONFIG_FILE_STEM: &str = "fosika";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Base origin of the reporting API, e.g. `https://fosika.example/api`.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Page size requested when fetching the whole collection.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_notification_interval_secs")]
    pub notification_interval_secs: u64,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_api_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

const fn default_per_page() -> u32 {
    1000
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

const fn default_notification_interval_secs() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            per_page: default_per_page(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            notification_interval_secs: default_notification_interval_secs(),
            data_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional `fosika.toml` in `config_dir`,
    /// then environment variables with the `FOSIKA_` prefix.
    pub fn load(config_dir: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(dir) = config_dir {
            builder = builder.add_source(
                config::File::from(dir.join(CONFIG_FILE_STEM)).required(false),
            );
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix("FOSIKA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn resolve_data_dir(&self, fallback: &Path) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| fallback.to_path_buf())
    }

    pub fn notification_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.notification_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_sources() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(Some(dir.path())).unwrap();
        assert_eq!(config.per_page, 1000);
        assert_eq!(config.notification_interval_secs, 30);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn reads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("fosika.toml"),
            "api_base_url = \"https://fosika.example/api\"\nper_page = 5000\n",
        )
        .unwrap();
        let config = AppConfig::load(Some(dir.path())).unwrap();
        assert_eq!(config.api_base_url, "https://fosika.example/api");
        assert_eq!(config.per_page, 5000);
        assert_eq!(
            config.resolve_data_dir(Path::new("/tmp/fallback")),
            PathBuf::from("/tmp/fallback")
        );
    }
}
