//! Configuration loader and validator for the photo contest service.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub remote: Remote,
    pub sync: SyncSettings,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub bind_addr: String,
}

/// WordPress Photo Directory endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Remote {
    pub rest_base: String,
    pub feed_base: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

/// Which remote listing the sync job reads from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Rest,
    Rss,
}

/// Sync job settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncSettings {
    pub source: SourceKind,
    /// Stop after this many created/updated photos. 0 disables the cap.
    pub max_processed_per_run: usize,
}

impl App {
    /// Data directory with a leading `~/` expanded against `$HOME`.
    pub fn resolved_data_dir(&self) -> String {
        if let Some(rest) = self.data_dir.strip_prefix("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return format!("{}/{}", home.trim_end_matches('/'), rest);
            }
        }
        self.data_dir.clone()
    }

    pub fn media_dir(&self) -> String {
        format!("{}/media", self.resolved_data_dir().trim_end_matches('/'))
    }

    /// `DATABASE_URL` wins; otherwise a SQLite file inside the data dir.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/contest.db", self.resolved_data_dir()))
    }
}

impl Remote {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` and its media dir).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(self.app.media_dir())
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.bind_addr.trim().is_empty() {
        return Err(ConfigError::Invalid("app.bind_addr must be non-empty"));
    }

    if cfg.remote.rest_base.trim().is_empty() {
        return Err(ConfigError::Invalid("remote.rest_base must be non-empty"));
    }
    if Url::parse(&cfg.remote.rest_base).is_err() {
        return Err(ConfigError::Invalid("remote.rest_base must be a valid URL"));
    }
    if cfg.remote.feed_base.trim().is_empty() {
        return Err(ConfigError::Invalid("remote.feed_base must be non-empty"));
    }
    if Url::parse(&cfg.remote.feed_base).is_err() {
        return Err(ConfigError::Invalid("remote.feed_base must be a valid URL"));
    }
    if cfg.remote.user_agent.trim().is_empty() {
        return Err(ConfigError::Invalid("remote.user_agent must be non-empty"));
    }
    if cfg.remote.timeout_secs == 0 {
        return Err(ConfigError::Invalid("remote.timeout_secs must be > 0"));
    }
    // max_processed_per_run is usize; 0 is the documented "no cap" value

    Ok(())
}

/// Returns the example YAML shipped with the service.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  bind_addr: "127.0.0.1:8080"

remote:
  rest_base: "https://wordpress.org/photos/wp-json/wp/v2"
  feed_base: "https://wordpress.org/photos"
  user_agent: "WordPress/Photo-Contest-Plugin"
  timeout_secs: 30

sync:
  source: rest
  max_processed_per_run: 50
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.sync.source, SourceKind::Rest);
        assert_eq!(cfg.sync.max_processed_per_run, 50);
        assert_eq!(cfg.remote.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn parse_rss_source() {
        let yaml = example().replace("source: rest", "source: rss");
        let cfg: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(cfg.sync.source, SourceKind::Rss);
    }

    #[test]
    fn unknown_source_is_parse_error() {
        let yaml = example().replace("source: rest", "source: atom");
        assert!(serde_yaml::from_str::<Config>(&yaml).is_err());
    }

    #[test]
    fn invalid_remote_settings() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.remote.rest_base = "".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("rest_base")), _ => panic!("wrong error") }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.remote.feed_base = "not a url".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("feed_base")), _ => panic!("wrong error") }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.remote.timeout_secs = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.remote.user_agent = " ".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_app_settings() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = "".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("data_dir")), _ => panic!("wrong error") }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.bind_addr = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn ensure_dirs_creates_media_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.join("media").exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.app.bind_addr, "127.0.0.1:8080");
    }
}
