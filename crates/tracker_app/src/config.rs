use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::Deserialize;
use tracker_core::FailureScope;
use tracker_engine::ClientSettings;
use tracker_logging::{tracker_debug, LogDestination};

use crate::cli::Cli;

const DEFAULT_CONFIG_FILE: &str = "tracker.ron";
const ENV_BASE_URL: &str = "SCRAPE_TRACKER_BASE_URL";
const ENV_TOKEN: &str = "SCRAPE_TRACKER_TOKEN";

/// Effective settings after defaults, config file, environment and flags.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client: ClientSettings,
    pub state_dir: PathBuf,
    pub failure_scope: FailureScope,
    pub log_destination: LogDestination,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client: ClientSettings::default(),
            state_dir: PathBuf::from("."),
            failure_scope: FailureScope::default(),
            log_destination: LogDestination::File,
        }
    }
}

/// Optional overrides read from a RON file. Durations are in seconds.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    base_url: Option<String>,
    auth_token: Option<String>,
    connect_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
    state_dir: Option<PathBuf>,
    failure_scope: Option<String>,
    log_destination: Option<String>,
}

impl AppConfig {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = Self::default();

        let explicit = cli.config.is_some();
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if explicit || path.exists() {
            config.apply_file(&path)?;
        }

        config.apply_env(|key| std::env::var(key).ok());
        config.apply_cli(cli);
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading config file {path:?}"))?;
        let file: ConfigFile =
            ron::from_str(&content).with_context(|| format!("parsing config file {path:?}"))?;
        tracker_debug!("Loaded config file {:?}", path);

        if let Some(base_url) = file.base_url {
            self.client.base_url = base_url;
        }
        if file.auth_token.is_some() {
            self.client.auth_token = file.auth_token;
        }
        if let Some(secs) = file.connect_timeout_secs {
            self.client.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.request_timeout_secs {
            self.client.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = file.poll_interval_ms {
            self.client.poll_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(state_dir) = file.state_dir {
            self.state_dir = state_dir;
        }
        if let Some(scope) = file.failure_scope {
            self.failure_scope = FailureScope::parse(&scope)
                .ok_or_else(|| anyhow!("unknown failure_scope {scope:?} in {path:?}"))?;
        }
        if let Some(destination) = file.log_destination {
            self.log_destination = LogDestination::parse(&destination)
                .ok_or_else(|| anyhow!("unknown log_destination {destination:?} in {path:?}"))?;
        }
        Ok(())
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = lookup(ENV_BASE_URL).filter(|value| !value.trim().is_empty()) {
            self.client.base_url = base_url;
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|value| !value.trim().is_empty()) {
            self.client.auth_token = Some(token);
        }
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(base_url) = &cli.base_url {
            self.client.base_url = base_url.clone();
        }
        if let Some(state_dir) = &cli.state_dir {
            self.state_dir = state_dir.clone();
        }
        if let Some(scope) = cli.failure_scope {
            self.failure_scope = scope;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;

    use clap::Parser;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use tracker_core::FailureScope;
    use tracker_logging::LogDestination;

    use super::AppConfig;
    use crate::cli::Cli;

    fn write_config(temp: &TempDir, content: &str) -> PathBuf {
        let path = temp.path().join("tracker.ron");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn file_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            &temp,
            r#"(
                base_url: Some("http://svc:9000/api"),
                poll_interval_ms: Some(500),
                failure_scope: Some("item"),
                log_destination: Some("both"),
            )"#,
        );

        let mut config = AppConfig::default();
        config.apply_file(&path).unwrap();

        assert_eq!(config.client.base_url, "http://svc:9000/api");
        assert_eq!(config.client.poll_interval, Duration::from_millis(500));
        assert_eq!(config.client.request_timeout, Duration::from_secs(30));
        assert_eq!(config.failure_scope, FailureScope::Item);
        assert_eq!(config.log_destination, LogDestination::Both);
    }

    #[test]
    fn unknown_scope_in_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = write_config(&temp, r#"(failure_scope: Some("url"))"#);

        let mut config = AppConfig::default();
        assert!(config.apply_file(&path).is_err());
    }

    #[test]
    fn environment_sets_url_and_token() {
        let mut config = AppConfig::default();
        config.apply_env(|key| match key {
            "SCRAPE_TRACKER_BASE_URL" => Some("http://env/api".to_string()),
            "SCRAPE_TRACKER_TOKEN" => Some("placeholder-token".to_string()),
            _ => None,
        });

        assert_eq!(config.client.base_url, "http://env/api");
        assert_eq!(config.client.auth_token.as_deref(), Some("placeholder-token"));
    }

    #[test]
    fn blank_environment_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(|_| Some("  ".to_string()));
        assert_eq!(config.client.base_url, "http://127.0.0.1:8080/api");
        assert_eq!(config.client.auth_token, None);
    }

    #[test]
    fn flags_win_over_file() {
        let temp = TempDir::new().unwrap();
        let path = write_config(&temp, r#"(base_url: Some("http://file/api"), state_dir: Some("/tmp/a"))"#);
        let cli = Cli::try_parse_from([
            "scrape-tracker",
            "status",
            "--config",
            path.to_str().unwrap(),
            "--base-url",
            "http://flag/api",
        ])
        .unwrap();

        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.client.base_url, "http://flag/api");
        assert_eq!(config.state_dir, PathBuf::from("/tmp/a"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let cli = Cli::try_parse_from([
            "scrape-tracker",
            "status",
            "--config",
            "/nonexistent/tracker.ron",
        ])
        .unwrap();
        assert!(AppConfig::load(&cli).is_err());
    }
}
