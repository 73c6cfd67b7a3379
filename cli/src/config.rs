use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_SERVER_URL: &str = "ws://localhost:51617/query";
pub const SERVER_URL_ENV: &str = "TRACER_SERVER_URL";

const DEFAULT_EVENT_BUDGET: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    /// Websocket endpoint of the trace backend.
    pub server_url: String,
    /// Key commands that may queue up while the session is busy.
    pub event_budget: usize,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            event_budget: DEFAULT_EVENT_BUDGET,
            log_filter: "info".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl TracerConfig {
    /// Load `~/.tracer/config.toml`. A missing file is not an error.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Command line beats environment beats config file.
    #[must_use]
    pub fn server_url(&self, cli: Option<&str>) -> String {
        resolve_server_url(cli, env::var(SERVER_URL_ENV).ok().as_deref(), &self.server_url)
    }

    /// Bounded channels need a non-zero capacity.
    #[must_use]
    pub fn command_capacity(&self) -> usize {
        self.event_budget.max(1)
    }
}

fn resolve_server_url(cli: Option<&str>, env: Option<&str>, configured: &str) -> String {
    cli.or(env.filter(|url| !url.trim().is_empty()))
        .unwrap_or(configured)
        .to_string()
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".tracer").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = TracerConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "server_url = \"ws://10.0.0.2:9000/query\"\n").unwrap();

        let config = TracerConfig::load_from(&path).unwrap().unwrap();
        assert_eq!(config.server_url, "ws://10.0.0.2:9000/query");
        assert_eq!(config.event_budget, DEFAULT_EVENT_BUDGET);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn invalid_toml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "server_url = [").unwrap();

        let err = TracerConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn zero_budget_still_gives_a_channel() {
        let config = TracerConfig {
            event_budget: 0,
            ..TracerConfig::default()
        };
        assert_eq!(config.command_capacity(), 1);
    }

    #[test]
    fn server_url_precedence() {
        assert_eq!(
            resolve_server_url(Some("ws://cli"), Some("ws://env"), "ws://file"),
            "ws://cli"
        );
        assert_eq!(resolve_server_url(None, Some("ws://env"), "ws://file"), "ws://env");
        assert_eq!(resolve_server_url(None, Some("  "), "ws://file"), "ws://file");
        assert_eq!(resolve_server_url(None, None, DEFAULT_SERVER_URL), DEFAULT_SERVER_URL);
    }
}
