//! Optional RON configuration for the command-line front end.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use mirror_engine::{EngineConfig, FetchSettings};
use mirror_logging::mirror_info;
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_FILENAME: &str = "mirror.ron";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub output_dir: PathBuf,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub max_resources: usize,
    pub user_agent: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        let engine = EngineConfig::default();
        Self {
            output_dir: PathBuf::from("output"),
            connect_timeout_ms: fetch.connect_timeout.as_millis() as u64,
            request_timeout_ms: fetch.request_timeout.as_millis() as u64,
            redirect_limit: fetch.redirect_limit,
            max_bytes: fetch.max_bytes,
            max_resources: engine.max_resources,
            user_agent: None,
            log_file: None,
        }
    }
}

impl AppConfig {
    pub fn engine_config(&self) -> EngineConfig {
        let defaults = FetchSettings::default();
        EngineConfig {
            fetch: FetchSettings {
                connect_timeout: Duration::from_millis(self.connect_timeout_ms),
                request_timeout: Duration::from_millis(self.request_timeout_ms),
                redirect_limit: self.redirect_limit,
                max_bytes: self.max_bytes,
                user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            },
            max_resources: self.max_resources,
            ..EngineConfig::default()
        }
    }
}

/// Loads `explicit` if given (it must exist), else `./mirror.ron` if present,
/// else defaults.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILENAME);
            if !fallback.is_file() {
                return Ok(AppConfig::default());
            }
            fallback
        }
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: AppConfig = ron::from_str(&content)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    mirror_info!("Loaded config from {:?}", path);
    Ok(config)
}
