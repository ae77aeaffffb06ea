use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "docanalyzer.toml";
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_ANALYZE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("invalid api base url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub analyze_timeout: Duration,
    pub regenerate_timeout: Duration,
    /// Applied to every other request when set.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            analyze_timeout: DEFAULT_ANALYZE_TIMEOUT,
            regenerate_timeout: DEFAULT_ANALYZE_TIMEOUT,
            request_timeout: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    api_base_url: Option<String>,
    analyze_timeout_secs: Option<u64>,
    regenerate_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

/// Defaults, then the TOML file, then the process environment.
///
/// An explicit `path` must exist; without one, `docanalyzer.toml` in the
/// working directory is read if present.
pub fn load_settings(path: Option<&Path>) -> Result<ClientSettings, ConfigError> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

pub fn load_settings_with(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ClientSettings, ConfigError> {
    let mut settings = ClientSettings::default();

    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(&path) {
        Ok(raw) => {
            let file_cfg: FileSettings =
                toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?;
            apply_file(&mut settings, file_cfg);
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {}
        Err(source) => return Err(ConfigError::Read { path, source }),
    }

    apply_env(&mut settings, env)?;
    settings.api_base_url = normalize_base_url(&settings.api_base_url)?;
    Ok(settings)
}

fn apply_file(settings: &mut ClientSettings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.analyze_timeout_secs {
        settings.analyze_timeout = Duration::from_secs(v);
    }
    if let Some(v) = file_cfg.regenerate_timeout_secs {
        settings.regenerate_timeout = Duration::from_secs(v);
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout = Some(Duration::from_secs(v));
    }
}

fn apply_env(
    settings: &mut ClientSettings,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(v) = env("DOCANALYZER_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = env("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = env("APP__ANALYZE_TIMEOUT_SECS") {
        settings.analyze_timeout = parse_secs("APP__ANALYZE_TIMEOUT_SECS", v)?;
    }
    if let Some(v) = env("APP__REGENERATE_TIMEOUT_SECS") {
        settings.regenerate_timeout = parse_secs("APP__REGENERATE_TIMEOUT_SECS", v)?;
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout = Some(parse_secs("APP__REQUEST_TIMEOUT_SECS", v)?);
    }
    Ok(())
}

fn parse_secs(key: &'static str, value: String) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

/// Validates an http(s) base URL and strips any trailing slash so endpoint
/// paths can be appended with `format!("{base}/api/...")`.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|err| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: "scheme must be http or https".into(),
        });
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
