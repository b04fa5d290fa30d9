use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:5001";
pub const DEFAULT_SCOPES: &str = "openid profile email";

pub const ENV_AUTHORITY_URL: &str = "VITE_AUTHORITY_URL";
pub const ENV_CLIENT_ID: &str = "VITE_CLIENT_ID";
pub const ENV_REDIRECT_URI: &str = "VITE_REDIRECT_URI";
pub const ENV_API_URL: &str = "CREW_API_URL";
pub const ENV_SCOPES: &str = "CREW_SCOPES";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set (environment or config file)")]
    Missing(&'static str),

    #[error("{name} is not a valid URL: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not determine config directory")]
    NoConfigDir,
}

/// Fallback values read from `<config_dir>/crew-assistant/config.json`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub authority_url: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub api_url: Option<String>,
    pub scopes: Option<String>,
}

impl FileConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("crew-assistant").join("config.json"))
    }
}

/// Identity-provider settings handed to the OIDC client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcSettings {
    pub authority: Url,
    pub client_id: String,
    pub redirect_uri: Url,
    pub scopes: Vec<String>,
}

impl OidcSettings {
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Resolved configuration. Environment variables win over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub authority_url: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub api_url: String,
    pub scopes: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let file = FileConfig::load()?;
        Ok(Self::resolve(|key| std::env::var(key).ok(), file))
    }

    pub fn resolve<F>(env: F, file: FileConfig) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty variables count as unset
        let lookup = |key: &str, fallback: Option<String>| {
            env(key)
                .filter(|v| !v.trim().is_empty())
                .or(fallback)
                .map(|v| v.trim().to_string())
        };

        let scopes = lookup(ENV_SCOPES, file.scopes)
            .unwrap_or_else(|| DEFAULT_SCOPES.to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Self {
            authority_url: lookup(ENV_AUTHORITY_URL, file.authority_url),
            client_id: lookup(ENV_CLIENT_ID, file.client_id),
            redirect_uri: lookup(ENV_REDIRECT_URI, file.redirect_uri),
            api_url: lookup(ENV_API_URL, file.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            scopes,
        }
    }

    pub fn oidc_settings(&self) -> Result<OidcSettings, ConfigError> {
        let authority = self
            .authority_url
            .as_deref()
            .ok_or(ConfigError::Missing(ENV_AUTHORITY_URL))?;
        let client_id = self
            .client_id
            .clone()
            .ok_or(ConfigError::Missing(ENV_CLIENT_ID))?;
        let redirect_uri = self
            .redirect_uri
            .as_deref()
            .ok_or(ConfigError::Missing(ENV_REDIRECT_URI))?;

        Ok(OidcSettings {
            authority: parse_url(ENV_AUTHORITY_URL, authority)?,
            client_id,
            redirect_uri: parse_url(ENV_REDIRECT_URI, redirect_uri)?,
            scopes: self.scopes.clone(),
        })
    }

    pub fn api_base(&self) -> Result<Url, ConfigError> {
        parse_url(ENV_API_URL, &self.api_url)
    }
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = Config::resolve(env_from(&[]), FileConfig::default());

        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.scopes, vec!["openid", "profile", "email"]);
        assert!(matches!(
            config.oidc_settings(),
            Err(ConfigError::Missing(ENV_AUTHORITY_URL))
        ));
    }

    #[test]
    fn environment_wins_over_file() {
        let file = FileConfig {
            authority_url: Some("https://file.example.com/P1".into()),
            client_id: Some("file-client".into()),
            redirect_uri: Some("http://localhost:5173/".into()),
            api_url: Some("http://localhost:9000".into()),
            scopes: None,
        };
        let env = env_from(&[
            (ENV_CLIENT_ID, "env-client"),
            (ENV_API_URL, "   "),
        ]);

        let config = Config::resolve(env, file);
        let oidc = config.oidc_settings().unwrap();

        assert_eq!(oidc.client_id, "env-client");
        assert_eq!(oidc.authority.as_str(), "https://file.example.com/P1");
        assert_eq!(config.api_url, "http://localhost:9000");
    }

    #[test]
    fn invalid_redirect_uri_is_reported() {
        let env = env_from(&[
            (ENV_AUTHORITY_URL, "https://auth.example.com"),
            (ENV_CLIENT_ID, "abc"),
            (ENV_REDIRECT_URI, "not a url"),
        ]);
        let config = Config::resolve(env, FileConfig::default());

        assert!(matches!(
            config.oidc_settings(),
            Err(ConfigError::InvalidUrl { name: ENV_REDIRECT_URI, .. })
        ));
    }

    #[test]
    fn custom_scopes_are_split() {
        let env = env_from(&[(ENV_SCOPES, "openid  calendar")]);
        let config = Config::resolve(env, FileConfig::default());
        assert_eq!(config.scopes, vec!["openid", "calendar"]);
    }

    #[test]
    fn file_config_loads_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        assert_eq!(FileConfig::load_from(&path).unwrap(), FileConfig::default());

        fs::write(&path, r#"{"client_id":"from-file","api_url":"http://10.0.0.2:5001"}"#).unwrap();
        let loaded = FileConfig::load_from(&path).unwrap();
        assert_eq!(loaded.client_id.as_deref(), Some("from-file"));
        assert_eq!(loaded.api_url.as_deref(), Some("http://10.0.0.2:5001"));

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            FileConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
