//! Configuration
//!
//! Connection settings for the query agent and GraphQL backends. Values come
//! from the environment; auth tokens fall back to the session file written
//! by the login flow (`<config dir>/quarry/session.json`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub graphql: GraphqlConfig,

    /// Snowflake credentials forwarded to the query agent.
    pub snowflake: Option<SnowflakeConfig>,
}

/// Query agent connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_url")]
    pub url: String,

    pub auth_token: Option<String>,
}

fn default_agent_url() -> String {
    "https://agent.quarry.dev".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            url: default_agent_url(),
            auth_token: None,
        }
    }
}

/// GraphQL backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlConfig {
    pub auth_token: Option<String>,

    #[serde(default = "default_graphql_timeout")]
    pub timeout_secs: u64,
}

fn default_graphql_timeout() -> u64 {
    30
}

impl Default for GraphqlConfig {
    fn default() -> Self {
        Self {
            auth_token: None,
            timeout_secs: default_graphql_timeout(),
        }
    }
}

/// Snowflake connection credentials
#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeConfig {
    pub account: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub schema: String,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read session file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse session file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("No auth token found; set {env_var} or log in to create a session")]
    MissingToken { env_var: String },

    #[error("Snowflake credentials are not configured; set the SNOWSQL_* variables")]
    MissingSnowflakeCredentials,
}

#[derive(Deserialize)]
struct Session {
    access_token: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(url) = std::env::var("QUARRY_AGENT_URL") {
            config.agent.url = url;
        }
        if let Ok(token) = std::env::var("QUARRY_AUTH_TOKEN") {
            config.agent.auth_token = Some(token);
        }
        if let Ok(token) = std::env::var("QUARRY_GRAPHQL_TOKEN") {
            config.graphql.auth_token = Some(token);
        }

        config.snowflake = Self::snowflake_from_env();
        config
    }

    fn snowflake_from_env() -> Option<SnowflakeConfig> {
        Some(SnowflakeConfig {
            account: std::env::var("SNOWSQL_ACCOUNT").ok()?,
            user: std::env::var("SNOWSQL_USER").ok()?,
            password: std::env::var("SNOWSQL_PWD").ok()?,
            database: std::env::var("SNOWSQL_DATABASE").ok()?,
            schema: std::env::var("SNOWSQL_SCHEMA").ok()?,
        })
    }

    pub fn agent_url(&self) -> &str {
        &self.agent.url
    }

    pub fn graphql_timeout(&self) -> Duration {
        Duration::from_secs(self.graphql.timeout_secs)
    }

    pub fn snowflake_credentials(&self) -> Result<&SnowflakeConfig, ConfigError> {
        self.snowflake
            .as_ref()
            .ok_or(ConfigError::MissingSnowflakeCredentials)
    }

    /// The token sent to the query agent: configured value, environment
    /// variable, then the session file.
    pub fn agent_auth_token(&self) -> Result<String, ConfigError> {
        self.discover_token(self.agent.auth_token.as_deref(), "QUARRY_AUTH_TOKEN")
    }

    /// The bearer token for GraphQL requests: configured value, environment
    /// variable, then the session file.
    pub fn graphql_auth_token(&self) -> Result<String, ConfigError> {
        self.discover_token(self.graphql.auth_token.as_deref(), "QUARRY_GRAPHQL_TOKEN")
    }

    fn discover_token(
        &self,
        configured: Option<&str>,
        env_var: &str,
    ) -> Result<String, ConfigError> {
        if let Some(token) = configured {
            return Ok(token.to_owned());
        }
        if let Ok(token) = std::env::var(env_var) {
            return Ok(token);
        }
        if let Some(path) = session_path() {
            if path.exists() {
                return read_session_token(&path);
            }
        }
        Err(ConfigError::MissingToken {
            env_var: env_var.to_owned(),
        })
    }
}

fn session_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("quarry").join("session.json"))
}

pub(crate) fn read_session_token(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    let session: Session = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    Ok(session.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.agent_url(), "https://agent.quarry.dev");
        assert_eq!(config.graphql_timeout(), Duration::from_secs(30));
        assert!(matches!(
            config.snowflake_credentials(),
            Err(ConfigError::MissingSnowflakeCredentials)
        ));
    }

    #[test]
    fn test_configured_token_wins() {
        let mut config = Config::default();
        config.agent.auth_token = Some("token-from-config".into());
        assert_eq!(config.agent_auth_token().unwrap(), "token-from-config");
    }

    #[test]
    fn test_read_session_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"access_token": "session-token"}}"#).unwrap();

        assert_eq!(read_session_token(&path).unwrap(), "session-token");
    }

    #[test]
    fn test_read_session_token_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            read_session_token(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
