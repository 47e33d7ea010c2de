use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub dbdir: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logformat: LogFormat,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub tmdb: TmdbConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default)]
    pub tlscert: Option<String>,
    #[serde(default)]
    pub tlskey: Option<String>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: default_port(),
            tlscert: None,
            tlskey: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub sqlite: Option<SqliteConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqliteConfig {
    pub filename: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(alias = "allowsignup", default = "default_true")]
    pub allow_signup: bool,
    #[serde(alias = "bcryptcost", default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    /// Tokens never expire when unset.
    #[serde(alias = "tokenttlhours", default)]
    pub token_ttl_hours: Option<i64>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allow_signup: true,
            bcrypt_cost: default_bcrypt_cost(),
            token_ttl_hours: None,
        }
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Option<chrono::Duration> {
        self.token_ttl_hours.map(chrono::Duration::hours)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbConfig {
    #[serde(alias = "baseurl", default = "default_tmdb_base_url")]
    pub base_url: String,
    /// v4 read access token, sent as `Authorization: Bearer`.
    #[serde(alias = "bearertoken", default)]
    pub bearer_token: Option<String>,
    /// v3 key, sent as the `api_key` query parameter.
    #[serde(alias = "apikey", default)]
    pub api_key: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            base_url: default_tmdb_base_url(),
            bearer_token: None,
            api_key: None,
            language: default_language(),
        }
    }
}

fn default_port() -> String {
    "5000".to_string()
}

fn default_true() -> bool {
    true
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e))?;

        let mut config = Self::from_yaml(&content)
            .map_err(|e| ConfigError::ParseError(path.to_string(), e))?;

        if let Ok(token) = std::env::var("TMDB_TOKEN") {
            if !token.is_empty() {
                config.tmdb.bearer_token = Some(token);
            }
        }

        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn get_database_path(&self) -> Option<String> {
        if let Some(ref sqlite) = self.database.sqlite {
            return Some(sqlite.filename.clone());
        }

        if let Some(ref dbdir) = self.dbdir {
            let path = PathBuf::from(dbdir).join("reelmark.db");
            return Some(path.to_string_lossy().to_string());
        }

        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(String, serde_yaml::Error),
}
