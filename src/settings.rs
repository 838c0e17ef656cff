//! Handles the application settings via a config file and environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Contains the application settings.
///
/// The application settings are set with a TOML config file. Settings specified in the config file
/// can be overwritten by environment variables. To do so, set an environment variable
/// with the prefix `MEETMEET_CTRL_` followed by the field names you want to set. Fields are
/// separated by an underscore `_`.
/// ```text
/// MEETMEET_CTRL_<field>_<field-of-field>...
/// ```
/// # Example
///
/// set the `database.server` field:
/// ```text
/// MEETMEET_CTRL_DATABASE_SERVER=localhost
/// ```
/// However, the field names in the environment variables are not allowed to have underscores.
/// So the field 'database.max_connections' would resolve to:
/// ```text
/// MEETMEET_CTRL_DATABASE_MAXCONNECTIONS=5
/// ```
/// # Note
/// Fields set via environment variables do not affect the underlying config file.
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: Database,
    pub http: Http,
    pub auth: Auth,
}

impl Settings {
    /// Creates a new Settings instance from the provided TOML file.
    /// Specific fields can be set or overwritten with environment variables (See struct level docs for more details).
    pub fn load(file_name: &Path) -> Result<Self, ConfigError> {
        let mut cfg = Config::new();

        cfg.merge(File::from(file_name.to_owned()))?;

        let env = Environment::with_prefix("MEETMEET_CTRL").separator("_");

        cfg.merge(env)?;

        cfg.try_into()
    }
}

#[derive(Debug, Deserialize)]
pub struct Database {
    pub server: String,
    pub port: u32,
    pub name: String,
    #[serde(rename = "maxconnections", default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(rename = "minidleconnections", default = "default_min_idle_connections")]
    pub min_idle_connections: u32,
    pub user: String,
    pub password: String,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_idle_connections() -> u32 {
    2
}

/// Settings for the login token verification which is used for user management.
#[derive(Debug, Deserialize)]
pub struct Auth {
    /// Shared secret the external identity issuer signs login tokens with (HS256).
    #[serde(rename = "tokensecret")]
    pub token_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default)]
    pub cors: Cors,
}

/// Settings for CORS (Cross Origin Resource Sharing)
#[derive(Default, Clone, Debug, Deserialize)]
pub struct Cors {
    #[serde(default)]
    pub allowed_origin: Vec<String>,
}

fn default_http_port() -> u16 {
    8000
}
