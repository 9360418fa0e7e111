use std::env;
use std::path::PathBuf;

use crate::geo::GeoMode;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("anonymous writes cannot be enabled in spatial mode")]
    AnonymousSpatial,
}

/// Process configuration, read once at startup.
///
/// | Env Var                 | Default                      |
/// |-------------------------|------------------------------|
/// | `DATABASE_URL`          | required                     |
/// | `HOST`                  | `0.0.0.0`                    |
/// | `PORT`                  | `8000`                       |
/// | `GEO_MODE`              | `simple`                     |
/// | `ALLOW_ANONYMOUS_WRITE` | `true` in simple mode        |
/// | `ANONYMOUS_USERNAME`    | `poc_user`                   |
/// | `MEDIA_ROOT`            | `media`                      |
/// | `CORS_ORIGINS`          | `http://localhost:3000`      |
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub geo_mode: GeoMode,
    pub allow_anonymous_write: bool,
    pub anonymous_username: String,
    pub media_root: PathBuf,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value: raw })?,
            None => 8000,
        };

        let geo_mode = match lookup("GEO_MODE") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "GEO_MODE", value: raw })?,
            None => GeoMode::Simple,
        };

        let allow_anonymous_write = match lookup("ALLOW_ANONYMOUS_WRITE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                key: "ALLOW_ANONYMOUS_WRITE",
                value: raw,
            })?,
            None => geo_mode == GeoMode::Simple,
        };

        if allow_anonymous_write && geo_mode == GeoMode::Spatial {
            return Err(ConfigError::AnonymousSpatial);
        }

        let anonymous_username =
            lookup("ANONYMOUS_USERNAME").unwrap_or_else(|| "poc_user".to_string());
        let media_root = PathBuf::from(lookup("MEDIA_ROOT").unwrap_or_else(|| "media".to_string()));

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database_url,
            host,
            port,
            geo_mode,
            allow_anonymous_write,
            anonymous_username,
            media_root,
            cors_origins,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
