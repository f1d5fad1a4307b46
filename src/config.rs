use std::env;
use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;
use tower_sessions::cookie::Key;

/// Only suitable for local development, override with `SECRET_KEY` anywhere else.
pub const DEV_SECRET_KEY: &str = "dev-secret-key-for-local-development-only";

const DEFAULT_INSTANCE_PATH: &str = "instance";
const DEFAULT_SITE_ADDR: &str = "0.0.0.0:3000";
const DATABASE_FILE: &str = "tinyblog.sqlite";
const INSTANCE_CONFIG_FILE: &str = "config.env";

// cookie::Key::derive_from panics below this length
const MIN_SECRET_LEN: usize = 32;
// bcrypt rejects costs outside this range
const BCRYPT_COSTS: std::ops::RangeInclusive<u32> = 4..=31;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("SECRET_KEY must be at least 32 bytes long")]
    SecretTooShort,
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
    #[error("failed to load instance config: {0}")]
    InstanceConfig(#[from] dotenvy::Error),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub secret_key: String,
    pub database: PathBuf,
    pub instance_path: PathBuf,
    pub bind_addr: String,
    pub bcrypt_cost: u32,
    pub secure_cookies: bool,
}

impl Config {
    /// Defaults rooted at the given instance folder.
    pub fn with_instance_path(instance_path: impl Into<PathBuf>) -> Self {
        let instance_path = instance_path.into();
        Self {
            secret_key: DEV_SECRET_KEY.to_string(),
            database: instance_path.join(DATABASE_FILE),
            instance_path,
            bind_addr: DEFAULT_SITE_ADDR.to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            secure_cookies: false,
        }
    }

    /// Builds the runtime configuration.
    ///
    /// The instance folder's `config.env` is loaded if it exists, then the
    /// process environment is applied on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let instance_path =
            env::var("INSTANCE_PATH").unwrap_or_else(|_| DEFAULT_INSTANCE_PATH.to_string());

        load_instance_config(Path::new(&instance_path))?;

        let mut config = Self::with_instance_path(instance_path);

        if let Ok(secret_key) = env::var("SECRET_KEY") {
            config.secret_key = secret_key;
        }
        if let Ok(database) = env::var("DATABASE") {
            config.database = PathBuf::from(database);
        }
        if let Ok(addr) = env::var("SITE_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(cost) = env::var("BCRYPT_COST") {
            config.bcrypt_cost = cost.parse().map_err(|_| ConfigError::InvalidValue {
                name: "BCRYPT_COST",
                value: cost,
            })?;
        }
        if let Ok(secure) = env::var("SECURE_COOKIES") {
            config.secure_cookies = parse_flag(&secure).ok_or(ConfigError::InvalidValue {
                name: "SECURE_COOKIES",
                value: secure,
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_key.len() < MIN_SECRET_LEN {
            return Err(ConfigError::SecretTooShort);
        }
        if !BCRYPT_COSTS.contains(&self.bcrypt_cost) {
            return Err(ConfigError::InvalidValue {
                name: "BCRYPT_COST",
                value: self.bcrypt_cost.to_string(),
            });
        }
        Ok(())
    }

    /// Signing key for the session cookie.
    pub fn signing_key(&self) -> Result<Key, ConfigError> {
        self.validate()?;
        Ok(Key::derive_from(self.secret_key.as_bytes()))
    }
}

fn load_instance_config(instance_path: &Path) -> Result<(), ConfigError> {
    match dotenvy::from_path(instance_path.join(INSTANCE_CONFIG_FILE)) {
        Ok(()) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_live_in_instance_folder() {
        let config = Config::with_instance_path("/srv/blog");
        assert_eq!(config.database, PathBuf::from("/srv/blog/tinyblog.sqlite"));
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let mut config = Config::with_instance_path("instance");
        config.secret_key = "dev".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::SecretTooShort)));
        assert!(config.signing_key().is_err());
    }

    #[test]
    fn test_bcrypt_cost_bounds() {
        let mut config = Config::with_instance_path("instance");
        config.bcrypt_cost = 2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                name: "BCRYPT_COST",
                ..
            })
        ));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
