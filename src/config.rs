use dotenv::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Application settings. Rocket's own settings (address, port, log level)
/// stay in its figment configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    /// Directory uploaded images are written to and served from.
    pub media_root: PathBuf,
    pub page_size: i64,
    pub index_cache_ttl: Duration,
    pub password_rounds: u32,
    pub max_image_bytes: u64,
}

impl Settings {
    pub fn new<S: Into<String>>(database_url: S) -> Self {
        Settings {
            database_url: database_url.into(),
            media_root: PathBuf::from("media"),
            page_size: 10,
            index_cache_ttl: Duration::from_secs(20),
            password_rounds: 100_000,
            max_image_bytes: 5 * 1024 * 1024,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let defaults = Settings::new(database_url);

        Ok(Settings {
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_root.clone()),
            page_size: parsed("PAGE_SIZE", defaults.page_size)?,
            index_cache_ttl: Duration::from_secs(parsed(
                "INDEX_CACHE_SECONDS",
                defaults.index_cache_ttl.as_secs(),
            )?),
            password_rounds: parsed("PASSWORD_HASH_ROUNDS", defaults.password_rounds)?,
            max_image_bytes: parsed("MAX_IMAGE_BYTES", defaults.max_image_bytes)?,
            ..defaults
        })
    }
}

fn parsed<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}
