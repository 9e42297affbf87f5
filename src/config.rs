use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be a number: {1}")]
    NotANumber(&'static str, String),
    #[error("MOVIEDASH_COOKIE_KEY must be at least 32 bytes")]
    ShortCookieKey,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    /// `None` opens a temporary database.
    pub db_path: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub cookie_key: Vec<u8>,
    pub bcrypt_cost: u32,
    pub templates: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let cookie_key = match lookup("MOVIEDASH_COOKIE_KEY") {
            Some(key) if key.len() < 32 => return Err(ConfigError::ShortCookieKey),
            Some(key) => key.into_bytes(),
            None => rand::random::<[u8; 32]>().to_vec(),
        };
        let bcrypt_cost = match lookup("MOVIEDASH_BCRYPT_COST") {
            Some(cost) => cost
                .parse()
                .map_err(|_| ConfigError::NotANumber("MOVIEDASH_BCRYPT_COST", cost))?,
            None => bcrypt::DEFAULT_COST,
        };
        Ok(Config {
            bind: lookup("MOVIEDASH_BIND").unwrap_or_else(|| "127.0.0.1:8080".to_owned()),
            db_path: lookup("MOVIEDASH_DB_PATH").map(PathBuf::from),
            catalog: lookup("MOVIEDASH_CATALOG").map(PathBuf::from),
            cookie_key,
            bcrypt_cost,
            templates: lookup("MOVIEDASH_TEMPLATES").unwrap_or_else(|| {
                concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*").to_owned()
            }),
        })
    }

    pub fn open_db(&self) -> sled::Result<sled::Db> {
        match &self.db_path {
            Some(path) => sled::open(path),
            None => sled::Config::new().temporary(true).open(),
        }
    }
}
