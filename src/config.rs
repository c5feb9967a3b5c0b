use std::{
    env,
    net::{AddrParseError, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use log::LevelFilter;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:7878";
const DEFAULT_DATABASE_PATH: &str = "./db.sqlite3";
const DEFAULT_SCHEMA_PATH: &str = "./schema.sql";
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Debug;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {name} {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("{name} is not valid unicode")]
    NotUnicode { name: &'static str },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    /// SQL file run once against the store at startup.
    pub schema_path: PathBuf,
    pub log_level: LevelFilter,
    pub request_timeout: Duration,
}

impl Config {
    /// Read the configuration from the environment, after loading a `.env`
    /// file if there is one.
    pub fn from_env() -> Result<Config, ConfigError> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        Config::from_lookup(|name| match env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode { name }),
        })
    }

    fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&'static str) -> Result<Option<String>, ConfigError>,
    {
        let bind_addr = lookup("BIND_ADDR")?.unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|err: AddrParseError| invalid("BIND_ADDR", &bind_addr, err.to_string()))?;

        let database_path = lookup("DATABASE_PATH")?
            .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string())
            .into();

        let schema_path = lookup("SCHEMA_PATH")?
            .unwrap_or_else(|| DEFAULT_SCHEMA_PATH.to_string())
            .into();

        let log_level = match lookup("LOG_LEVEL")? {
            Some(value) => value
                .parse()
                .map_err(|_| invalid("LOG_LEVEL", &value, "unknown level".to_string()))?,
            None => DEFAULT_LOG_LEVEL,
        };

        let request_timeout = match lookup("REQUEST_TIMEOUT")? {
            Some(value) => humantime::parse_duration(&value)
                .map_err(|err| invalid("REQUEST_TIMEOUT", &value, err.to_string()))?,
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        Ok(Config {
            bind_addr,
            database_path,
            schema_path,
            log_level,
            request_timeout,
        })
    }
}

fn invalid(name: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason,
    }
}
