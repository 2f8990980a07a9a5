use std::{env, net::SocketAddr, path::PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind address
    pub address: SocketAddr,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file
    pub path: PathBuf,
}

const CONFIG_PATH_ENV: &str = "LIBRARY_CONFIG_PATH";
const ENV_PREFIX: &str = "LIBRARY";

const DEFAULT_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_DATABASE_PATH: &str = "./library.db";

impl AppConfig {
    /// Loads configuration from defaults, an optional file named by
    /// `LIBRARY_CONFIG_PATH`, and `LIBRARY__*` style environment variables,
    /// in increasing precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a value has the
    /// wrong type.
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("server.address", DEFAULT_ADDRESS)?
            .set_default("database.path", DEFAULT_DATABASE_PATH)?;

        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(File::with_name(&path).required(false));
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        Ok(builder.build()?.try_deserialize()?)
    }
}
