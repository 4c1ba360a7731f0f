use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

const DEFAULT_PORT: u16 = 8080;

#[derive(Parser, Debug)]
#[command(name = "mybookmarks")]
#[command(about = "Runs the mybookmarks service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mybookmarks")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

/// The SQL backend named by `SQL_DRIVER_NAME`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    /// Local SQLite file (or `:memory:`).
    Sqlite,
    /// Remote libsql / Turso server.
    Libsql,
}

impl Driver {
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_lowercase().as_str() {
            "" | "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            "libsql" | "turso" => Ok(Driver::Libsql),
            other => Err(ConfigError::UnsupportedDriver(other.to_string())),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    driver: String,
    data_source: String,
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl DatabaseConfig {
    pub fn new(driver: &str, data_source: &str) -> Self {
        DatabaseConfig {
            driver: driver.to_string(),
            data_source: data_source.to_string(),
            auth_token: None,
        }
    }

    pub fn in_memory() -> Self {
        Self::new("sqlite3", ":memory:")
    }

    /// Reads `SQL_DRIVER_NAME`, `SQL_DATA_SOURCE` and `SQL_AUTH_TOKEN`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_source = env::var("SQL_DATA_SOURCE").map_err(|_| ConfigError::MissingEnv("SQL_DATA_SOURCE"))?;
        Ok(DatabaseConfig {
            driver: env::var("SQL_DRIVER_NAME").unwrap_or_default(),
            data_source,
            auth_token: env::var("SQL_AUTH_TOKEN").ok().filter(|t| !t.is_empty()),
        })
    }

    pub fn driver(&self) -> Result<Driver, ConfigError> {
        Driver::parse(&self.driver)
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct App {
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    base_path: String,
}

impl App {
    pub fn get_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// The application root with a leading slash and no trailing slash, or
    /// an empty string when everything is served from `/`.
    pub fn base_path(&self) -> String {
        normalize_base_path(&self.base_path)
    }
}

pub fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: App,
    pub database: DatabaseConfig,
}

impl Config {
    /// Loads the YAML file at `path`, or the default config file when it
    /// exists, falling back to the environment.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Config::from_file(Path::new(path)),
            None => {
                let default_path = default_config_path();
                if default_path.is_file() {
                    Config::from_file(&default_path)
                } else {
                    Config::from_env()
                }
            }
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("PORT") {
            Ok(p) => Some(p.parse::<u16>().map_err(|_| ConfigError::InvalidPort(p))?),
            Err(_) => None,
        };

        Ok(Config {
            app: App {
                port,
                base_path: env::var("BASE_PATH").unwrap_or_default(),
            },
            database: DatabaseConfig::from_env()?,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml_str = fs::read_to_string(path)?;
        Config::from_yaml(&yaml_str)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Self, ConfigError> {
        let yaml_with_env = substitute_env_vars(yaml_str);
        let mut config: Config = serde_yaml::from_str(&yaml_with_env)?;
        if config.database.auth_token.as_deref() == Some("") {
            config.database.auth_token = None;
        }
        Ok(config)
    }
}

/// Replaces `${VAR}` and `${VAR:-default}` with values from the environment.
fn substitute_env_vars(yaml_str: &str) -> String {
    let mut result = yaml_str.to_string();
    let mut offset = 0;

    while let Some(start) = result[offset..].find("${") {
        let actual_start = offset + start;
        let Some(end) = result[actual_start..].find('}') else {
            break;
        };
        let var_name = &result[actual_start + 2..actual_start + end];

        let env_value = match var_name.split_once(":-") {
            Some((name, default_val)) => env::var(name).unwrap_or_else(|_| default_val.to_string()),
            None => env::var(var_name).unwrap_or_else(|_| {
                tracing::warn!("environment variable '{}' not found", var_name);
                String::new()
            }),
        };

        result.replace_range(actual_start..actual_start + end + 1, &env_value);
        offset = actual_start + env_value.len();
    }

    result
}
