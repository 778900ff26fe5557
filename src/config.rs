use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sync::ExclusionRules;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 143;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid account '{0}': expected user:password[:host[:port]]")]
    InvalidAccount(String),

    #[error("Invalid port '{0}'")]
    InvalidPort(String),

    #[error("Invalid security setting '{0}': expected none, starttls or ssl")]
    InvalidSecurity(String),

    #[error("Invalid exclude pattern: {0}")]
    InvalidExclude(#[from] regex::Error),

    #[error("No {0} account given")]
    MissingAccount(&'static str),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImapSecurity {
    #[default]
    None,
    StartTLS,
    SSL,
}

impl FromStr for ImapSecurity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(ImapSecurity::None),
            "starttls" => Ok(ImapSecurity::StartTLS),
            "ssl" | "tls" => Ok(ImapSecurity::SSL),
            _ => Err(ConfigError::InvalidSecurity(s.to_string())),
        }
    }
}

/// Login details for one IMAP account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub security: ImapSecurity,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

// Keeps passwords out of logs.
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .finish()
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.host, self.port)
    }
}

/// Parses the compact `user:password[:host[:port]]` form.
impl FromStr for Account {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() < 2 || parts.len() > 4 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(ConfigError::InvalidAccount(redact(s)));
        }

        let host = match parts.get(2) {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => default_host(),
        };
        let port = match parts.get(3) {
            Some(port) => port
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.to_string()))?,
            None => DEFAULT_PORT,
        };

        Ok(Account {
            username: parts[0].to_string(),
            password: parts[1].to_string(),
            host,
            port,
            security: ImapSecurity::None,
        })
    }
}

fn redact(compact: &str) -> String {
    let mut parts: Vec<&str> = compact.split(':').collect();
    if parts.len() > 1 {
        parts[1] = "***";
    }
    parts.join(":")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: Option<Account>,
    #[serde(default)]
    pub destination: Option<Account>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub dry_run: bool,
}

impl Config {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let path = Path::new(path);

        // A missing file just means everything comes from the command line.
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;

        Ok(config)
    }

    pub fn source(&self) -> Result<&Account, ConfigError> {
        self.source.as_ref().ok_or(ConfigError::MissingAccount("source"))
    }

    pub fn destination(&self) -> Result<&Account, ConfigError> {
        self.destination
            .as_ref()
            .ok_or(ConfigError::MissingAccount("destination"))
    }

    pub fn exclusion_rules(&self) -> Result<ExclusionRules, ConfigError> {
        Ok(ExclusionRules::compile(self.exclude.as_slice())?)
    }
}
