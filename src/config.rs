//! Configuration management for Supervisor
//!
//! This module defines the `Config` struct and the per-handler settings.
//! It uses the `figment` crate to layer built-in defaults, an optional
//! TOML file, and `SUPERVISOR_`-prefixed environment variables.

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, OneOrMany};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "SUPERVISOR_";

/// Keys whose environment values are taken verbatim. Figment parses other
/// values, which would turn `SUPERVISOR_PROJECT_VERSION=1.2` into a float
/// and strip leading zeros from an all-digit API key.
const VERBATIM_ENV_KEYS: &[&str] = &[
    "project_name",
    "project_version",
    "log_level",
    "log_path",
    "email.smtp_server",
    "email.from_address",
    "email.prefix",
    "sendgrid.api_key",
    "sendgrid.from_address",
    "sendgrid.prefix",
];

/// The main configuration struct for a supervised script.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Name of the script, used in subjects and email footers.
    pub project_name: Option<String>,
    /// Version of the script, shown next to the name in email footers.
    pub project_version: Option<String>,
    /// Report errors escaping the entry point before the process exits.
    pub handle_errors: bool,
    /// The logging level, used when `RUST_LOG` is not set.
    pub log_level: String,
    /// File the run's log is written to and attached to error reports.
    pub log_path: Option<PathBuf>,
    /// How many rotated copies of the log file to keep.
    pub log_backups: usize,
    /// Print notifications to stdout.
    pub console: bool,
    /// Settings for email delivery through an SMTP relay.
    pub email: Option<EmailSettings>,
    /// Settings for email delivery through SendGrid.
    pub sendgrid: Option<SendGridSettings>,
}

/// Settings for the SMTP email handler.
#[serde_as]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmailSettings {
    /// Hostname of the SMTP relay.
    #[serde(default)]
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub from_address: String,
    /// One address or a list of them.
    #[serde_as(as = "OneOrMany<_>")]
    #[serde(default)]
    pub to_addresses: Vec<String>,
    /// Text prepended to every subject, e.g. the host name.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Connection timeout for the SMTP session.
    #[serde(default = "default_smtp_timeout")]
    pub timeout_seconds: u64,
}

/// Settings for the SendGrid email handler.
#[serde_as]
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct SendGridSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub from_address: String,
    /// One address or a list of them.
    #[serde_as(as = "OneOrMany<_>")]
    #[serde(default)]
    pub to_addresses: Vec<String>,
    #[serde(default)]
    pub prefix: Option<String>,
}

fn default_smtp_port() -> u16 {
    25
}

fn default_smtp_timeout() -> u64 {
    30
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            smtp_server: String::new(),
            smtp_port: default_smtp_port(),
            from_address: String::new(),
            to_addresses: Vec::new(),
            prefix: None,
            timeout_seconds: default_smtp_timeout(),
        }
    }
}

impl Config {
    /// Loads the configuration, layering defaults, the TOML file (if given),
    /// and environment variables.
    ///
    /// Nested keys are separated by `__` in variable names, e.g.
    /// `SUPERVISOR_EMAIL__SMTP_SERVER=relay.example.com`.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = config_path {
            if !path.exists() {
                bail!("configuration file not found: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        let env = Env::prefixed(ENV_PREFIX).split("__");
        figment = figment.merge(env.clone().ignore(VERBATIM_ENV_KEYS));
        for (key, value) in env.only(VERBATIM_ENV_KEYS).iter() {
            figment = figment.merge(Serialized::default(key.as_str(), value));
        }

        let config: Config = figment.extract()?;
        Ok(config)
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            project_name: None,
            project_version: None,
            handle_errors: true,
            log_level: "info".to_string(),
            log_path: None,
            log_backups: 2,
            console: true,
            email: None,
            sendgrid: None,
        }
    }
}
