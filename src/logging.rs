//! Logging setup for supervised scripts.
//!
//! Events go to stderr and, when a log path is configured, to that file as
//! well. The file is written without buffering so it is complete by the time
//! it is attached to an error report.

use crate::config::Config;
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.log_level`. The log file, if any,
/// is rotated first so each run starts a fresh file. Fails if a global
/// subscriber is already installed.
pub fn init(config: &Config) -> Result<()> {
    subscriber(config)?
        .try_init()
        .context("failed to install the tracing subscriber")?;
    Ok(())
}

fn subscriber(config: &Config) -> Result<impl Subscriber + Send + Sync + 'static> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .with_context(|| format!("invalid log level: {}", config.log_level))?,
    };

    let file_layer = match &config.log_path {
        Some(path) => {
            rotate(path, config.log_backups)
                .with_context(|| format!("failed to rotate log file {}", path.display()))?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    Ok(tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer))
}

/// Shifts `path` to `path.1`, `path.1` to `path.2`, and so on, keeping at
/// most `backups` old copies. With `backups == 0` the old log is removed.
pub fn rotate(path: &Path, backups: usize) -> io::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    if backups == 0 {
        return fs::remove_file(path);
    }

    let oldest = backup_path(path, backups);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..backups).rev() {
        let from = backup_path(path, n);
        if from.exists() {
            fs::rename(&from, backup_path(path, n + 1))?;
        }
    }
    fs::rename(path, backup_path(path, 1))
}

fn backup_path(path: &Path, n: usize) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{n}"));
    PathBuf::from(name)
}
