//! An example scheduled script: sends a run summary, then fails so the
//! error report (with the log attached) goes out through the same channels.
//!
//! Configure channels in a TOML file passed as the first argument, or with
//! environment variables such as `SUPERVISOR_SENDGRID__API_KEY`.

use anyhow::{bail, Result};
use std::path::PathBuf;
use supervisor::config::Config;
use supervisor::{logging, MessageDetails, Supervisor};
use tracing::info;

fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let mut config = Config::load(config_path.as_deref())?;
    config.project_name.get_or_insert_with(|| "supervisor-example".to_string());
    config.project_version.get_or_insert_with(|| supervisor::VERSION.to_string());
    config
        .log_path
        .get_or_insert_with(|| std::env::temp_dir().join("supervisor_example.log"));

    logging::init(&config)?;
    let supervisor = Supervisor::from_config(&config);

    supervisor.run(|| {
        info!("Starting example run");

        let mut summary = MessageDetails::new();
        summary.set_subject("[Supervisor Example]");
        summary.set_message("This is an example message\nwith a newline\nor two.");
        if let Some(log) = &config.log_path {
            summary.attach(log.clone());
        }
        supervisor.notify(&summary);

        bail!("random error here")
    })
}
