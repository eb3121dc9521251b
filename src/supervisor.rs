//! The supervisor fans each notification out to every registered handler
//! and reports failures that escape the program's entry point.

use crate::config::Config;
use crate::core::{MessageDetails, MessageHandler};
use crate::services::build_handlers;
use crate::unhandled::{self, panic_message, UnhandledError};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Holds the registered handlers and the settings used for error reports.
///
/// Construct one at the start of the script and pass it to whatever needs to
/// send notifications.
pub struct Supervisor {
    handlers: Vec<Arc<dyn MessageHandler>>,
    log_path: Option<PathBuf>,
    project_name: Option<String>,
    project_version: Option<String>,
    handle_errors: bool,
}

/// Builder for [`Supervisor`].
pub struct SupervisorBuilder {
    handlers: Vec<Arc<dyn MessageHandler>>,
    log_path: Option<PathBuf>,
    project_name: Option<String>,
    project_version: Option<String>,
    handle_errors: bool,
}

impl Default for SupervisorBuilder {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
            log_path: None,
            project_name: None,
            project_version: None,
            handle_errors: true,
        }
    }
}

impl SupervisorBuilder {
    /// Log file attached to error reports.
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    pub fn project_version(mut self, version: impl Into<String>) -> Self {
        self.project_version = Some(version.into());
        self
    }

    /// Whether `Supervisor::run` reports escaping errors. Defaults to `true`.
    pub fn handle_errors(mut self, enabled: bool) -> Self {
        self.handle_errors = enabled;
        self
    }

    /// Registers a handler; handlers are called in the order they are added.
    pub fn handler(mut self, handler: Arc<dyn MessageHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn build(self) -> Supervisor {
        if self.handle_errors {
            unhandled::install_panic_hook();
        }
        Supervisor {
            handlers: self.handlers,
            log_path: self.log_path,
            project_name: self.project_name,
            project_version: self.project_version,
            handle_errors: self.handle_errors,
        }
    }
}

impl Supervisor {
    /// Creates a supervisor with no handlers and error reporting enabled.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::default()
    }

    /// Creates a supervisor with the handlers and settings described by `config`.
    pub fn from_config(config: &Config) -> Self {
        let mut builder = Self::builder().handle_errors(config.handle_errors);
        if let Some(path) = &config.log_path {
            builder = builder.log_path(path.clone());
        }
        if let Some(name) = &config.project_name {
            builder = builder.project_name(name.clone());
        }
        if let Some(version) = &config.project_version {
            builder = builder.project_version(version.clone());
        }
        for handler in build_handlers(config) {
            builder = builder.handler(handler);
        }
        let supervisor = builder.build();
        info!(handlers = ?supervisor.handler_names(), "Supervisor configured.");
        supervisor
    }

    /// Appends a handler. The same handler may be added more than once and
    /// is then called once per registration.
    pub fn add_message_handler(&mut self, handler: Arc<dyn MessageHandler>) {
        debug!(handler = handler.name(), "Registering message handler");
        self.handlers.push(handler);
    }

    pub fn handlers(&self) -> &[Arc<dyn MessageHandler>] {
        &self.handlers
    }

    fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn handle_errors(&self) -> bool {
        self.handle_errors
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    pub fn project_version(&self) -> Option<&str> {
        self.project_version.as_deref()
    }

    /// Sends `details` to every handler, in registration order.
    ///
    /// A handler that fails or panics is logged and skipped; the remaining
    /// handlers still run. This never returns an error.
    pub fn notify(&self, details: &MessageDetails) {
        debug!(handlers = self.handlers.len(), "Dispatching notification");

        for handler in &self.handlers {
            let name = handler.name();
            match panic::catch_unwind(AssertUnwindSafe(|| handler.send(details))) {
                Ok(Ok(())) => {
                    debug!(handler = name, "Notification delivered");
                }
                Ok(Err(e)) if e.is_configuration() => {
                    warn!(handler = name, error = %e, "Handler could not send notification");
                }
                Ok(Err(e)) => {
                    error!(handler = name, error = %e, "Handler failed to deliver notification");
                }
                Err(payload) => {
                    unhandled::discard_captured_panic();
                    error!(
                        handler = name,
                        panic = %panic_message(&*payload),
                        "Handler panicked while sending notification"
                    );
                }
            }
        }
    }

    /// Runs the program's entry point inside the error boundary.
    ///
    /// If `entry` returns an error or panics, the failure is logged and sent
    /// to every handler (with the log file attached), then the error is
    /// returned or the panic resumed so the process still fails. With error
    /// handling disabled, `entry` is simply called.
    ///
    /// Panic locations and backtraces are recorded by a hook on the panicking
    /// thread. A worker's panic re-raised here with `resume_unwind` is
    /// reported by its message only.
    pub fn run<T, E, F>(&self, entry: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: fmt::Debug + fmt::Display,
    {
        if !self.handle_errors {
            return entry();
        }

        unhandled::discard_captured_panic();
        match panic::catch_unwind(AssertUnwindSafe(entry)) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                self.report_unhandled(&UnhandledError::from_error(&err));
                Err(err)
            }
            Err(payload) => {
                self.report_unhandled(&UnhandledError::from_panic(&*payload));
                panic::resume_unwind(payload)
            }
        }
    }

    /// Logs `failure` and sends a report about it to every handler.
    pub fn report_unhandled(&self, failure: &UnhandledError) {
        error!(
            kind = ?failure.kind,
            error = %failure.description,
            "{}",
            failure.details
        );
        let details = failure.to_message(self.project_name(), self.log_path());
        self.notify(&details);
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("handlers", &self.handler_names())
            .field("log_path", &self.log_path)
            .field("project_name", &self.project_name)
            .field("project_version", &self.project_version)
            .field("handle_errors", &self.handle_errors)
            .finish()
    }
}
