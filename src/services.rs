//! Encapsulation for setting up message handlers from configuration.

use crate::{
    config::Config,
    core::MessageHandler,
    notification::{ConsoleHandler, EmailHandler, SendGridHandler},
};
use std::sync::Arc;
use tracing::info;

/// Builds the handlers enabled in the configuration, in the order
/// console, email, SendGrid.
///
/// Incomplete email settings still produce a handler; it reports a
/// configuration error each time it is asked to send.
pub fn build_handlers(config: &Config) -> Vec<Arc<dyn MessageHandler>> {
    let mut handlers: Vec<Arc<dyn MessageHandler>> = Vec::new();

    if config.console {
        handlers.push(Arc::new(ConsoleHandler::new()));
    }

    if let Some(settings) = &config.email {
        let mut handler = EmailHandler::new(settings.clone());
        if let Some(name) = &config.project_name {
            handler = handler.with_project_name(name.clone());
        }
        if let Some(version) = &config.project_version {
            handler = handler.with_project_version(version.clone());
        }
        info!(server = %settings.smtp_server, "Email notifications enabled.");
        handlers.push(Arc::new(handler));
    }

    if let Some(settings) = &config.sendgrid {
        let mut handler = SendGridHandler::new(settings.clone());
        if let Some(name) = &config.project_name {
            handler = handler.with_project_name(name.clone());
        }
        if let Some(version) = &config.project_version {
            handler = handler.with_project_version(version.clone());
        }
        info!("SendGrid notifications enabled.");
        handlers.push(Arc::new(handler));
    }

    handlers
}
