//! Error types returned by message handlers.

use std::path::PathBuf;
use thiserror::Error;

/// Why a single handler failed to deliver a message.
///
/// The supervisor logs these and moves on to the next handler; they never
/// escape `Supervisor::notify`.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A required setting or message field is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The transport (SMTP server, HTTP API, output sink) failed or refused the message.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// An attachment exists but could not be read or packed.
    #[error("failed to pack attachment {}: {source}", path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The channel is declared but has no implementation.
    #[error("{0} notifications are not implemented")]
    NotImplemented(&'static str),
}

impl HandlerError {
    pub(crate) fn missing(what: &str) -> Self {
        Self::Configuration(format!("{what} is required"))
    }

    /// True for failures caused by how the handler or message was set up,
    /// rather than by the delivery channel.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::NotImplemented(_))
    }
}
