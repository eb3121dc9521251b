//! A handler that prints the message body to the console.
//!
//! Subject and attachments are ignored.

use crate::core::{MessageDetails, MessageHandler};
use crate::error::HandlerError;
use std::io::{self, Write};
use std::sync::Mutex;

/// Writes each message's body, followed by a newline, to stdout.
pub struct ConsoleHandler {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleHandler {
    /// Creates a handler that writes to stdout.
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Creates a handler that writes to the given sink instead of stdout.
    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
        }
    }
}

impl Default for ConsoleHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHandler for ConsoleHandler {
    fn name(&self) -> &str {
        "console"
    }

    fn send(&self, details: &MessageDetails) -> Result<(), HandlerError> {
        let message = details
            .message()
            .ok_or_else(|| HandlerError::missing("message"))?;

        let mut out = self
            .out
            .lock()
            .map_err(|_| HandlerError::Delivery("console writer lock poisoned".into()))?;
        writeln!(out, "{message}")
            .and_then(|_| out.flush())
            .map_err(|e| HandlerError::Delivery(format!("failed to write to console: {e}")))
    }
}
