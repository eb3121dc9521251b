/// Supervisor - a watchdog for scheduled scripts
///
/// This library sends notifications (run summaries, reports) through one or
/// more delivery channels, and reports any error or panic that escapes the
/// script's entry point through the same channels before the process exits.
pub mod notification;

pub mod attachments;
pub mod config;
pub mod core;
pub mod error;
pub mod formatting;
pub mod logging;
pub mod services;
pub mod supervisor;
pub mod unhandled;

// Re-export core types for convenience
pub use crate::core::*;
pub use crate::error::HandlerError;
pub use crate::supervisor::{Supervisor, SupervisorBuilder};
pub use crate::unhandled::{FailureKind, UnhandledError};

/// The version of this library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
