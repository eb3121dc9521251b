//! Descriptions of failures that escaped the program's entry point.
//!
//! Panics carry only their payload through `catch_unwind`, so a panic hook
//! records where the panic happened and the backtrace at that point. The
//! record is kept per thread and picked up when the report is built, but only
//! if its message matches the payload being reported.

use crate::core::MessageDetails;
use crate::formatting::unhandled_subject;
use chrono::{DateTime, Utc};
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::fmt;
use std::panic;
use std::path::Path;
use std::sync::Once;

/// How the failure left the entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Error,
    Panic,
}

/// An error or panic that reached the top of the program.
#[derive(Debug, Clone)]
pub struct UnhandledError {
    pub kind: FailureKind,
    /// One-line description, e.g. the error's `Display` output or the panic message.
    pub description: String,
    /// Full report text: cause chain, location, backtrace.
    pub details: String,
    pub occurred_at: DateTime<Utc>,
}

struct CapturedPanic {
    message: String,
    location: String,
    backtrace: String,
}

thread_local! {
    static LAST_PANIC: RefCell<Option<CapturedPanic>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Heading `anyhow::Error` writes before its own backtrace.
const ANYHOW_BACKTRACE_HEADER: &str = "Stack backtrace:";

/// Installs the process-wide panic hook once. The previous hook still runs,
/// so the usual panic message is printed as well.
pub(crate) fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|l| l.to_string())
                .unwrap_or_else(|| "unknown location".to_string());
            let backtrace = Backtrace::force_capture().to_string();
            let message = panic_message(info.payload());
            let _ = LAST_PANIC.try_with(|slot| {
                *slot.borrow_mut() = Some(CapturedPanic {
                    message,
                    location,
                    backtrace,
                });
            });
            previous(info);
        }));
    });
}

fn take_captured_panic() -> Option<CapturedPanic> {
    LAST_PANIC.try_with(|slot| slot.borrow_mut().take()).ok().flatten()
}

/// Drops the record of a panic that was caught and handled elsewhere.
pub(crate) fn discard_captured_panic() {
    let _ = take_captured_panic();
}

/// Extracts the message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

impl UnhandledError {
    /// Describes an error returned from the entry point.
    ///
    /// The details use the error's `Debug` output, which for `anyhow::Error`
    /// includes the cause chain. Unless that output already carries a
    /// backtrace, one is captured here, at the boundary.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: fmt::Debug + fmt::Display + ?Sized,
    {
        let mut details = format!("{err:?}");
        if !details.contains(ANYHOW_BACKTRACE_HEADER) {
            details.push_str("\n\nstack backtrace (captured at the error boundary):\n");
            details.push_str(&Backtrace::force_capture().to_string());
        }
        Self {
            kind: FailureKind::Error,
            description: err.to_string(),
            details,
            occurred_at: Utc::now(),
        }
    }

    /// Describes a panic caught at the entry point.
    ///
    /// Location and backtrace are only known when the panic went through the
    /// hook on this thread. A payload re-raised with `resume_unwind`, e.g.
    /// from a joined worker thread, is reported by its message alone.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let description = panic_message(payload);
        let captured = take_captured_panic().filter(|c| c.message == description);
        let details = match captured {
            Some(captured) => format!(
                "panicked at {}:\n{}\n\nstack backtrace:\n{}",
                captured.location, description, captured.backtrace
            ),
            None => format!("panicked: {description}"),
        };
        Self {
            kind: FailureKind::Panic,
            description,
            details,
            occurred_at: Utc::now(),
        }
    }

    /// Builds the notification describing this failure, attaching the log file if one is set.
    pub fn to_message(&self, project_name: Option<&str>, log_path: Option<&Path>) -> MessageDetails {
        let mut details = MessageDetails::new()
            .with_subject(unhandled_subject(project_name))
            .with_message(format!(
                "{}\n\n{}\n\nOccurred at {}",
                self.description,
                self.details,
                self.occurred_at.to_rfc3339()
            ));
        if let Some(path) = log_path {
            details.attach(path);
        }
        details
    }
}

impl fmt::Display for UnhandledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Error => write!(f, "unhandled error: {}", self.description),
            FailureKind::Panic => write!(f, "unhandled panic: {}", self.description),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Attachment;
    use anyhow::Context;
    use std::path::PathBuf;

    #[test]
    fn test_from_error_includes_cause_chain() {
        let err = std::fs::read("/no/such/file")
            .context("failed to load parcels")
            .unwrap_err();

        let unhandled = UnhandledError::from_error(&err);

        assert_eq!(unhandled.kind, FailureKind::Error);
        assert_eq!(unhandled.description, "failed to load parcels");
        assert!(unhandled.details.contains("Caused by"));
    }

    #[test]
    fn test_plain_error_gets_description_and_backtrace() {
        let err = std::fs::read("/no/such/file").unwrap_err();

        let unhandled = UnhandledError::from_error(&err);
        let message = unhandled.to_message(None, None);
        let body = message.message().unwrap();

        assert!(body.starts_with(&err.to_string()));
        assert!(body.contains("NotFound"));
        assert!(body.contains("stack backtrace (captured at the error boundary)"));
        assert!(body.contains("Occurred at"));
    }

    #[test]
    fn test_from_panic_uses_hook_location() {
        // Arrange
        install_panic_hook();

        // Act
        let payload = panic::catch_unwind(|| {
            panic!("random error here");
        })
        .unwrap_err();
        let unhandled = UnhandledError::from_panic(&*payload);

        // Assert
        assert_eq!(unhandled.kind, FailureKind::Panic);
        assert_eq!(unhandled.description, "random error here");
        assert!(unhandled.details.contains("unhandled.rs"));
        assert!(unhandled.details.contains("stack backtrace"));
    }

    #[test]
    fn test_panic_message_variants() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let other: Box<dyn Any + Send> = Box::new(7_u8);

        assert_eq!(panic_message(&*owned), "owned");
        assert_eq!(panic_message(&*other), "Box<dyn Any>");
    }

    #[test]
    fn test_to_message_attaches_log() {
        let unhandled = UnhandledError::from_error("disk full");

        let details = unhandled.to_message(Some("etl"), Some(Path::new("/var/log/etl.log")));

        assert_eq!(details.subject(), Some("etl: Unhandled error"));
        assert!(details.message().unwrap().starts_with("disk full\n\n"));
        assert_eq!(
            details.attachments(),
            &[Attachment::Path(PathBuf::from("/var/log/etl.log"))]
        );
    }
}
