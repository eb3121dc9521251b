//! Integration tests for reporting failures that escape the entry point.

mod helpers;

use anyhow::{anyhow, Context, Result};
use helpers::mock_handler::{Behavior, DeliveryLog, MockHandler};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use supervisor::{Attachment, Supervisor};
use tracing_test::traced_test;

#[test]
fn test_returned_error_is_reported_once_then_returned() {
    // Arrange
    let log = DeliveryLog::new();
    let supervisor = Supervisor::builder()
        .project_name("parcel-sync")
        .log_path("/var/log/parcel-sync.log")
        .handler(MockHandler::recording("email", &log))
        .build();

    // Act
    let result: Result<()> = supervisor.run(|| {
        Err::<(), _>(anyhow!("random error here")).context("nightly load failed")
    });

    // Assert
    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "nightly load failed");

    let deliveries = log.deliveries();
    assert_eq!(deliveries.len(), 1);
    let details = &deliveries[0].1;
    assert_eq!(details.subject(), Some("parcel-sync: Unhandled error"));
    let message = details.message().unwrap();
    assert!(message.contains("nightly load failed"));
    assert!(message.contains("random error here"));
    assert_eq!(
        details.attachments(),
        &[Attachment::Path(PathBuf::from("/var/log/parcel-sync.log"))]
    );
}

#[test]
fn test_successful_run_sends_nothing() {
    let log = DeliveryLog::new();
    let supervisor = Supervisor::builder()
        .handler(MockHandler::recording("email", &log))
        .build();

    let value: Result<u32> = supervisor.run(|| Ok(42));

    assert_eq!(value.unwrap(), 42);
    assert!(log.deliveries().is_empty());
}

#[test]
fn test_panic_is_reported_then_resumed() {
    // Arrange
    let log = DeliveryLog::new();
    let supervisor = Supervisor::builder()
        .handler(MockHandler::recording("email", &log))
        .build();

    // Act
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        supervisor.run(|| -> Result<()> { panic!("index out of range") })
    }));

    // Assert
    assert!(outcome.is_err(), "the panic should keep unwinding");
    let deliveries = log.deliveries();
    assert_eq!(deliveries.len(), 1);
    let details = &deliveries[0].1;
    assert_eq!(details.subject(), Some("Unhandled error"));
    let message = details.message().unwrap();
    assert!(message.contains("index out of range"));
    assert!(message.contains("error_boundary.rs"));
    assert!(details.attachments().is_empty());
}

#[test]
fn test_disabled_error_handling_sends_nothing() {
    let log = DeliveryLog::new();
    let supervisor = Supervisor::builder()
        .handle_errors(false)
        .handler(MockHandler::recording("email", &log))
        .build();

    let result: Result<()> = supervisor.run(|| Err(anyhow!("boom")));
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        supervisor.run(|| -> Result<()> { panic!("boom") })
    }));

    assert!(result.is_err());
    assert!(outcome.is_err());
    assert!(log.deliveries().is_empty());
}

#[test]
fn test_report_survives_failing_handlers() {
    let log = DeliveryLog::new();
    let supervisor = Supervisor::builder()
        .handler(MockHandler::failing("broken", Behavior::FailDelivery, &log))
        .handler(MockHandler::recording("console", &log))
        .build();

    let result: Result<()> = supervisor.run(|| Err(anyhow!("boom")));

    assert!(result.is_err());
    assert_eq!(log.handler_names(), vec!["broken", "console"]);
}

#[test]
#[traced_test]
fn test_unhandled_error_is_logged_at_error_level() {
    let supervisor = Supervisor::new();

    let _: Result<()> = supervisor.run(|| Err(anyhow!("disk quota exceeded")));

    assert!(logs_contain("ERROR"));
    assert!(logs_contain("disk quota exceeded"));
}

#[test]
fn test_resumed_worker_panic_is_not_labelled_with_a_caught_one() {
    // Arrange
    let log = DeliveryLog::new();
    let supervisor = Supervisor::builder()
        .handler(MockHandler::recording("email", &log))
        .build();

    // Act
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        supervisor.run(|| -> Result<()> {
            let _ = panic::catch_unwind(|| {
                panic!("handled inside the job");
            });
            let worker = std::thread::spawn(|| {
                panic!("worker failed");
            });
            panic::resume_unwind(worker.join().unwrap_err())
        })
    }));

    // Assert
    assert!(outcome.is_err());
    let deliveries = log.deliveries();
    assert_eq!(deliveries.len(), 1);
    let message = deliveries[0].1.message().unwrap();
    assert!(message.contains("panicked: worker failed"));
    assert!(!message.contains("handled inside the job"));
}

#[test]
fn test_plain_io_error_report_is_readable() {
    // Arrange
    let log = DeliveryLog::new();
    let supervisor = Supervisor::builder()
        .handler(MockHandler::recording("email", &log))
        .build();

    // Act
    let result = supervisor.run(|| std::fs::read("/no/such/file").map(|_| ()));

    // Assert
    let err = result.unwrap_err();
    let deliveries = log.deliveries();
    assert_eq!(deliveries.len(), 1);
    let message = deliveries[0].1.message().unwrap();
    assert!(message.starts_with(&err.to_string()));
    assert!(message.contains("stack backtrace"));
}
