#![allow(dead_code)]
use std::sync::{Arc, Mutex};
use supervisor::{HandlerError, MessageDetails, MessageHandler};

/// Every delivery seen by the mock handlers of one test, in call order.
#[derive(Clone, Debug, Default)]
pub struct DeliveryLog {
    entries: Arc<Mutex<Vec<(String, MessageDetails)>>>,
}

impl DeliveryLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, handler: &str, details: &MessageDetails) {
        self.entries
            .lock()
            .unwrap()
            .push((handler.to_string(), details.clone()));
    }

    /// Names of the handlers that were called, in order.
    pub fn handler_names(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn deliveries(&self) -> Vec<(String, MessageDetails)> {
        self.entries.lock().unwrap().clone()
    }
}

/// How a mock handler behaves when asked to send.
#[derive(Clone, Copy, Debug)]
pub enum Behavior {
    Succeed,
    FailConfiguration,
    FailDelivery,
    Panic,
}

/// A mock handler that records each call, then behaves as configured.
#[derive(Clone, Debug)]
pub struct MockHandler {
    name: String,
    behavior: Behavior,
    log: DeliveryLog,
}

impl MockHandler {
    pub fn new(name: &str, behavior: Behavior, log: &DeliveryLog) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            log: log.clone(),
        }
    }

    pub fn recording(name: &str, log: &DeliveryLog) -> Arc<dyn MessageHandler> {
        Arc::new(Self::new(name, Behavior::Succeed, log))
    }

    pub fn failing(name: &str, behavior: Behavior, log: &DeliveryLog) -> Arc<dyn MessageHandler> {
        Arc::new(Self::new(name, behavior, log))
    }
}

impl MessageHandler for MockHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, details: &MessageDetails) -> Result<(), HandlerError> {
        self.log.record(&self.name, details);
        match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::FailConfiguration => {
                Err(HandlerError::Configuration("to_addresses is required".into()))
            }
            Behavior::FailDelivery => Err(HandlerError::Delivery("connection refused".into())),
            Behavior::Panic => panic!("mock handler {} panicked", self.name),
        }
    }
}
