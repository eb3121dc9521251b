//! Delivery channels for notifications.
//!
//! Each channel implements [`MessageHandler`](crate::core::MessageHandler) and
//! is registered with a [`Supervisor`](crate::supervisor::Supervisor), which
//! hands every message to every channel in registration order.
pub mod console;
pub mod email;
pub mod sendgrid;
pub mod slack;

pub use console::ConsoleHandler;
pub use email::EmailHandler;
pub use sendgrid::SendGridHandler;
pub use slack::SlackHandler;
