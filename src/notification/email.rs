//! A handler for sending notification emails through an SMTP relay.

use crate::attachments::gzip_attachment;
use crate::config::EmailSettings;
use crate::core::{MessageDetails, MessageHandler};
use crate::error::HandlerError;
use crate::formatting::{email_body, email_subject};
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MailAttachment, Mailbox, MultiPart, SinglePart};
use lettre::{Message, SmtpTransport, Transport};
use std::time::Duration;
use tracing::{info, instrument};

/// Sends each message as a MIME email with gzipped attachments.
pub struct EmailHandler {
    settings: EmailSettings,
    project_name: Option<String>,
    project_version: Option<String>,
}

impl EmailHandler {
    /// Creates a new `EmailHandler`.
    pub fn new(settings: EmailSettings) -> Self {
        Self {
            settings,
            project_name: None,
            project_version: None,
        }
    }

    /// Names the project in the footer of every email.
    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    pub fn with_project_version(mut self, version: impl Into<String>) -> Self {
        self.project_version = Some(version.into());
        self
    }

    fn sender_and_recipients(&self) -> Result<(Mailbox, Vec<Mailbox>), HandlerError> {
        if self.settings.smtp_server.trim().is_empty() {
            return Err(HandlerError::missing("smtp_server"));
        }
        if self.settings.from_address.trim().is_empty() {
            return Err(HandlerError::missing("from_address"));
        }
        if self.settings.to_addresses.is_empty() {
            return Err(HandlerError::missing("to_addresses"));
        }

        let from = parse_mailbox(&self.settings.from_address)?;
        let to = self
            .settings
            .to_addresses
            .iter()
            .map(|address| parse_mailbox(address))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((from, to))
    }

    /// Builds the multipart message without sending it.
    pub fn compose(&self, details: &MessageDetails) -> Result<Message, HandlerError> {
        let (from, to) = self.sender_and_recipients()?;
        let subject = details
            .subject()
            .ok_or_else(|| HandlerError::missing("subject"))?;
        let message = details
            .message()
            .ok_or_else(|| HandlerError::missing("message"))?;

        let mut builder = Message::builder()
            .from(from)
            .subject(email_subject(self.settings.prefix.as_deref(), subject));
        for mailbox in to {
            builder = builder.to(mailbox);
        }

        let body = email_body(
            message,
            self.project_name.as_deref(),
            self.project_version.as_deref(),
        );
        let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(body));

        let gzip_type = ContentType::parse("application/gzip")
            .map_err(|e| HandlerError::Delivery(format!("invalid attachment content type: {e}")))?;
        for attachment in details.attachments() {
            if let Some(packed) = gzip_attachment(attachment)? {
                parts = parts.singlepart(
                    MailAttachment::new(packed.filename).body(packed.bytes, gzip_type.clone()),
                );
            }
        }

        builder
            .multipart(parts)
            .map_err(|e| HandlerError::Delivery(format!("failed to build message: {e}")))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, HandlerError> {
    address
        .parse()
        .map_err(|_| HandlerError::Configuration(format!("invalid email address: {address}")))
}

impl MessageHandler for EmailHandler {
    fn name(&self) -> &str {
        "email"
    }

    #[instrument(skip_all, fields(server = %self.settings.smtp_server, port = self.settings.smtp_port))]
    fn send(&self, details: &MessageDetails) -> Result<(), HandlerError> {
        let message = self.compose(details)?;

        let transport = SmtpTransport::builder_dangerous(&self.settings.smtp_server)
            .port(self.settings.smtp_port)
            .timeout(Some(Duration::from_secs(self.settings.timeout_seconds)))
            .build();

        transport
            .send(&message)
            .map_err(|e| HandlerError::Delivery(format!("SMTP error: {e}")))?;

        info!(
            recipients = self.settings.to_addresses.len(),
            "Successfully sent email notification."
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::net::TcpListener;
    use tempfile::TempDir;

    fn settings() -> EmailSettings {
        EmailSettings {
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 25,
            from_address: "noreply@example.com".to_string(),
            to_addresses: vec!["ops@example.com".to_string(), "dev@example.com".to_string()],
            prefix: Some("Nightly: ".to_string()),
            timeout_seconds: 1,
        }
    }

    fn formatted(message: &Message) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    #[test]
    fn test_compose_applies_prefix_footer_and_recipients() {
        // Arrange
        let handler = EmailHandler::new(settings())
            .with_project_name("parcel-sync")
            .with_project_version("1.2.0");
        let details = MessageDetails::new()
            .with_subject("Run Summary")
            .with_message("OK");

        // Act
        let message = handler.compose(&details).unwrap();

        // Assert
        let text = formatted(&message);
        assert!(text.contains("Subject: Nightly: Run Summary"));
        assert!(text.contains("ops@example.com"));
        assert!(text.contains("dev@example.com"));
        assert!(text.contains("OK"));
        assert!(text.contains("parcel-sync v1.2.0"));
        assert!(text.contains("multipart/mixed"));
    }

    #[test]
    fn test_compose_gzips_each_attachment() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("run.log");
        fs::write(&log, "started\nfinished\n").unwrap();
        let details = MessageDetails::new()
            .with_subject("Run Summary")
            .with_message("OK")
            .with_attachments(vec![log, dir.path().join("missing.csv")]);

        // Act
        let message = EmailHandler::new(settings()).compose(&details).unwrap();

        // Assert
        let text = formatted(&message);
        assert!(text.contains("run.log.gz"));
        assert!(text.contains("application/gzip"));
        assert!(!text.contains("missing.csv"));
    }

    #[test]
    fn test_missing_settings_is_a_configuration_error() {
        let mut incomplete = settings();
        incomplete.to_addresses.clear();
        let handler = EmailHandler::new(incomplete);
        let details = MessageDetails::new().with_subject("s").with_message("m");

        let result = handler.send(&details);

        assert!(matches!(result, Err(HandlerError::Configuration(_))));
    }

    #[test]
    fn test_missing_subject_is_a_configuration_error() {
        let handler = EmailHandler::new(settings());

        let result = handler.send(&MessageDetails::new().with_message("m"));

        assert!(matches!(result, Err(HandlerError::Configuration(_))));
    }

    #[test]
    fn test_invalid_address_is_a_configuration_error() {
        let mut bad = settings();
        bad.from_address = "not an address".to_string();

        let details = MessageDetails::new().with_subject("s").with_message("m");

        let result = EmailHandler::new(bad).compose(&details);

        assert!(matches!(result, Err(HandlerError::Configuration(_))));
    }

    #[test]
    fn test_unreachable_server_is_a_delivery_error() {
        // Arrange: grab a free port, then close it so nothing is listening.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut local = settings();
        local.smtp_server = "127.0.0.1".to_string();
        local.smtp_port = port;
        let details = MessageDetails::new().with_subject("s").with_message("m");

        // Act
        let result = EmailHandler::new(local).send(&details);

        // Assert
        assert!(matches!(result, Err(HandlerError::Delivery(_))));
    }
}
