//! A handler for sending notification emails through the SendGrid v3 API.

use crate::attachments::zip_attachment;
use crate::config::SendGridSettings;
use crate::core::{MessageDetails, MessageHandler};
use crate::error::HandlerError;
use crate::formatting::{email_body, email_subject};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info, instrument};

/// The SendGrid endpoint used unless overridden.
pub const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// Sends each message as a plain-text email with zipped attachments.
pub struct SendGridHandler {
    settings: SendGridSettings,
    project_name: Option<String>,
    project_version: Option<String>,
    endpoint: String,
    timeout: Duration,
}

impl SendGridHandler {
    /// Creates a new `SendGridHandler`.
    pub fn new(settings: SendGridSettings) -> Self {
        Self {
            settings,
            project_name: None,
            project_version: None,
            endpoint: SENDGRID_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    pub fn with_project_version(mut self, version: impl Into<String>) -> Self {
        self.project_version = Some(version.into());
        self
    }

    /// Sends to a different URL, e.g. a proxy or a test server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn validate_settings(&self) -> Result<(), HandlerError> {
        if self.settings.api_key.trim().is_empty() {
            return Err(HandlerError::missing("api_key"));
        }
        if self.settings.from_address.trim().is_empty() {
            return Err(HandlerError::missing("from_address"));
        }
        if self.settings.to_addresses.is_empty() {
            return Err(HandlerError::missing("to_addresses"));
        }
        Ok(())
    }

    /// Builds the JSON request body for the mail/send endpoint.
    pub fn build_payload(&self, details: &MessageDetails) -> Result<Value, HandlerError> {
        self.validate_settings()?;
        let subject = details
            .subject()
            .ok_or_else(|| HandlerError::missing("subject"))?;
        let message = details
            .message()
            .ok_or_else(|| HandlerError::missing("message"))?;

        let to: Vec<Value> = self
            .settings
            .to_addresses
            .iter()
            .map(|address| json!({ "email": address }))
            .collect();

        let body = email_body(
            message,
            self.project_name.as_deref(),
            self.project_version.as_deref(),
        );

        let mut payload = json!({
            "personalizations": [{ "to": to }],
            "from": { "email": self.settings.from_address },
            "subject": email_subject(self.settings.prefix.as_deref(), subject),
            "content": [{ "type": "text/plain", "value": body }],
        });

        let mut attachments = Vec::new();
        for attachment in details.attachments() {
            if let Some(packed) = zip_attachment(attachment)? {
                attachments.push(json!({
                    "content": STANDARD.encode(&packed.bytes),
                    "filename": packed.filename,
                    "type": "application/zip",
                    "disposition": "attachment",
                }));
            }
        }
        if !attachments.is_empty() {
            payload["attachments"] = Value::Array(attachments);
        }

        Ok(payload)
    }

    /// Sends the request in a blocking manner.
    fn send_request(
        client: reqwest::blocking::Client,
        endpoint: &str,
        api_key: &str,
        payload: &Value,
    ) -> Result<(), HandlerError> {
        let response = client
            .post(endpoint)
            .bearer_auth(api_key)
            .json(payload)
            .send();

        match response {
            Ok(res) => {
                if res.status().is_success() {
                    Ok(())
                } else {
                    let status = res.status();
                    let text = res.text().unwrap_or_default();
                    error!(
                        status = %status,
                        body = %text,
                        "SendGrid rejected the notification"
                    );
                    Err(HandlerError::Delivery(format!(
                        "SendGrid returned status {status}, body: {text}"
                    )))
                }
            }
            Err(e) => {
                error!(error = %e, "HTTP request to SendGrid failed");
                Err(HandlerError::Delivery(format!("HTTP request to SendGrid failed: {e}")))
            }
        }
    }
}

impl MessageHandler for SendGridHandler {
    fn name(&self) -> &str {
        "sendgrid"
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    fn send(&self, details: &MessageDetails) -> Result<(), HandlerError> {
        let payload = self.build_payload(details)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| HandlerError::Delivery(format!("failed to build HTTP client: {e}")))?;
        Self::send_request(client, &self.endpoint, &self.settings.api_key, &payload)?;

        info!(
            recipients = self.settings.to_addresses.len(),
            "Successfully sent SendGrid notification."
        );
        Ok(())
    }
}
