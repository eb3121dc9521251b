//! Core domain types and the handler contract for Supervisor
//!
//! This module defines the message that crosses from caller code into the
//! notification layer, and the trait every delivery channel implements.

use crate::error::HandlerError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A single item attached to a notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Attachment {
    /// A file or directory on disk. Existence is checked by the handler that packs it.
    Path(PathBuf),
    /// An in-memory text blob, attached under `name`.
    Text { name: String, contents: String },
}

impl Attachment {
    /// Creates a text blob attachment.
    pub fn text(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self::Text {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// The name the attachment is known by: the file name for paths, `name` for blobs.
    pub fn name(&self) -> String {
        match self {
            Self::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Self::Text { name, .. } => name.clone(),
        }
    }
}

impl From<&str> for Attachment {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<String> for Attachment {
    fn from(path: String) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<&Path> for Attachment {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for Attachment {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

/// Anything that can be appended to a message's attachments: one item or a sequence of them.
pub trait IntoAttachments {
    fn into_attachments(self) -> Vec<Attachment>;
}

impl IntoAttachments for Attachment {
    fn into_attachments(self) -> Vec<Attachment> {
        vec![self]
    }
}

impl IntoAttachments for &str {
    fn into_attachments(self) -> Vec<Attachment> {
        vec![self.into()]
    }
}

impl IntoAttachments for String {
    fn into_attachments(self) -> Vec<Attachment> {
        vec![self.into()]
    }
}

impl IntoAttachments for &Path {
    fn into_attachments(self) -> Vec<Attachment> {
        vec![self.into()]
    }
}

impl IntoAttachments for PathBuf {
    fn into_attachments(self) -> Vec<Attachment> {
        vec![self.into()]
    }
}

impl<T: Into<Attachment>> IntoAttachments for Vec<T> {
    fn into_attachments(self) -> Vec<Attachment> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<Attachment>, const N: usize> IntoAttachments for [T; N] {
    fn into_attachments(self) -> Vec<Attachment> {
        self.into_iter().map(Into::into).collect()
    }
}

/// The subject, body, and attachments of one notification.
///
/// Built fresh for each `notify` call. Attachments only ever accumulate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageDetails {
    subject: Option<String>,
    message: Option<String>,
    attachments: Vec<Attachment>,
}

impl MessageDetails {
    /// Creates an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = Some(subject.into());
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Appends one attachment or a sequence of them, preserving order.
    pub fn attach(&mut self, items: impl IntoAttachments) {
        self.attachments.extend(items.into_attachments());
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.set_subject(subject);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.set_message(message);
        self
    }

    pub fn with_attachments(mut self, items: impl IntoAttachments) -> Self {
        self.attach(items);
        self
    }
}

// =============================================================================
// Handler Trait
// =============================================================================

/// Delivers a [`MessageDetails`] to one channel (console, email, ...).
pub trait MessageHandler: Send + Sync {
    /// A short, descriptive name for the handler (e.g., "console", "email").
    /// Used for logging.
    fn name(&self) -> &str;

    /// Formats and delivers the message.
    ///
    /// # Returns
    /// * `Ok(())` if the message was handed to the channel
    /// * `Err(HandlerError::Configuration)` if a required setting or field is missing
    /// * `Err(HandlerError::Delivery)` if the channel rejected or failed to deliver it
    fn send(&self, details: &MessageDetails) -> Result<(), HandlerError>;
}
