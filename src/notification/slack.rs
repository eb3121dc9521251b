//! Slack notifications.
//!
//! The channel itself is not built yet, but the Block Kit message model it
//! will post is: sections, context rows and dividers, trimmed to Slack's
//! size limits and split into payloads of at most [`MAX_BLOCKS`] blocks.

use crate::core::{MessageDetails, MessageHandler};
use crate::error::HandlerError;
use serde::Serialize;
use thiserror::Error;

pub const MAX_BLOCKS: usize = 50;
pub const MAX_CONTEXT_ELEMENTS: usize = 10;
pub const MAX_SECTION_FIELD_ELEMENTS: usize = 10;
pub const MAX_LENGTH_SECTION: usize = 3000;
pub const MAX_LENGTH_SECTION_FIELD: usize = 2000;

/// A block was given more elements than Slack accepts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("{block} blocks can hold a maximum of {max} elements, got {count}")]
    TooManyElements {
        block: &'static str,
        count: usize,
        max: usize,
    },
}

/// Markdown text object.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename = "mrkdwn")]
pub struct Text {
    pub text: String,
}

impl Text {
    /// Builds a text object, keeping at most `max_length` characters.
    pub fn to_text(text: &str, max_length: Option<usize>) -> Self {
        let text = match max_length {
            Some(max) => text.chars().take(max).collect(),
            None => text.to_string(),
        };
        Self { text }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SectionBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Text>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Text>,
}

impl SectionBlock {
    pub fn new(text: &str) -> Self {
        Self {
            text: Some(Text::to_text(text, Some(MAX_LENGTH_SECTION))),
            fields: Vec::new(),
        }
    }

    /// Adds two-column fields below the section text.
    pub fn with_fields<I, S>(mut self, fields: I) -> Result<Self, BlockError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.fields.extend(
            fields
                .into_iter()
                .map(|f| Text::to_text(f.as_ref(), Some(MAX_LENGTH_SECTION_FIELD))),
        );
        check_count("section", self.fields.len(), MAX_SECTION_FIELD_ELEMENTS)?;
        Ok(self)
    }
}

/// A row of small text under a section.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ContextBlock {
    pub elements: Vec<Text>,
}

impl ContextBlock {
    pub fn new<I, S>(elements: I) -> Result<Self, BlockError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let elements: Vec<Text> = elements
            .into_iter()
            .map(|e| Text::to_text(e.as_ref(), Some(MAX_LENGTH_SECTION_FIELD)))
            .collect();
        check_count("context", elements.len(), MAX_CONTEXT_ELEMENTS)?;
        Ok(Self { elements })
    }

    /// Spreads any number of elements over as many blocks as needed.
    pub fn split<S: AsRef<str>>(elements: &[S]) -> Vec<Self> {
        elements
            .chunks(MAX_CONTEXT_ELEMENTS)
            .map(|chunk| Self {
                elements: chunk
                    .iter()
                    .map(|e| Text::to_text(e.as_ref(), Some(MAX_LENGTH_SECTION_FIELD)))
                    .collect(),
            })
            .collect()
    }
}

fn check_count(block: &'static str, count: usize, max: usize) -> Result<(), BlockError> {
    if count > max {
        return Err(BlockError::TooManyElements { block, count, max });
    }
    Ok(())
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Section(SectionBlock),
    Context(ContextBlock),
    Divider,
}

impl From<SectionBlock> for Block {
    fn from(block: SectionBlock) -> Self {
        Block::Section(block)
    }
}

impl From<ContextBlock> for Block {
    fn from(block: ContextBlock) -> Self {
        Block::Context(block)
    }
}

/// A Slack message: fallback text plus a list of blocks.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    pub text: String,
}

#[derive(Serialize)]
struct Payload<'a> {
    #[serde(skip_serializing_if = "no_blocks")]
    blocks: &'a [Block],
    text: &'a str,
}

fn no_blocks(blocks: &&[Block]) -> bool {
    blocks.is_empty()
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            blocks: Vec::new(),
            text: text.into(),
        }
    }

    /// Lays out a notification as subject, divider and body.
    pub fn from_details(details: &MessageDetails) -> Self {
        let subject = details.subject().unwrap_or_default();
        let mut message = Self::new(subject);
        if !subject.is_empty() {
            message.add(SectionBlock::new(&format!("*{subject}*")));
            message.add(Block::Divider);
        }
        if let Some(body) = details.message() {
            message.add(SectionBlock::new(body));
        }
        message
    }

    pub fn add(&mut self, block: impl Into<Block>) {
        self.blocks.push(block.into());
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Renders one payload per [`MAX_BLOCKS`] blocks, each carrying the text.
    pub fn messages(&self) -> serde_json::Result<Vec<String>> {
        if self.blocks.is_empty() {
            return Ok(vec![self.to_json()?]);
        }
        self.blocks
            .chunks(MAX_BLOCKS)
            .map(|blocks| {
                serde_json::to_string_pretty(&Payload {
                    blocks,
                    text: &self.text,
                })
            })
            .collect()
    }
}

/// A Slack channel that has not been built yet. Every send fails with
/// [`HandlerError::NotImplemented`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SlackHandler;

impl SlackHandler {
    pub fn new() -> Self {
        Self
    }
}

impl MessageHandler for SlackHandler {
    fn name(&self) -> &str {
        "slack"
    }

    fn send(&self, _details: &MessageDetails) -> Result<(), HandlerError> {
        Err(HandlerError::NotImplemented("slack"))
    }
}
