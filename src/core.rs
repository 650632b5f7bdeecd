//! Core domain types and service traits for Herald
//!
//! This module defines the message model and the two contracts the
//! orchestrator consumes: [`Target`], an addressable notification endpoint,
//! and [`Container`], a source that lazily yields targets.

use crate::error::IndexError;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The severity attached to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyType {
    #[default]
    Info,
    Success,
    Warning,
    Failure,
}

impl NotifyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Failure => "failure",
        }
    }
}

impl fmt::Display for NotifyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The content format a body is written in, or that a target expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyFormat {
    Text,
    Html,
    Markdown,
}

impl NotifyFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Html => "html",
            Self::Markdown => "markdown",
        }
    }
}

impl fmt::Display for NotifyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotifyFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "html" => Ok(Self::Html),
            "markdown" | "md" => Ok(Self::Markdown),
            other => anyhow::bail!("unknown notification format: {}", other),
        }
    }
}

/// A single attachment reference. The orchestrator never reads its content;
/// it is handed to each target as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Where the attachment lives (a path or a URL).
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl Attachment {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            name: None,
            mime_type: None,
        }
    }
}

/// The attachments accompanying one notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentBundle {
    pub attachments: Vec<Attachment>,
}

impl AttachmentBundle {
    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for AttachmentBundle {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            attachments: iter.into_iter().map(Attachment::new).collect(),
        }
    }
}

/// The payload delivered to one target, already adapted to its format.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub body: String,
    pub title: String,
    pub notify_type: NotifyType,
    pub attach: Option<Arc<AttachmentBundle>>,
}

// =============================================================================
// Service Traits
// =============================================================================

/// An individually addressable notification destination.
///
/// Targets are built once by a [`crate::registry::TargetFactory`] and shared by
/// reference afterwards; the orchestrator never mutates them.
#[async_trait]
pub trait Target: Send + Sync {
    /// Human-readable name of the service this target talks to.
    fn service_name(&self) -> &str;

    /// The descriptor this target can be rebuilt from.
    ///
    /// With `privacy` set, credentials must be masked.
    fn url(&self, privacy: bool) -> String;

    /// The tags this target was registered with.
    fn tags(&self) -> &HashSet<String>;

    /// The body format this target expects.
    fn notify_format(&self) -> NotifyFormat;

    /// Whether [`Target::notify_async`] suspends at I/O boundaries instead
    /// of blocking the calling thread.
    fn supports_async(&self) -> bool {
        false
    }

    /// Sends a message, blocking until the service has answered.
    ///
    /// # Returns
    /// * `Ok(true)` if the message was delivered
    /// * `Ok(false)` if the service refused it
    /// * `Err` if the target faulted while sending
    fn notify(&self, message: &Message) -> Result<bool>;

    /// Cooperative variant of [`Target::notify`].
    async fn notify_async(&self, message: &Message) -> Result<bool> {
        self.notify(message)
    }
}

impl fmt::Debug for dyn Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Target").field(&self.service_name()).finish()
    }
}

/// A grouping source that lazily yields zero or more targets.
///
/// A container is never itself addressable: it contributes only the targets
/// it expands to.
pub trait Container: Send + Sync {
    /// Expands the container into its ordered targets.
    fn targets(&self) -> Vec<Arc<dyn Target>>;

    fn len(&self) -> usize {
        self.targets().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<Arc<dyn Target>, IndexError> {
        let targets = self.targets();
        let len = targets.len();
        targets
            .into_iter()
            .nth(index)
            .ok_or(IndexError::OutOfRange { index, len })
    }

    /// Removes and returns the target at `index`.
    fn pop(&self, index: usize) -> Result<Arc<dyn Target>, IndexError>;
}
