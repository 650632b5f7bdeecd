//! A target that writes notifications to the application log.
//!
//! Useful for validating a fan-out setup and for debugging: `log://` logs at
//! INFO, `log://warn` (or `log://?level=warn`) at the named level.

use crate::config::Asset;
use crate::core::{Message, NotifyFormat, Target};
use crate::descriptor::Descriptor;
use crate::registry::TargetFactory;
use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::Level;

pub struct LogTarget {
    level: Level,
    tags: HashSet<String>,
    asset: Arc<Asset>,
}

impl LogTarget {
    pub fn new(level: Level, tags: HashSet<String>, asset: Arc<Asset>) -> Self {
        Self { level, tags, asset }
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

macro_rules! log_at {
    ($level:expr, $($args:tt)+) => {
        match $level {
            Level::ERROR => tracing::error!($($args)+),
            Level::WARN => tracing::warn!($($args)+),
            Level::INFO => tracing::info!($($args)+),
            Level::DEBUG => tracing::debug!($($args)+),
            _ => tracing::trace!($($args)+),
        }
    };
}

#[async_trait]
impl Target for LogTarget {
    fn service_name(&self) -> &str {
        "Log"
    }

    fn url(&self, _privacy: bool) -> String {
        if self.level == Level::INFO {
            "log://".to_string()
        } else {
            format!("log://{}", self.level.as_str().to_ascii_lowercase())
        }
    }

    fn tags(&self) -> &HashSet<String> {
        &self.tags
    }

    fn notify_format(&self) -> NotifyFormat {
        NotifyFormat::Text
    }

    fn supports_async(&self) -> bool {
        true
    }

    fn notify(&self, message: &Message) -> anyhow::Result<bool> {
        let attachments = message.attach.as_ref().map_or(0, |a| a.len());
        log_at!(
            self.level,
            app = %self.asset.app_id,
            notify_type = %message.notify_type,
            title = %message.title,
            attachments,
            "{}",
            message.body
        );
        Ok(true)
    }

    async fn notify_async(&self, message: &Message) -> anyhow::Result<bool> {
        self.notify(message)
    }
}

/// Builds [`LogTarget`]s from `log://` descriptors.
pub struct LogTargetFactory;

impl TargetFactory for LogTargetFactory {
    fn service_name(&self) -> &str {
        "Log"
    }

    fn protocols(&self) -> &[&'static str] {
        &["log"]
    }

    fn build(
        &self,
        descriptor: &Descriptor,
        tags: HashSet<String>,
        asset: Arc<Asset>,
    ) -> anyhow::Result<Arc<dyn Target>> {
        let level = match descriptor.get("level").or(descriptor.host()) {
            Some(level) => level
                .parse::<Level>()
                .with_context(|| format!("unknown log level: {}", level))?,
            None => Level::INFO,
        };
        Ok(Arc::new(LogTarget::new(level, tags, asset)))
    }

    fn details(&self, _locale: Option<&str>) -> serde_json::Value {
        json!({
            "templates": ["{schema}://", "{schema}://{level}"],
            "args": {
                "level": {
                    "values": ["error", "warn", "info", "debug", "trace"],
                    "default": "info",
                },
            },
        })
    }
}
