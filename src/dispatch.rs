//! The dispatch engine.
//!
//! Dispatch happens in two phases. [`prepare`] runs on the calling path: it
//! checks the preconditions, filters the collection by tag, and adapts the
//! body once per target format. The resulting [`Delivery`] list is then fanned
//! out by [`run_sequential`] or [`run_concurrent`], and [`aggregate`] folds
//! the per-target results into an [`Outcome`].

use crate::collection::Collection;
use crate::config::Asset;
use crate::core::{AttachmentBundle, Message, NotifyFormat, NotifyType, Target};
use crate::error::DispatchError;
use crate::formatting::{interpret_escapes, ConversionCache};
use crate::internal_metrics::increment_target_failure;
use crate::tags::TagExpr;
use futures::future::{join_all, FutureExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::task;
use tracing::{debug, error, warn};

/// Tri-state result of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Every matched target accepted the message.
    Success,
    /// At least one matched target failed.
    Failure,
    /// No target matched.
    None,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::None => "none",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How matched targets are invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    /// Each target's blocking contract, one after another, in filter order.
    #[default]
    Sequential,
    /// All targets at once; cooperative targets share the run loop and
    /// blocking ones are moved onto the blocking pool.
    Concurrent,
}

/// A notification request.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub body: String,
    pub title: String,
    pub notify_type: NotifyType,
    /// Format the body is written in; falls back to the asset default.
    pub body_format: Option<NotifyFormat>,
    pub tags: TagExpr,
    pub attach: Option<Arc<AttachmentBundle>>,
    /// Falls back to the asset default when unset.
    pub interpret_escapes: Option<bool>,
}

impl Notification {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            title: String::new(),
            notify_type: NotifyType::default(),
            body_format: None,
            tags: TagExpr::All,
            attach: None,
            interpret_escapes: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn notify_type(mut self, notify_type: NotifyType) -> Self {
        self.notify_type = notify_type;
        self
    }

    pub fn body_format(mut self, format: NotifyFormat) -> Self {
        self.body_format = Some(format);
        self
    }

    pub fn tags(mut self, tags: impl Into<TagExpr>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn attach(mut self, attach: AttachmentBundle) -> Self {
        self.attach = Some(Arc::new(attach));
        self
    }

    pub fn interpret_escapes(mut self, interpret: bool) -> Self {
        self.interpret_escapes = Some(interpret);
        self
    }
}

/// One matched target paired with the message prepared for it.
#[derive(Clone)]
pub struct Delivery {
    pub target: Arc<dyn Target>,
    pub message: Arc<Message>,
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("service", &self.target.service_name())
            .field("message", &self.message)
            .finish()
    }
}

/// Checks preconditions and builds the deliveries for every matched target.
///
/// Nothing is sent here; any error aborts the dispatch before the first send.
pub fn prepare(
    collection: &Collection,
    notification: &Notification,
    asset: &Asset,
) -> Result<Vec<Delivery>, DispatchError> {
    if collection.is_empty() {
        return Err(DispatchError::NoTargets);
    }
    if notification.body.is_empty() && notification.title.is_empty() {
        return Err(DispatchError::NoContent);
    }

    let body_format = notification.body_format.or(asset.body_format);
    let interpret = notification
        .interpret_escapes
        .unwrap_or(asset.interpret_escapes);

    // Decoded on the first match, so a dispatch matching nothing never fails here.
    let mut decoded_title: Option<String> = None;
    let mut cache = ConversionCache::new(&notification.body, body_format, interpret);
    let mut messages: HashMap<NotifyFormat, Arc<Message>> = HashMap::new();
    let mut deliveries = Vec::new();

    for target in collection.find(&notification.tags) {
        let format = target.notify_format();
        let message = match messages.get(&format) {
            Some(message) => message.clone(),
            None => {
                let body = cache
                    .body_for(format)
                    .map_err(|source| DispatchError::Encoding {
                        field: "body",
                        source,
                    })?
                    .to_string();
                if decoded_title.is_none() {
                    decoded_title = Some(decode_title(&notification.title, interpret)?);
                }
                let title = decoded_title.clone().unwrap_or_default();
                let message = Arc::new(Message {
                    body,
                    title,
                    notify_type: notification.notify_type,
                    attach: notification.attach.clone(),
                });
                messages.insert(format, message.clone());
                message
            }
        };
        deliveries.push(Delivery { target, message });
    }

    debug!(
        matched = deliveries.len(),
        formats = messages.len(),
        tags = %notification.tags,
        "Prepared deliveries"
    );
    Ok(deliveries)
}

fn decode_title(title: &str, interpret: bool) -> Result<String, DispatchError> {
    if !interpret || title.is_empty() {
        return Ok(title.to_string());
    }
    interpret_escapes(title).map_err(|source| DispatchError::Encoding {
        field: "title",
        source,
    })
}

/// Folds per-target results into the tri-state outcome.
pub fn aggregate<I: IntoIterator<Item = bool>>(results: I) -> Outcome {
    let mut outcome = Outcome::None;
    for sent in results {
        outcome = match (outcome, sent) {
            (Outcome::Failure, _) | (_, false) => Outcome::Failure,
            _ => Outcome::Success,
        };
    }
    outcome
}

/// Invokes each target's blocking contract in order. Every delivery is
/// attempted regardless of earlier failures.
pub fn run_sequential(deliveries: &[Delivery]) -> Vec<bool> {
    deliveries
        .iter()
        .map(|delivery| {
            let service = delivery.target.service_name();
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                delivery.target.notify(&delivery.message)
            }));
            match result {
                Ok(result) => settle(service, result),
                Err(_) => {
                    error!(service, "Unhandled notification panic");
                    increment_target_failure(service);
                    false
                }
            }
        })
        .collect()
}

/// Invokes every delivery concurrently and waits for all of them.
///
/// Targets offering a cooperative variant run it on the current run loop
/// when `async_mode` allows; all others are moved to the blocking pool so
/// they cannot stall their peers. Results come back in submission order.
pub async fn run_concurrent(deliveries: Vec<Delivery>, async_mode: bool) -> Vec<bool> {
    let sends = deliveries.into_iter().map(|delivery| async move {
        let service = delivery.target.service_name().to_string();
        if async_mode && delivery.target.supports_async() {
            let result = AssertUnwindSafe(delivery.target.notify_async(&delivery.message))
                .catch_unwind()
                .await;
            match result {
                Ok(result) => settle(&service, result),
                Err(_) => {
                    error!(service = %service, "Unhandled notification panic");
                    increment_target_failure(&service);
                    false
                }
            }
        } else {
            let Delivery { target, message } = delivery;
            match task::spawn_blocking(move || target.notify(&message)).await {
                Ok(result) => settle(&service, result),
                Err(e) => {
                    error!(service = %service, error = %e, "Notification task failed");
                    increment_target_failure(&service);
                    false
                }
            }
        }
    });
    join_all(sends).await
}

fn settle(service: &str, result: anyhow::Result<bool>) -> bool {
    match result {
        Ok(true) => {
            debug!(service, "Notification sent");
            true
        }
        Ok(false) => {
            warn!(service, "Notification was not delivered");
            increment_target_failure(service);
            false
        }
        Err(e) => {
            error!(service, error = %e, "Unhandled notification exception");
            increment_target_failure(service);
            false
        }
    }
}
