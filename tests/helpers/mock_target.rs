#![allow(dead_code)]
use async_trait::async_trait;
use herald::config::Asset;
use herald::descriptor::Descriptor;
use herald::registry::TargetFactory;
use herald::{Message, NotifyFormat, Target};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a [`FakeTarget`] does when notified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Deliver,
    Refuse,
    Fault,
    Panic,
}

/// A target that records every message it receives.
#[derive(Debug)]
pub struct FakeTarget {
    name: String,
    tags: HashSet<String>,
    format: NotifyFormat,
    behavior: Behavior,
    cooperative: bool,
    delay: Option<Duration>,
    received: Mutex<Vec<Message>>,
    async_calls: AtomicUsize,
}

impl FakeTarget {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tags: HashSet::new(),
            format: NotifyFormat::Text,
            behavior: Behavior::Deliver,
            cooperative: false,
            delay: None,
            received: Mutex::new(Vec::new()),
            async_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_format(mut self, format: NotifyFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Offers a cooperative variant.
    pub fn cooperative(mut self) -> Self {
        self.cooperative = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn received(&self) -> Vec<Message> {
        self.received.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    /// How many calls went through the cooperative variant.
    pub fn async_calls(&self) -> usize {
        self.async_calls.load(Ordering::SeqCst)
    }

    fn respond(&self, message: &Message) -> anyhow::Result<bool> {
        self.received.lock().unwrap().push(message.clone());
        match self.behavior {
            Behavior::Deliver => Ok(true),
            Behavior::Refuse => Ok(false),
            Behavior::Fault => anyhow::bail!("{} connection reset", self.name),
            Behavior::Panic => panic!("{} blew up", self.name),
        }
    }
}

#[async_trait]
impl Target for FakeTarget {
    fn service_name(&self) -> &str {
        &self.name
    }

    fn url(&self, privacy: bool) -> String {
        if privacy {
            format!("fake://****@{}", self.name)
        } else {
            format!("fake://secret@{}", self.name)
        }
    }

    fn tags(&self) -> &HashSet<String> {
        &self.tags
    }

    fn notify_format(&self) -> NotifyFormat {
        self.format
    }

    fn supports_async(&self) -> bool {
        self.cooperative
    }

    fn notify(&self, message: &Message) -> anyhow::Result<bool> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.respond(message)
    }

    async fn notify_async(&self, message: &Message) -> anyhow::Result<bool> {
        self.async_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.respond(message)
    }
}

/// Builds [`FakeTarget`]s from `fake://name` descriptors and counts builds.
/// A descriptor whose host is `reject` is refused.
#[derive(Debug, Default)]
pub struct FakeFactory {
    pub builds: AtomicUsize,
}

impl FakeFactory {
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl TargetFactory for FakeFactory {
    fn service_name(&self) -> &str {
        "Fake"
    }

    fn service_url(&self) -> Option<&str> {
        Some("https://fake.example")
    }

    fn protocols(&self) -> &[&'static str] {
        &["fake"]
    }

    fn secure_protocols(&self) -> &[&'static str] {
        &["fakes"]
    }

    fn build(
        &self,
        descriptor: &Descriptor,
        tags: HashSet<String>,
        _asset: Arc<Asset>,
    ) -> anyhow::Result<Arc<dyn Target>> {
        let host = descriptor
            .host()
            .ok_or_else(|| anyhow::anyhow!("a host is required"))?;
        if host == "reject" {
            anyhow::bail!("target refused its fields");
        }
        self.builds.fetch_add(1, Ordering::SeqCst);
        let mut target = FakeTarget::new(host);
        target.tags = tags;
        if let Some(format) = descriptor.get("format") {
            target.format = format.parse()?;
        }
        Ok(Arc::new(target))
    }
}
