//! The orchestrator: holds the collection and fans notifications out to it.

use crate::collection::{Collection, Targets};
use crate::config::{Asset, Config};
use crate::core::{Container, Target};
use crate::descriptor::{parse_urls, Descriptor};
use crate::dispatch::{self, ExecutionStrategy, Notification, Outcome};
use crate::error::{DispatchError, IndexError, ResolveError};
use crate::groups::DescriptorGroup;
use crate::internal_metrics;
use crate::registry::{Registry, SchemaDetails};
use crate::tags::{tag_set, TagExpr};
use itertools::Itertools;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::{self, Handle};
use tracing::{debug, error, info, instrument};

/// Input accepted by [`Notifier::add`].
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// One or more descriptors in a free-form string.
    Text(String),
    /// A single descriptor given as fields; the `schema` key is mandatory.
    Fields(BTreeMap<String, String>),
    /// A list of sources. Strings inside a list are single descriptors.
    Many(Vec<Source>),
}

impl From<&str> for Source {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Source {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<BTreeMap<String, String>> for Source {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Self::Fields(fields)
    }
}

impl<T: Into<Source>> From<Vec<T>> for Source {
    fn from(sources: Vec<T>) -> Self {
        Self::Many(sources.into_iter().map(Into::into).collect())
    }
}

/// Metadata about the notifier and every service it can resolve.
#[derive(Debug, Clone, Serialize)]
pub struct Details {
    pub version: &'static str,
    pub lang: Option<String>,
    pub schemas: Vec<SchemaDetails>,
    pub asset: serde_json::Value,
}

/// Builder for [`Notifier`].
#[derive(Debug, Default)]
pub struct NotifierBuilder {
    registry: Option<Registry>,
    asset: Asset,
    strategy: ExecutionStrategy,
    suppress_construction_errors: Option<bool>,
}

impl NotifierBuilder {
    /// Replaces the default registry (which only knows `log://`).
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn asset(mut self, asset: Asset) -> Self {
        self.asset = asset;
        self
    }

    pub fn strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Whether factory rejections in [`Notifier::add`] are logged and
    /// skipped (the default) or returned to the caller.
    pub fn suppress_construction_errors(mut self, suppress: bool) -> Self {
        self.suppress_construction_errors = Some(suppress);
        self
    }

    pub fn build(self) -> Notifier {
        Notifier {
            registry: Arc::new(self.registry.unwrap_or_else(Registry::with_defaults)),
            asset: Arc::new(self.asset),
            strategy: self.strategy,
            suppress_construction_errors: self.suppress_construction_errors.unwrap_or(true),
            collection: Collection::new(),
        }
    }
}

/// Fans a single notification out to a tagged collection of targets.
#[derive(Debug)]
pub struct Notifier {
    registry: Arc<Registry>,
    asset: Arc<Asset>,
    strategy: ExecutionStrategy,
    suppress_construction_errors: bool,
    collection: Collection,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> NotifierBuilder {
        NotifierBuilder::default()
    }

    /// Builds a notifier from loaded configuration, using the default registry.
    pub fn from_config(config: &Config) -> Self {
        Self::builder()
            .asset(config.asset.clone())
            .strategy(config.strategy)
            .suppress_construction_errors(config.suppress_construction_errors)
            .build()
    }

    pub fn asset(&self) -> &Arc<Asset> {
        &self.asset
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    /// Resolves and adds the targets described by `source`, tagging each
    /// with `tags` (every entry is split on whitespace and commas).
    ///
    /// Returns `Ok(false)` when any descriptor could not be turned into a
    /// target; the others are still added. A string holding no descriptor
    /// at all also yields `Ok(false)`. Factory rejections are returned as
    /// errors only when suppression is disabled.
    pub fn add(&mut self, source: impl Into<Source>, tags: &[&str]) -> Result<bool, ResolveError> {
        let tags = tag_set(tags);
        match source.into() {
            Source::Text(text) => {
                let urls = parse_urls(&text);
                if urls.is_empty() {
                    error!("No descriptors found in {:?}", text);
                    return Ok(false);
                }
                self.add_each(urls.into_iter().map(Source::Text), &tags)
            }
            Source::Fields(fields) => self.add_each(std::iter::once(Source::Fields(fields)), &tags),
            Source::Many(sources) => self.add_each(sources.into_iter(), &tags),
        }
    }

    fn add_each(
        &mut self,
        sources: impl Iterator<Item = Source>,
        tags: &HashSet<String>,
    ) -> Result<bool, ResolveError> {
        let mut status = true;
        for source in sources {
            let target = match source {
                Source::Text(text) => self.registry.instantiate_str(
                    &text,
                    tags.clone(),
                    &self.asset,
                    self.suppress_construction_errors,
                )?,
                Source::Fields(fields) => match Descriptor::from_fields(fields) {
                    Ok(descriptor) => self.registry.instantiate(
                        &descriptor,
                        tags.clone(),
                        &self.asset,
                        self.suppress_construction_errors,
                    )?,
                    Err(e) => {
                        error!("{}", e);
                        None
                    }
                },
                Source::Many(_) => {
                    error!("Nested descriptor lists are not supported");
                    None
                }
            };
            match target {
                Some(target) => self.collection.push_target(target),
                None => status = false,
            }
        }
        Ok(status)
    }

    /// Adds an already-built target.
    pub fn add_target(&mut self, target: Arc<dyn Target>) {
        self.collection.push_target(target);
    }

    /// Adds a container; it contributes whatever it expands to at the time
    /// of each operation.
    pub fn add_container(&mut self, container: Arc<dyn Container>) {
        self.collection.push_container(container);
    }

    /// Adds a lazily resolved group of descriptors, sharing this notifier's
    /// registry and asset.
    pub fn add_descriptor_group(
        &mut self,
        name: impl Into<String>,
        descriptors: Vec<String>,
        tags: &[&str],
    ) -> Arc<DescriptorGroup> {
        let group = Arc::new(DescriptorGroup::new(
            name,
            descriptors,
            tag_set(tags),
            self.registry.clone(),
            self.asset.clone(),
        ));
        self.collection.push_container(group.clone());
        group
    }

    /// Sends a notification using the configured strategy, blocking until
    /// every matched target has been attempted.
    pub fn notify(&self, notification: &Notification) -> Result<Outcome, DispatchError> {
        self.notify_with(notification, self.strategy)
    }

    /// Sends a notification with an explicit strategy.
    ///
    /// `Concurrent` drives its own single-threaded runtime. When called from
    /// inside a runtime that is not possible, and the dispatch runs
    /// sequentially instead; use [`Notifier::notify_async`] there.
    #[instrument(skip_all, fields(strategy = ?strategy, tags = %notification.tags))]
    pub fn notify_with(
        &self,
        notification: &Notification,
        strategy: ExecutionStrategy,
    ) -> Result<Outcome, DispatchError> {
        let start = Instant::now();
        let deliveries = dispatch::prepare(&self.collection, notification, &self.asset)?;

        let results = match strategy {
            ExecutionStrategy::Sequential => dispatch::run_sequential(&deliveries),
            ExecutionStrategy::Concurrent if deliveries.is_empty() => Vec::new(),
            ExecutionStrategy::Concurrent => {
                if Handle::try_current().is_ok() {
                    debug!("Already inside a runtime; dispatching sequentially");
                    dispatch::run_sequential(&deliveries)
                } else {
                    let runtime = runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()?;
                    runtime.block_on(dispatch::run_concurrent(deliveries, self.asset.async_mode))
                }
            }
        };
        Ok(self.finish(results, start))
    }

    /// Sends a notification concurrently on the caller's runtime.
    #[instrument(skip_all, fields(tags = %notification.tags))]
    pub async fn notify_async(&self, notification: &Notification) -> Result<Outcome, DispatchError> {
        let start = Instant::now();
        let deliveries = dispatch::prepare(&self.collection, notification, &self.asset)?;
        let results = dispatch::run_concurrent(deliveries, self.asset.async_mode).await;
        Ok(self.finish(results, start))
    }

    fn finish(&self, results: Vec<bool>, start: Instant) -> Outcome {
        let attempted = results.len();
        let failed = results.iter().filter(|sent| !**sent).count();
        let outcome = dispatch::aggregate(results);
        internal_metrics::record_dispatch(outcome, start.elapsed());
        info!(%outcome, attempted, failed, "Dispatch complete");
        outcome
    }

    /// Lazily yields the targets matching `expr`.
    pub fn find<'a>(&'a self, expr: &'a TagExpr) -> impl Iterator<Item = Arc<dyn Target>> + 'a {
        self.collection.find(expr)
    }

    /// Number of logical targets, containers counted by what they expand to.
    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<Arc<dyn Target>, IndexError> {
        self.collection.get(index)
    }

    pub fn pop(&mut self, index: usize) -> Result<Arc<dyn Target>, IndexError> {
        self.collection.pop(index)
    }

    pub fn clear(&mut self) {
        self.collection.clear();
    }

    pub fn iter(&self) -> Targets<'_> {
        self.collection.iter()
    }

    /// The descriptor string of every target, in order. With `privacy`
    /// set, credentials are masked.
    pub fn urls(&self, privacy: bool) -> Vec<String> {
        self.iter().map(|target| target.url(privacy)).collect()
    }

    /// Describes this notifier and every service its registry can build.
    pub fn details(&self, locale: Option<&str>) -> Details {
        let schemas = self.registry.details(locale);
        debug!(
            services = %schemas.iter().map(|s| s.service_name.as_str()).join(", "),
            "Collected service details"
        );
        Details {
            version: env!("CARGO_PKG_VERSION"),
            lang: locale.map(str::to_string),
            schemas,
            asset: self.asset.details(),
        }
    }
}

impl<'a> IntoIterator for &'a Notifier {
    type Item = Arc<dyn Target>;
    type IntoIter = Targets<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
