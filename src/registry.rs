//! Schema-keyed resolution of descriptors into targets.

use crate::config::Asset;
use crate::core::Target;
use crate::descriptor::Descriptor;
use crate::error::ResolveError;
use crate::targets::log::LogTargetFactory;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Builds targets of one service from descriptors.
pub trait TargetFactory: Send + Sync {
    /// Human-readable name of the service.
    fn service_name(&self) -> &str;

    fn service_url(&self) -> Option<&str> {
        None
    }

    fn setup_url(&self) -> Option<&str> {
        None
    }

    /// Schemas served by this factory.
    fn protocols(&self) -> &[&'static str];

    /// Schemas that select a secure transport of the same service.
    fn secure_protocols(&self) -> &[&'static str] {
        &[]
    }

    /// Builds a target, rejecting fields it cannot use.
    fn build(
        &self,
        descriptor: &Descriptor,
        tags: HashSet<String>,
        asset: Arc<Asset>,
    ) -> anyhow::Result<Arc<dyn Target>>;

    /// Service-specific metadata (templates, accepted arguments, ...),
    /// localized for `locale` when the factory supports it.
    fn details(&self, _locale: Option<&str>) -> serde_json::Value {
        serde_json::Value::Object(Default::default())
    }
}

/// Metadata describing one registered service.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SchemaDetails {
    pub service_name: String,
    pub service_url: Option<String>,
    pub setup_url: Option<String>,
    pub protocols: Vec<String>,
    pub secure_protocols: Vec<String>,
    pub details: serde_json::Value,
}

/// Registry of every loaded target factory, keyed by schema.
#[derive(Clone, Default)]
pub struct Registry {
    factories: Vec<Arc<dyn TargetFactory>>,
    schemas: HashMap<String, Arc<dyn TargetFactory>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in factories.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LogTargetFactory));
        registry
    }

    /// Registers a factory under all of its schemas. A schema that is
    /// already registered is taken over by the new factory.
    pub fn register(&mut self, factory: Arc<dyn TargetFactory>) {
        for schema in factory
            .protocols()
            .iter()
            .chain(factory.secure_protocols().iter())
        {
            let schema = schema.to_ascii_lowercase();
            if let Some(previous) = self.schemas.insert(schema.clone(), factory.clone()) {
                debug!(
                    schema,
                    previous = previous.service_name(),
                    "Schema re-registered"
                );
            }
        }
        if !self.factories.iter().any(|f| Arc::ptr_eq(f, &factory)) {
            self.factories.push(factory);
        }
        // Drop factories that no longer own any schema.
        let schemas = &self.schemas;
        self.factories
            .retain(|f| schemas.values().any(|owner| Arc::ptr_eq(owner, f)));
    }

    /// The registered schemas, sorted.
    pub fn schemas(&self) -> Vec<&str> {
        let mut schemas: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        schemas.sort_unstable();
        schemas
    }

    pub fn get(&self, schema: &str) -> Option<&dyn TargetFactory> {
        self.schemas
            .get(&schema.to_ascii_lowercase())
            .map(|f| f.as_ref())
    }

    /// Resolves a descriptor into a target.
    pub fn resolve(
        &self,
        descriptor: &Descriptor,
        tags: HashSet<String>,
        asset: &Arc<Asset>,
    ) -> Result<Arc<dyn Target>, ResolveError> {
        let loggable = loggable(descriptor, asset);
        let factory = self
            .schemas
            .get(descriptor.schema())
            .ok_or_else(|| ResolveError::UnknownSchema(descriptor.schema().to_string()))?;

        trace!(descriptor = %loggable, fields = ?descriptor.fields().keys().collect::<Vec<_>>(), "Resolving descriptor");
        let target = factory
            .build(descriptor, tags, asset.clone())
            .map_err(|source| ResolveError::Construction {
                service: factory.service_name().to_string(),
                descriptor: loggable.clone(),
                source,
            })?;

        debug!(
            "Loaded {} descriptor: {}",
            factory.service_name(),
            target.url(asset.secure_logging)
        );
        Ok(target)
    }

    /// Resolves a descriptor, deciding how construction failures surface.
    ///
    /// Unparseable descriptors and unknown schemas are always logged and
    /// yield `Ok(None)`. A factory rejection does the same when
    /// `suppress_errors` is set and is returned as-is otherwise.
    pub fn instantiate(
        &self,
        descriptor: &Descriptor,
        tags: HashSet<String>,
        asset: &Arc<Asset>,
        suppress_errors: bool,
    ) -> Result<Option<Arc<dyn Target>>, ResolveError> {
        match self.resolve(descriptor, tags, asset) {
            Ok(target) => Ok(Some(target)),
            Err(e @ ResolveError::Construction { .. }) if !suppress_errors => Err(e),
            Err(e) => {
                error!("{}", e);
                Ok(None)
            }
        }
    }

    /// Parses and instantiates a descriptor string.
    pub fn instantiate_str(
        &self,
        input: &str,
        tags: HashSet<String>,
        asset: &Arc<Asset>,
        suppress_errors: bool,
    ) -> Result<Option<Arc<dyn Target>>, ResolveError> {
        match Descriptor::parse(input) {
            Ok(descriptor) => self.instantiate(&descriptor, tags, asset, suppress_errors),
            Err(e) => {
                error!("{}", e);
                Ok(None)
            }
        }
    }

    /// Metadata for every registered service, sorted by service name.
    pub fn details(&self, locale: Option<&str>) -> Vec<SchemaDetails> {
        let mut details: Vec<SchemaDetails> = self
            .factories
            .iter()
            .map(|factory| SchemaDetails {
                service_name: factory.service_name().to_string(),
                service_url: factory.service_url().map(str::to_string),
                setup_url: factory.setup_url().map(str::to_string),
                protocols: factory.protocols().iter().map(|s| s.to_string()).collect(),
                secure_protocols: factory
                    .secure_protocols()
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                details: factory.details(locale),
            })
            .collect();
        details.sort_by(|a, b| a.service_name.cmp(&b.service_name));
        details
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("schemas", &self.schemas())
            .finish()
    }
}

fn loggable(descriptor: &Descriptor, asset: &Asset) -> String {
    if asset.secure_logging {
        descriptor.redacted()
    } else {
        descriptor.to_string()
    }
}
