/// Herald - fan a single notification out to many tagged targets
///
/// Targets are resolved from schema-prefixed descriptors through a
/// [`Registry`], optionally grouped under lazily expanding containers, and
/// selected per notification with OR-of-AND tag expressions. Each target
/// receives the body converted to the format it declares.
pub mod collection;
pub mod config;
pub mod core;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod formatting;
pub mod groups;
pub mod internal_metrics;
pub mod notifier;
pub mod registry;
pub mod tags;
pub mod targets;
pub mod utils;

// Re-export core types for convenience
pub use crate::core::*;
pub use config::{Asset, Config};
pub use dispatch::{ExecutionStrategy, Notification, Outcome};
pub use error::{DispatchError, EscapeError, IndexError, ResolveError};
pub use groups::{DescriptorGroup, TargetGroup};
pub use notifier::{Details, Notifier, NotifierBuilder, Source};
pub use registry::{Registry, TargetFactory};
pub use tags::{TagExpr, MATCH_ALL_TAG};
