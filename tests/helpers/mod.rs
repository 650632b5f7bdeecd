#![allow(dead_code)]
pub mod mock_target;
pub mod test_metrics;

use herald::{NotifyFormat, Target};
use mock_target::FakeTarget;
use std::sync::Arc;

/// Builds a fake target and returns it both concretely and as a trait object.
pub fn fake(name: &str, tags: &[&str]) -> (Arc<FakeTarget>, Arc<dyn Target>) {
    share(FakeTarget::new(name).with_tags(tags))
}

/// Builds a fake target declaring `format`.
pub fn fake_with_format(name: &str, format: NotifyFormat) -> (Arc<FakeTarget>, Arc<dyn Target>) {
    share(FakeTarget::new(name).with_format(format))
}

/// Wraps a configured fake so the test keeps a handle for inspection.
pub fn share(target: FakeTarget) -> (Arc<FakeTarget>, Arc<dyn Target>) {
    let target = Arc::new(target);
    let dynamic: Arc<dyn Target> = target.clone();
    (target, dynamic)
}

/// Names of the given targets, in order.
pub fn names<I: IntoIterator<Item = Arc<dyn Target>>>(targets: I) -> Vec<String> {
    targets
        .into_iter()
        .map(|t| t.service_name().to_string())
        .collect()
}
