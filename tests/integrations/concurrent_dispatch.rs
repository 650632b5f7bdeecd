#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::mock_target::{Behavior, FakeTarget};
use helpers::share;
use herald::{Asset, ExecutionStrategy, Notification, Notifier, NotifyFormat, Outcome};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn build(asset: Asset, targets: Vec<FakeTarget>) -> (Notifier, Vec<Arc<FakeTarget>>) {
    let mut notifier = Notifier::builder()
        .asset(asset)
        .strategy(ExecutionStrategy::Concurrent)
        .build();
    let handles = targets
        .into_iter()
        .map(|t| {
            let (handle, target) = share(t);
            notifier.add_target(target);
            handle
        })
        .collect();
    (notifier, handles)
}

#[tokio::test]
async fn test_cooperative_and_blocking_targets_share_a_dispatch() {
    let (notifier, handles) = build(
        Asset::default(),
        vec![
            FakeTarget::new("cooperative").cooperative(),
            FakeTarget::new("blocking"),
        ],
    );

    let outcome = notifier
        .notify_async(&Notification::new("hello"))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Success);
    assert_eq!(handles[0].async_calls(), 1);
    assert_eq!(handles[1].async_calls(), 0);
    assert!(handles.iter().all(|h| h.call_count() == 1));
}

#[tokio::test]
async fn test_async_mode_off_offloads_everything() {
    let asset = Asset {
        async_mode: false,
        ..Asset::default()
    };
    let (notifier, handles) = build(asset, vec![FakeTarget::new("cooperative").cooperative()]);

    notifier
        .notify_async(&Notification::new("hello"))
        .await
        .unwrap();
    assert_eq!(handles[0].async_calls(), 0);
    assert_eq!(handles[0].call_count(), 1);
}

#[tokio::test]
async fn test_blocking_targets_do_not_stall_each_other() {
    let delay = Duration::from_millis(300);
    let (notifier, handles) = build(
        Asset::default(),
        (0..4)
            .map(|i| FakeTarget::new(&format!("slow{}", i)).with_delay(delay))
            .collect(),
    );

    let start = Instant::now();
    let outcome = notifier
        .notify_async(&Notification::new("hello"))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Success);
    assert!(start.elapsed() < delay * 3, "took {:?}", start.elapsed());
    assert!(handles.iter().all(|h| h.call_count() == 1));
}

#[tokio::test]
async fn test_faults_and_panics_are_isolated() {
    let (notifier, handles) = build(
        Asset::default(),
        vec![
            FakeTarget::new("panics").with_behavior(Behavior::Panic),
            FakeTarget::new("faults")
                .cooperative()
                .with_behavior(Behavior::Fault),
            FakeTarget::new("cooperative-panic")
                .cooperative()
                .with_behavior(Behavior::Panic),
            FakeTarget::new("fine").cooperative(),
        ],
    );

    let outcome = notifier
        .notify_async(&Notification::new("hello"))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Failure);
    assert_eq!(handles[3].call_count(), 1);
}

#[tokio::test]
async fn test_formats_are_adapted_before_fan_out() {
    let (notifier, handles) = build(
        Asset {
            body_format: Some(NotifyFormat::Text),
            ..Asset::default()
        },
        vec![
            FakeTarget::new("html")
                .cooperative()
                .with_format(NotifyFormat::Html),
            FakeTarget::new("text"),
        ],
    );

    notifier
        .notify_async(&Notification::new("a b"))
        .await
        .unwrap();
    assert_eq!(handles[0].received()[0].body, "a&nbsp;b");
    assert_eq!(handles[1].received()[0].body, "a b");
}

#[tokio::test]
async fn test_blocking_notify_inside_runtime_falls_back_to_sequential() {
    let (notifier, handles) = build(
        Asset::default(),
        vec![FakeTarget::new("cooperative").cooperative()],
    );
    let outcome = notifier.notify(&Notification::new("hello")).unwrap();
    assert_eq!(outcome, Outcome::Success);
    assert_eq!(handles[0].async_calls(), 0);
    assert_eq!(handles[0].call_count(), 1);
}

#[test]
fn test_strategies_agree_on_outcome() {
    let cases: Vec<Vec<Behavior>> = vec![
        vec![],
        vec![Behavior::Deliver, Behavior::Deliver, Behavior::Deliver],
        vec![Behavior::Deliver, Behavior::Refuse, Behavior::Deliver],
        vec![Behavior::Fault, Behavior::Deliver, Behavior::Panic],
    ];

    for behaviors in cases {
        let targets = || -> Vec<FakeTarget> {
            let mut targets: Vec<FakeTarget> = behaviors
                .iter()
                .enumerate()
                .map(|(i, b)| {
                    FakeTarget::new(&format!("t{}", i))
                        .with_tags(&["match"])
                        .with_behavior(*b)
                })
                .collect();
            // Keeps the collection non-empty so "no match" yields None.
            targets.push(FakeTarget::new("bystander").with_tags(&["other"]));
            targets
        };
        let notification = Notification::new("hello").tags("match");

        let (notifier, _) = build(Asset::default(), targets());
        let sequential = notifier
            .notify_with(&notification, ExecutionStrategy::Sequential)
            .unwrap();
        let concurrent = notifier
            .notify_with(&notification, ExecutionStrategy::Concurrent)
            .unwrap();
        assert_eq!(sequential, concurrent, "behaviors: {:?}", behaviors);
    }
}
