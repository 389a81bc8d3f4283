//! End-to-end watch flows with real detached watcher processes

use serial_test::serial;
use std::time::Duration;

use vigil::models::Phase;
use vigil::notify::{Notify, RunNotifier};
use vigil::registry::Registry;
use vigil::watcher::Watcher;

use super::helpers::*;

/// Silent notifier for detached watchers: the daemon shares the test
/// harness's stdio, so deliveries must not write to it.
fn quiet_notifier() -> Box<dyn Notify> {
    Box::new(RunNotifier::new("true".to_string()))
}

#[test]
#[serial]
fn test_detached_watch_reaches_notified() {
    let (_tmp, store) = temp_store();

    let mut target = spawn_sleeper("0.4");
    let target_pid = target.id();

    let mut watcher = Watcher::new(target_pid, store.clone(), quiet_notifier());
    let watcher_pid = watcher.start(false).expect("failed to start the watch");

    // Immediate return with a watcher pid distinct from the target
    assert_ne!(watcher_pid, target_pid);
    assert_ne!(watcher_pid, std::process::id());

    // Reap the target so its pid actually leaves the process table
    target.wait().unwrap();

    assert!(
        wait_until(Duration::from_secs(5), || {
            matches!(
                store.read(watcher_pid),
                Ok(Some(record)) if record.phase == Phase::Notified
            )
        }),
        "watcher never reached the notified phase"
    );

    let record = store.read(watcher_pid).unwrap().unwrap();
    assert_eq!(record.target_pid, target_pid);
    assert_eq!(record.watcher_pid, Some(watcher_pid));
    assert!(record.finished_at.is_some());
}

#[test]
#[serial]
fn test_two_detached_watches_are_independent() {
    let (_tmp, store) = temp_store();

    let mut target_a = spawn_sleeper("0.3");
    let mut target_b = spawn_sleeper("0.5");

    let mut watcher_a = Watcher::new(target_a.id(), store.clone(), quiet_notifier());
    let mut watcher_b = Watcher::new(target_b.id(), store.clone(), quiet_notifier());
    let pid_a = watcher_a.start(false).unwrap();
    let pid_b = watcher_b.start(false).unwrap();
    assert_ne!(pid_a, pid_b);

    // Both records become visible simultaneously
    let registry = Registry::new(store.clone());
    assert!(
        wait_until(Duration::from_secs(5), || {
            registry.watches().map(|watches| watches.len() == 2).unwrap_or(false)
        }),
        "both watches should be enumerable while monitoring"
    );

    target_a.wait().unwrap();
    target_b.wait().unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        matches!(store.read(pid_a), Ok(Some(r)) if r.phase == Phase::Notified)
            && matches!(store.read(pid_b), Ok(Some(r)) if r.phase == Phase::Notified)
    }));

    // Each record kept its own target
    let record_a = store.read(pid_a).unwrap().unwrap();
    let record_b = store.read(pid_b).unwrap().unwrap();
    assert_eq!(record_a.target_pid, target_a.id());
    assert_eq!(record_b.target_pid, target_b.id());
}

#[test]
#[serial]
fn test_watch_of_already_gone_target_completes_immediately() {
    let (_tmp, store) = temp_store();

    let mut target = spawn_sleeper("0");
    let target_pid = target.id();
    target.wait().unwrap();

    let mut watcher = Watcher::new(target_pid, store.clone(), quiet_notifier());
    let watcher_pid = watcher.start(false).unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        matches!(store.read(watcher_pid), Ok(Some(r)) if r.phase == Phase::Notified)
    }));

    let record = store.read(watcher_pid).unwrap().unwrap();
    assert_eq!(record.exit_code, None);
    assert!(record.finished_at.is_some());
}

#[test]
#[serial]
fn test_terminate_waits_for_the_watcher_and_removes_the_record() {
    let (_tmp, store) = temp_store();

    let mut target = spawn_sleeper("0.3");
    let target_pid = target.id();

    let mut watcher = Watcher::new(target_pid, store.clone(), quiet_notifier());
    let watcher_pid = watcher.start(false).unwrap();

    let registry = Registry::new(store.clone());
    assert!(wait_until(Duration::from_secs(5), || {
        store.read(watcher_pid).ok().flatten().is_some()
    }));

    // Let the target finish so the watcher can run out naturally
    target.wait().unwrap();

    // The watcher rewrites its record between phases; retry around a read
    // that lands mid-write
    let mut found = None;
    assert!(wait_until(Duration::from_secs(5), || {
        found = registry
            .find(Some(target_pid), None)
            .unwrap()
            .into_iter()
            .next();
        found.is_some()
    }));
    registry.terminate(&found.unwrap()).unwrap();

    assert!(store.read(watcher_pid).unwrap().is_none());
    assert!(registry.watches().unwrap().is_empty());
}
