//! Post-hoc failure detection for crashed or killed watchers

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use serial_test::serial;
use std::time::Duration;

use vigil::models::Phase;
use vigil::notify::RunNotifier;
use vigil::process;
use vigil::registry::Registry;
use vigil::watcher::Watcher;

use super::helpers::*;

#[test]
#[serial]
fn test_killed_watcher_is_reported_failed_and_cleaned_up() {
    let (_tmp, store) = temp_store();

    // A target that outlives the watcher we are about to kill
    let mut target = spawn_sleeper("30");
    let target_pid = target.id();

    let mut watcher = Watcher::new(
        target_pid,
        store.clone(),
        Box::new(RunNotifier::new("true".to_string())),
    );
    let watcher_pid = watcher.start(false).unwrap();

    // Wait for the watcher to persist its monitoring record and the
    // target's identity (its last write before the long wait), then kill it
    assert!(wait_until(Duration::from_secs(5), || {
        matches!(
            store.read(watcher_pid),
            Ok(Some(r)) if r.phase == Phase::Monitoring && r.started_at.is_some()
        )
    }));
    kill(Pid::from_raw(watcher_pid as i32), Signal::SIGKILL).unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        !process::is_alive(watcher_pid)
    }));

    // An unrelated reader now observes the derived failure without any
    // change to the stored phase
    let registry = Registry::new(store.clone());
    let watches = registry.watches().unwrap();
    assert_eq!(watches.len(), 1);
    assert_eq!(watches[0].effective_phase(), Phase::Failed);
    assert_eq!(
        store.read(watcher_pid).unwrap().unwrap().phase,
        Phase::Monitoring
    );

    // Cleanup removes exactly this record and reports it as failed
    let removed = registry.cleanup().unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].1, Phase::Failed);
    assert!(registry.watches().unwrap().is_empty());

    target.kill().unwrap();
    target.wait().unwrap();
}
