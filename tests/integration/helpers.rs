//! Shared test helpers

use std::process::{Child, Command};
use std::time::{Duration, Instant};
use tempfile::TempDir;

use vigil::fs::Store;

/// Create a store rooted in a fresh temporary directory.
pub fn temp_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().expect("failed to create temp directory");
    let store = Store::open(temp_dir.path().join("state")).expect("failed to open store");
    (temp_dir, store)
}

/// Spawn a child that sleeps for the given number of seconds.
pub fn spawn_sleeper(seconds: &str) -> Child {
    Command::new("sleep")
        .arg(seconds)
        .spawn()
        .expect("failed to spawn sleeper")
}

/// Poll `predicate` until it returns true or the timeout elapses.
pub fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut predicate: F) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if predicate() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}
