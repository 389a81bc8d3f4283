//! Remove finished and failed watches from the store

use anyhow::Result;

use crate::registry::Registry;

pub fn execute(registry: &Registry) -> Result<()> {
    for (watch, phase) in registry.cleanup()? {
        println!(
            "Cleaned up watcher {} for process {} ({phase})",
            watch.watcher_pid, watch.record.target_pid
        );
    }
    Ok(())
}
