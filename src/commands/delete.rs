//! Cancel pending watches by target pid or name

use anyhow::Result;

use crate::registry::Registry;

pub fn execute(registry: &Registry, target_pid: Option<u32>, name: Option<&str>) -> Result<()> {
    for watch in registry.find(target_pid, name)? {
        registry.terminate(&watch)?;
        println!(
            "Deleted watcher PID {} monitoring PID {}",
            watch.watcher_pid, watch.record.target_pid
        );
    }
    Ok(())
}
