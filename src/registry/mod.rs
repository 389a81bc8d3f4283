//! Query layer over all task records
//!
//! Read-only and deletion queries across every watch in the store. The
//! registry never writes a record: the failed phase it reports is a
//! read-time projection of (stored phase, watcher liveness), so a crashed
//! or killed watcher is diagnosed after the fact without a heartbeat
//! protocol and without racing the owning writer.

use anyhow::Result;

use crate::fs::Store;
use crate::models::{Phase, TaskRecord};
use crate::process;

/// One enumerated watch: the stored record plus its owning watcher pid.
#[derive(Debug, Clone)]
pub struct Watch {
    pub watcher_pid: u32,
    pub record: TaskRecord,
}

impl Watch {
    /// The phase a reader should report: the stored phase, downgraded to
    /// failed when the record is short of notified and the owning watcher
    /// process is no longer alive. Never written back.
    pub fn effective_phase(&self) -> Phase {
        if self.record.phase != Phase::Notified && !process::is_alive(self.watcher_pid) {
            Phase::Failed
        } else {
            self.record.phase
        }
    }
}

pub struct Registry {
    store: Store,
}

impl Registry {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Every readable watch, in storage enumeration order. Callers needing
    /// a stable order sort explicitly.
    pub fn watches(&self) -> Result<Vec<Watch>> {
        let mut watches = Vec::new();
        for (watcher_pid, _target_pid) in self.store.enumerate()? {
            // Entries that vanish or break between the scan and this read
            // are skipped like any other invalid entry.
            if let Ok(Some(record)) = self.store.read(watcher_pid) {
                watches.push(Watch {
                    watcher_pid,
                    record,
                });
            }
        }
        Ok(watches)
    }

    /// Watches matching a target pid or a stored name.
    pub fn find(&self, target_pid: Option<u32>, name: Option<&str>) -> Result<Vec<Watch>> {
        let matches = self
            .watches()?
            .into_iter()
            .filter(|watch| {
                target_pid.is_some_and(|pid| watch.record.target_pid == pid)
                    || name.is_some_and(|n| watch.record.name == n)
            })
            .collect();
        Ok(matches)
    }

    /// Remove every watch whose effective phase is notified or failed,
    /// yielding each removed watch and the phase it was removed as.
    pub fn cleanup(&self) -> Result<Vec<(Watch, Phase)>> {
        let mut removed = Vec::new();
        for watch in self.watches()? {
            let phase = watch.effective_phase();
            if matches!(phase, Phase::Notified | Phase::Failed) {
                self.store.remove(watch.watcher_pid)?;
                removed.push((watch, phase));
            }
        }
        Ok(removed)
    }

    /// Cancel one watch: wait for the owning watcher process itself to
    /// exit (not the monitored target), then remove the entry.
    pub fn terminate(&self, watch: &Watch) -> Result<()> {
        if matches!(
            watch.effective_phase(),
            Phase::Monitoring | Phase::Notifying
        ) {
            process::wait_for_exit(watch.watcher_pid);
        }
        self.store.remove(watch.watcher_pid)
    }
}
