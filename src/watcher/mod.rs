//! Watcher state machine
//!
//! One watcher process owns one task record end-to-end and is its only
//! writer. The stored phase advances `monitoring → notifying → notified`;
//! every mutation is a read-modify-write of the whole snapshot so lazily
//! resolved fields survive later updates.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::debug;

use crate::daemon::{self, Spawned};
use crate::fs::Store;
use crate::models::TaskRecord;
use crate::notify::Notify;
use crate::process::ProcessHandle;

pub struct Watcher {
    target_pid: u32,
    watcher_pid: Option<u32>,
    store: Store,
    notifier: Box<dyn Notify>,
}

impl Watcher {
    pub fn new(target_pid: u32, store: Store, notifier: Box<dyn Notify>) -> Self {
        Self {
            target_pid,
            watcher_pid: None,
            store,
            notifier,
        }
    }

    /// Rebind to a watch that already has an assigned watcher process.
    /// Starting such a watcher is a no-op that reports the existing pid.
    pub fn with_watcher(
        target_pid: u32,
        watcher_pid: u32,
        store: Store,
        notifier: Box<dyn Notify>,
    ) -> Self {
        Self {
            target_pid,
            watcher_pid: Some(watcher_pid),
            store,
            notifier,
        }
    }

    pub fn target_pid(&self) -> u32 {
        self.target_pid
    }

    pub fn watcher_pid(&self) -> Option<u32> {
        self.watcher_pid
    }

    /// Current record as any reader would observe it: the stored snapshot,
    /// or the not-started default when nothing has been persisted yet.
    pub fn snapshot(&self) -> Result<TaskRecord> {
        if let Some(watcher_pid) = self.watcher_pid {
            if let Some(record) = self.store.read(watcher_pid)? {
                return Ok(record);
            }
        }
        Ok(TaskRecord::not_started(self.target_pid))
    }

    /// Start monitoring.
    ///
    /// With a watcher already assigned this is a no-op returning the
    /// existing pid. Otherwise, when `block` is false, a daemon process is
    /// detached to run the state machine and its pid is returned
    /// immediately; the daemon exits when done, non-zero if notification
    /// delivery failed, leaving the record short of notified for the query
    /// layer to report. When `block` is true the current process runs the
    /// state machine itself.
    pub fn start(&mut self, block: bool) -> Result<u32> {
        if let Some(existing) = self.watcher_pid {
            return Ok(existing);
        }

        if !block {
            if let Spawned::Parent { child } = daemon::spawn()? {
                self.assign(child)?;
                return Ok(child);
            }

            // Detached side: run to completion and exit. Errors must not be
            // swallowed into a clean exit code.
            let code = match self
                .assign(std::process::id())
                .and_then(|()| self.run())
            {
                Ok(()) => 0,
                Err(err) => {
                    eprintln!(
                        "vigil: watcher for pid {} failed: {err:#}",
                        self.target_pid
                    );
                    1
                }
            };
            std::process::exit(code);
        }

        let pid = std::process::id();
        self.assign(pid)?;
        self.run()?;
        Ok(pid)
    }

    fn assign(&mut self, pid: u32) -> Result<()> {
        match self.watcher_pid {
            None => {
                self.watcher_pid = Some(pid);
                Ok(())
            }
            Some(existing) if existing == pid => Ok(()),
            Some(existing) => {
                bail!("watcher is already assigned to pid {existing}, refusing pid {pid}")
            }
        }
    }

    /// Read-modify-write one mutation of the owned record.
    fn persist<F: FnOnce(&mut TaskRecord)>(&self, apply: F) -> Result<()> {
        let watcher_pid = self
            .watcher_pid
            .context("cannot persist before a watcher is assigned")?;
        let mut record = self.snapshot()?;
        record.assign_watcher(watcher_pid)?;
        apply(&mut record);
        self.store.save(&record)
    }

    /// The state machine body, run inside the watcher process.
    fn run(&mut self) -> Result<()> {
        debug!(target_pid = self.target_pid, "monitoring");
        self.persist(TaskRecord::mark_monitoring)?;

        match ProcessHandle::resolve(self.target_pid) {
            Some(process) if process.is_running() => {
                // Persist the observed identity right away so concurrent
                // list queries see real data before the target finishes.
                let name = process.name().to_owned();
                let command_line = process.command_line().to_vec();
                let started_at = process.started_at();
                self.persist(move |record| {
                    record.name = name;
                    record.command_line = command_line;
                    record.started_at = started_at;
                })?;

                let exit_code = process.wait();
                let finished_at = Utc::now();
                self.persist(move |record| {
                    if exit_code.is_some() {
                        record.exit_code = exit_code;
                    }
                    record.finished_at = Some(finished_at);
                })?;
            }
            _ => {
                // Target already gone: a normal completion, not a failure.
                let finished_at = Utc::now();
                self.persist(move |record| record.finished_at = Some(finished_at))?;
            }
        }

        debug!(target_pid = self.target_pid, "notifying");
        self.persist(TaskRecord::mark_notifying)?;
        let record = self.snapshot()?;
        self.notifier.notify(&record)?;
        self.persist(TaskRecord::mark_notified)?;
        debug!(target_pid = self.target_pid, "notified");
        Ok(())
    }
}
