use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of one monitored task.
///
/// The stored phase only ever advances `NotStarted → Monitoring → Notifying
/// → Notified`. `Failed` is never written to disk: readers derive it when a
/// record short of `Notified` belongs to a watcher process that is no longer
/// alive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    NotStarted,
    Monitoring,
    Notifying,
    Notified,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::NotStarted => "not-started",
            Phase::Monitoring => "monitoring",
            Phase::Notifying => "notifying",
            Phase::Notified => "notified",
            Phase::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Persisted snapshot of one watch.
///
/// A record is keyed by the pid of the watcher process that owns it, not by
/// the monitored pid. Name, command line, and start time are resolved lazily
/// by the watcher; until then the defaults from [`TaskRecord::not_started`]
/// stand in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    pub target_pid: u32,
    #[serde(default)]
    pub watcher_pid: Option<u32>,
    pub name: String,
    #[serde(default)]
    pub command_line: Vec<String>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    pub phase: Phase,
}

impl TaskRecord {
    /// The default snapshot observed for a watch with no storage entry yet.
    pub fn not_started(target_pid: u32) -> Self {
        Self {
            target_pid,
            watcher_pid: None,
            name: format!("Process {target_pid}"),
            command_line: Vec::new(),
            exit_code: None,
            started_at: None,
            finished_at: None,
            phase: Phase::NotStarted,
        }
    }

    /// Bind this record to its owning watcher process.
    ///
    /// The watcher pid is write-once: re-assigning the same value is a no-op,
    /// assigning a different one is an internal consistency error.
    pub fn assign_watcher(&mut self, pid: u32) -> Result<()> {
        match self.watcher_pid {
            None => {
                self.watcher_pid = Some(pid);
                Ok(())
            }
            Some(existing) if existing == pid => Ok(()),
            Some(existing) => {
                bail!("cannot set the watcher pid to {pid} because it is already set to {existing}")
            }
        }
    }

    pub fn mark_monitoring(&mut self) {
        self.phase = Phase::Monitoring;
    }

    pub fn mark_notifying(&mut self) {
        self.phase = Phase::Notifying;
    }

    pub fn mark_notified(&mut self) {
        self.phase = Phase::Notified;
    }
}
