//! Notification delivery
//!
//! The watcher calls [`Notify::notify`] exactly once, synchronously, after
//! the monitored process terminates. Backends are free to fail: the error
//! propagates out of the watcher process, which then never reaches the
//! notified phase and is later reported as failed by the query layer.

use anyhow::Result;
use chrono::{DateTime, Local, Utc};

use crate::models::TaskRecord;

pub mod desktop;
pub mod email;
pub mod run;
pub mod terminal;

pub use desktop::DesktopNotifier;
pub use email::EmailNotifier;
pub use run::RunNotifier;
pub use terminal::TerminalNotifier;

/// A single delivery capability, invoked once per task.
pub trait Notify {
    fn notify(&self, record: &TaskRecord) -> Result<()>;
}

/// ctime-style local timestamp used in notification messages.
pub(crate) fn format_local(when: DateTime<Utc>) -> String {
    when.with_timezone(&Local)
        .format("%a %b %e %H:%M:%S %Y")
        .to_string()
}

/// "Process N finished at T" with the exit code appended when known.
pub(crate) fn finish_summary(record: &TaskRecord) -> String {
    let finished = record.finished_at.unwrap_or_else(Utc::now);
    let mut summary = format!(
        "Process {} finished at {}",
        record.target_pid,
        format_local(finished)
    );
    if let Some(code) = record.exit_code {
        summary.push_str(&format!(" with exit code {code}"));
    }
    summary
}
