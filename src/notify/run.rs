use anyhow::{Context, Result};
use std::process::Command;

use super::Notify;
use crate::models::TaskRecord;

/// Runs an arbitrary shell command as the notification.
///
/// The command's exit status is not checked; only a failure to launch the
/// shell at all is an error.
pub struct RunNotifier {
    command: String,
}

impl RunNotifier {
    pub fn new(command: String) -> Self {
        Self { command }
    }
}

impl Notify for RunNotifier {
    fn notify(&self, _record: &TaskRecord) -> Result<()> {
        Command::new("sh")
            .args(["-c", &self.command])
            .status()
            .context("failed to run the notification command")?;
        Ok(())
    }
}
