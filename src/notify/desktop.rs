use anyhow::{bail, Context, Result};
use std::process::Command;

use super::{finish_summary, Notify};
use crate::models::TaskRecord;

/// Posts a desktop popup through the system notifier command.
///
/// A missing or failing notifier command is an error on purpose: the
/// watcher must not report notified when nothing was shown.
pub struct DesktopNotifier;

impl Notify for DesktopNotifier {
    fn notify(&self, record: &TaskRecord) -> Result<()> {
        let title = format!("{} finished!", record.name);
        post(&title, &finish_summary(record))
    }
}

#[cfg(target_os = "macos")]
fn post(title: &str, body: &str) -> Result<()> {
    let script = format!(
        "display notification \"{}\" with title \"{}\"",
        body.replace('"', "'"),
        title.replace('"', "'"),
    );
    let output = Command::new("osascript")
        .args(["-e", &script])
        .output()
        .context("failed to launch osascript")?;
    if !output.status.success() {
        bail!(
            "osascript exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn post(title: &str, body: &str) -> Result<()> {
    let output = Command::new("notify-send")
        .arg(title)
        .arg(body)
        .output()
        .context("failed to launch notify-send")?;
    if !output.status.success() {
        bail!(
            "notify-send exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}
