use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::io::Write;
use std::process::{Command, Stdio};

use super::{format_local, Notify};
use crate::models::TaskRecord;

/// Sends an e-mail through the system `sendmail -t`.
pub struct EmailNotifier {
    to: String,
}

impl EmailNotifier {
    pub fn new(to: String) -> Self {
        Self { to }
    }

    fn compose(&self, record: &TaskRecord) -> String {
        let host = nix::unistd::gethostname()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "localhost".to_string());
        let finished = record.finished_at.unwrap_or_else(Utc::now);
        let mut body = format!(
            "Process {} on {host} finished at {}.",
            record.target_pid,
            format_local(finished)
        );
        if let Some(code) = record.exit_code {
            body.push_str(&format!(" Exit code {code}."));
        }
        if !record.command_line.is_empty() {
            body.push_str(&format!("\n\n`{}`", record.command_line.join(" ")));
        }
        format!(
            "To: {}\nSubject: vigil: {} finished!\n\n{body}\n",
            self.to, record.name
        )
    }
}

impl Notify for EmailNotifier {
    fn notify(&self, record: &TaskRecord) -> Result<()> {
        let message = self.compose(record);

        let mut child = Command::new("sendmail")
            .arg("-t")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("failed to launch sendmail")?;
        child
            .stdin
            .take()
            .context("sendmail stdin was not captured")?
            .write_all(message.as_bytes())
            .context("failed to hand the message to sendmail")?;

        let output = child.wait_with_output().context("sendmail did not finish")?;
        if !output.status.success() {
            bail!(
                "sendmail exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_compose_includes_headers_and_command_line() {
        let mut record = TaskRecord::not_started(42);
        record.name = "make".to_string();
        record.command_line = vec!["make".to_string(), "-j8".to_string()];
        record.finished_at = Some(Utc::now());

        let notifier = EmailNotifier::new("dev@example.com".to_string());
        let message = notifier.compose(&record);

        assert!(message.starts_with("To: dev@example.com\n"));
        assert!(message.contains("Subject: vigil: make finished!"));
        assert!(message.contains("`make -j8`"));
    }
}
