use anyhow::Result;
use std::io::{self, Write};

use super::{finish_summary, Notify};
use crate::models::TaskRecord;

/// Rings the bell and prints a message on the watcher's inherited stdout,
/// which is still the launching terminal.
pub struct TerminalNotifier;

impl Notify for TerminalNotifier {
    fn notify(&self, record: &TaskRecord) -> Result<()> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "\x07\n\nvigil: {}\n\n", finish_summary(record))?;
        stdout.flush()?;
        Ok(())
    }
}
