//! Start watching a process
//!
//! The target is a pid, a process name resolved to a single pid, or a
//! command executed under a detached wrapper whose pid becomes the target.

use anyhow::{Context, Result};
use std::process::Command;
use thiserror::Error;

use super::common::render_table;
use crate::daemon::{self, Spawned};
use crate::fs::Store;
use crate::notify::Notify;
use crate::process;
use crate::watcher::Watcher;

/// What to monitor, as given on the command line.
pub enum Target {
    Pid(u32),
    Name(String),
    Exec(String),
}

/// Name resolution failures, mapped to their own exit codes at the CLI
/// boundary.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("could not find a process named \"{0}\"")]
    NameNotFound(String),
    #[error("there are multiple processes running named \"{0}\"; specify the one you want by its PID")]
    NameAmbiguous(String),
}

pub fn execute(store: Store, target: &Target, notifier: Box<dyn Notify>, block: bool) -> Result<()> {
    let target_pid = resolve(target)?;

    let mut watcher = Watcher::new(target_pid, store, notifier);
    let watcher_pid = watcher
        .start(block)
        .with_context(|| format!("error monitoring PID {target_pid}"))?;

    if !block {
        eprintln!("Started monitoring daemon for PID {target_pid} at PID {watcher_pid}");
    }
    Ok(())
}

/// Resolve the CLI target to the pid to monitor.
fn resolve(target: &Target) -> Result<u32> {
    match target {
        Target::Pid(pid) => Ok(*pid),
        Target::Name(name) => resolve_name(name),
        Target::Exec(command) => spawn_wrapper(command),
    }
}

/// Find exactly one process by name, excluding ourselves. Zero matches and
/// ambiguity are reported as [`ResolveError`]; the ambiguous case also
/// prints a pid/command-line table of the candidates.
fn resolve_name(name: &str) -> Result<u32> {
    let matches = process::find_by_name(name);
    match matches.as_slice() {
        [] => Err(ResolveError::NameNotFound(name.to_string()).into()),
        [(pid, _)] => Ok(*pid),
        candidates => {
            eprintln!("There are multiple processes running named \"{name}\":\n");
            let rows: Vec<Vec<String>> = candidates
                .iter()
                .map(|(pid, command_line)| vec![pid.to_string(), command_line.join(" ")])
                .collect();
            render_table(&["PID", "Command Line"], &rows);
            eprintln!();
            Err(ResolveError::NameAmbiguous(name.to_string()).into())
        }
    }
}

/// Detach a wrapper process that runs the command; the wrapper's pid is the
/// monitored target and its exit status is the command's.
fn spawn_wrapper(command: &str) -> Result<u32> {
    match daemon::spawn().context("failed to detach the command wrapper")? {
        Spawned::Parent { child } => Ok(child),
        Spawned::Daemon => {
            let status = Command::new("sh").args(["-c", command]).status();
            let code = status.ok().and_then(|status| status.code()).unwrap_or(1);
            std::process::exit(code);
        }
    }
}
