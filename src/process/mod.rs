//! Process-table access
//!
//! Everything the watcher and the query layer need from the OS process
//! table: a non-blocking liveness probe, metadata capture for a resolved
//! pid, a by-name scan, and a blocking wait that works for foreign
//! processes as well as direct children.

use chrono::{DateTime, TimeZone, Utc};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;
use std::thread;
use std::time::Duration;
use sysinfo::{Pid as SysPid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

/// Poll interval while waiting on a process we cannot reap.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Check whether a process with the given pid is alive. Never blocks.
///
/// Sends the null signal (signal 0), which performs the permission check
/// without delivering anything:
/// - `Ok(())` - process exists and we can signal it
/// - `EPERM` - process exists but belongs to someone else
/// - `ESRCH` - no such process
pub fn is_alive(pid: u32) -> bool {
    let pid_i32 = match i32::try_from(pid) {
        Ok(v) => v,
        // PID exceeds i32::MAX, treat as non-existent
        Err(_) => return false,
    };

    match kill(Pid::from_raw(pid_i32), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(Errno::ESRCH) => false,
        Err(_) => false,
    }
}

/// Block until the process with the given pid has terminated.
///
/// A direct child is reaped with `waitpid` and reports its real exit code.
/// Anything else cannot be reaped on POSIX, so this degrades to polling the
/// process table and reports no exit code. Absence of an exit code is a
/// legitimate outcome, not an error.
pub fn wait_for_exit(pid: u32) -> Option<i32> {
    if let Ok(pid_i32) = i32::try_from(pid) {
        let child = Pid::from_raw(pid_i32);
        loop {
            match waitpid(child, None) {
                Ok(WaitStatus::Exited(_, code)) => return Some(code),
                Ok(WaitStatus::Signaled(..)) => return None,
                Ok(_) => continue,
                // ECHILD: not our child, fall through to the poll loop
                Err(_) => break,
            }
        }
    }

    while is_alive(pid) {
        thread::sleep(WAIT_POLL_INTERVAL);
    }
    None
}

/// Metadata captured for a resolved process.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pid: u32,
    name: String,
    command_line: Vec<String>,
    started_at: Option<DateTime<Utc>>,
}

impl ProcessHandle {
    /// Look up a pid in the process table, capturing its name, command
    /// line, and creation time. Returns `None` when the process is gone.
    pub fn resolve(pid: u32) -> Option<Self> {
        let sys_pid = SysPid::from_u32(pid);
        let refresh = ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always);
        let mut system = System::new();
        system.refresh_processes_specifics(ProcessesToUpdate::Some(&[sys_pid]), true, refresh);
        let process = system.process(sys_pid)?;

        let name = process.name().to_string_lossy().into_owned();
        let command_line = process
            .cmd()
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        let started_at = if process.start_time() > 0 {
            Utc.timestamp_opt(process.start_time() as i64, 0).single()
        } else {
            None
        };

        Some(Self {
            pid,
            name,
            command_line,
            started_at,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command_line(&self) -> &[String] {
        &self.command_line
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn is_running(&self) -> bool {
        is_alive(self.pid)
    }

    /// Block until this process terminates. See [`wait_for_exit`].
    pub fn wait(&self) -> Option<i32> {
        wait_for_exit(self.pid)
    }
}

/// Scan the process table for processes whose name matches exactly,
/// excluding the calling process. Returns `(pid, command line)` pairs
/// sorted by pid.
pub fn find_by_name(name: &str) -> Vec<(u32, Vec<String>)> {
    let own_pid = std::process::id();
    let refresh = ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always);
    let mut system = System::new();
    system.refresh_processes_specifics(ProcessesToUpdate::All, true, refresh);

    let mut matches: Vec<(u32, Vec<String>)> = system
        .processes()
        .iter()
        .filter(|(pid, process)| {
            pid.as_u32() != own_pid && process.name().to_string_lossy() == name
        })
        .map(|(pid, process)| {
            let command_line = process
                .cmd()
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect();
            (pid.as_u32(), command_line)
        })
        .collect();
    matches.sort_by_key(|(pid, _)| *pid);
    matches
}
