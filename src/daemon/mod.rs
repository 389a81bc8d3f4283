//! Detachment primitive
//!
//! Detaches a unit of work from the invoking process with the classic
//! double fork: the first child calls `setsid` to shed the controlling
//! terminal, forks again, writes the grandchild pid once into a private
//! pipe, and exits. The original caller blocks only on the one-line pipe
//! read and gets the daemon pid back synchronously; the grandchild runs on,
//! reparented to init and surviving the caller's shell session.
//!
//! Stdio is deliberately left attached: the terminal notification backend
//! rings the bell on the launching tty.

use anyhow::{Context, Result};
use nix::unistd::{fork, pipe, setsid, ForkResult};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use tracing::debug;

/// Which side of the detachment the caller is on after [`spawn`] returns.
pub enum Spawned {
    /// Still the original process; `child` is the pid of the detached
    /// daemon, handed over exactly once through the pipe.
    Parent { child: u32 },
    /// The detached daemon process itself.
    Daemon,
}

/// Detach a daemon process and hand its pid back to the caller.
///
/// Returns `Spawned::Parent` in the original process as soon as the handoff
/// completes and `Spawned::Daemon` in the detached process. A failure of the
/// first fork is reported to the caller and not retried; failures after the
/// first fork cannot reach the caller and terminate the intermediate
/// process, which the caller observes as a broken handoff.
pub fn spawn() -> Result<Spawned> {
    let (reader, writer) = pipe().context("failed to create the pid handoff pipe")?;

    // SAFETY: the CLI is single-threaded at this point; the forked children
    // either _exit immediately or continue as the daemon body.
    match unsafe { fork() }.context("fork failed")? {
        ForkResult::Parent { .. } => {
            drop(writer);
            let mut line = String::new();
            BufReader::new(File::from(reader))
                .read_line(&mut line)
                .context("failed to read the daemon pid from the handoff pipe")?;
            let child: u32 = line
                .trim()
                .parse()
                .context("daemon detachment failed before the pid handoff")?;
            debug!(daemon_pid = child, "detached daemon");
            return Ok(Spawned::Parent { child });
        }
        ForkResult::Child => {}
    }

    drop(reader);

    // New session: no controlling terminal tied to the caller's shell.
    if setsid().is_err() {
        // SAFETY: _exit skips atexit handlers, which must not run in a
        // half-set-up fork child.
        // EX_OSERR (sysexits.h) == 71; the libc crate does not expose the
        // constant on Linux, so the literal stands in for it.
        unsafe { libc::_exit(71) };
    }

    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            // Session leader: hand the daemon pid to the original caller,
            // then vanish.
            let mut writer = File::from(writer);
            let _ = writeln!(writer, "{child}");
            let _ = writer.flush();
            unsafe { libc::_exit(0) }
        }
        Ok(ForkResult::Child) => {
            drop(writer);
            Ok(Spawned::Daemon)
        }
        Err(_) => unsafe { libc::_exit(71) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_hands_back_a_real_pid() {
        match spawn().expect("spawn should succeed") {
            Spawned::Parent { child } => {
                assert!(child > 0);
                assert_ne!(child, std::process::id());
            }
            Spawned::Daemon => {
                // Detached side of the test fork: leave immediately without
                // running the rest of the harness. _exit avoids flushing
                // descriptors shared with the real test process.
                unsafe { libc::_exit(0) };
            }
        }
    }
}
