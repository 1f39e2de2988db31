// Wait-for-child and kill for one process id.
//
// The child is only reaped while the lock is held, and kill checks the flag
// under the same lock, so SIGKILL never reaches a pid that has been recycled.
// A group leader that is alive or a zombie also keeps its process group id
// reserved, so the same holds for killpg.
#![allow(dead_code)]

use crate::exec::rusage::Rusage;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{Id, WaitPidFlag, WaitStatus, waitid};
use nix::unistd::Pid;
use std::io;
use std::mem::MaybeUninit;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Final status of a reaped process
#[derive(Debug, Clone)]
pub struct Reaped {
    pub status: WaitStatus,
    pub rusage: Rusage,
}

impl Reaped {
    /// (exit code, signal); code is -1 for signal deaths
    pub fn exit_detail(&self) -> (i32, i32) {
        match self.status {
            WaitStatus::Exited(_, code) => (code, 0),
            WaitStatus::Signaled(_, sig, _) => (-1, sig as i32),
            _ => (0, 0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reaper {
    pid: Pid,
    /// Kill the whole process group led by `pid`
    group: bool,
    reaped: Arc<Mutex<bool>>,
}

impl Reaper {
    pub fn new(pid: u32) -> Self {
        Self {
            pid: Pid::from_raw(pid as i32),
            group: false,
            reaped: Arc::new(Mutex::new(false)),
        }
    }

    /// Reaper for a child spawned as the leader of its own process group.
    ///
    /// Only valid when the child called setpgid(0, 0); otherwise the group is
    /// the caller's own.
    pub fn group_leader(pid: u32) -> Self {
        Self {
            group: true,
            ..Self::new(pid)
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid.as_raw() as u32
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.reaped.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the process exits, then reap it and collect its rusage
    pub fn wait(&self) -> io::Result<Reaped> {
        // Wait for exit but leave the zombie in place
        loop {
            match waitid(Id::Pid(self.pid), WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT) {
                Ok(_) => break,
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let mut reaped = self.lock();
        let mut status: libc::c_int = 0;
        let mut usage = MaybeUninit::<libc::rusage>::zeroed();
        loop {
            // SAFETY: both out-pointers are valid for writes for the whole call
            let ret = unsafe { libc::wait4(self.pid.as_raw(), &mut status, 0, usage.as_mut_ptr()) };
            if ret == self.pid.as_raw() {
                break;
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
        *reaped = true;
        drop(reaped);

        // SAFETY: zero-initialised and then filled in by a successful wait4
        let usage = unsafe { usage.assume_init() };
        let status = WaitStatus::from_raw(self.pid, status)?;
        debug!(pid = self.pid.as_raw(), ?status, "process reaped");

        Ok(Reaped {
            status,
            rusage: Rusage::from_raw(&usage),
        })
    }

    /// Send SIGKILL if the process is still running, to its whole group for a
    /// group leader.
    ///
    /// Returns false when it had already exited (reaped or not).
    pub fn kill(&self) -> io::Result<bool> {
        let reaped = self.lock();
        if *reaped {
            return Ok(false);
        }

        let flags = WaitPidFlag::WEXITED | WaitPidFlag::WNOHANG | WaitPidFlag::WNOWAIT;
        if !matches!(waitid(Id::Pid(self.pid), flags)?, WaitStatus::StillAlive) {
            return Ok(false);
        }

        let sent = if self.group {
            signal::killpg(self.pid, Signal::SIGKILL)
        } else {
            signal::kill(self.pid, Signal::SIGKILL)
        };
        match sent {
            Ok(()) => Ok(true),
            Err(Errno::ESRCH) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_wait_reports_exit_code() {
        let child = Command::new("/bin/sh").args(["-c", "exit 3"]).spawn().unwrap();
        let reaper = Reaper::new(child.id());

        let reaped = reaper.wait().unwrap();
        assert_eq!(reaped.exit_detail(), (3, 0));
        assert!(!reaper.kill().unwrap());
    }

    #[test]
    fn test_kill_running_process() {
        let child = Command::new("sleep").arg("5").spawn().unwrap();
        let reaper = Reaper::new(child.id());

        assert!(reaper.kill().unwrap());
        let reaped = reaper.wait().unwrap();
        assert_eq!(reaped.exit_detail(), (-1, libc::SIGKILL));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_group_kill_reaches_grandchildren() {
        use std::io::{BufRead, BufReader};
        use std::os::unix::process::CommandExt;
        use std::process::Stdio;
        use std::time::{Duration, Instant};

        let mut child = Command::new("/bin/sh")
            .args(["-c", "sleep 5 & echo $!; wait"])
            .stdout(Stdio::piped())
            .process_group(0)
            .spawn()
            .unwrap();
        let reaper = Reaper::group_leader(child.id());

        let mut line = String::new();
        BufReader::new(child.stdout.take().unwrap()).read_line(&mut line).unwrap();
        let grandchild: i32 = line.trim().parse().unwrap();

        assert!(reaper.kill().unwrap());
        let reaped = reaper.wait().unwrap();
        assert_eq!(reaped.exit_detail(), (-1, libc::SIGKILL));

        // Gone, or a zombie waiting for its new parent
        let running = || match std::fs::read_to_string(format!("/proc/{grandchild}/stat")) {
            Ok(stat) => stat
                .rsplit_once(')')
                .is_some_and(|(_, rest)| !rest.trim_start().starts_with('Z')),
            Err(_) => false,
        };
        let deadline = Instant::now() + Duration::from_secs(2);
        while running() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(!running());
    }

    #[test]
    fn test_wait_on_unknown_pid_fails() {
        let child = Command::new("true").spawn().unwrap();
        let reaper = Reaper::new(child.id());
        reaper.wait().unwrap();

        assert!(reaper.wait().is_err());
    }
}
