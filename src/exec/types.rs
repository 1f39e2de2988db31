// Data types for Exec module
#![allow(dead_code)]

use crate::exec::rusage::Rusage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// A resolved command to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Executable path or name looked up in PATH
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory, inherited when absent
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Space-joined command line, for display only
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How the process came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// Exited or died on its own; see code and signal
    Normal,
    /// Killed by the controller after the deadline
    Timeout,
}

/// Result of one execution
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub termination: Termination,
    /// Exit status, or -1 when the process died on a signal
    pub code: i32,
    /// Terminating signal, 0 unless the process was killed by one
    pub signal: i32,
    /// Resource usage of the reaped process
    pub rusage: Rusage,
    /// Wall-clock time from spawn to reap
    pub elapsed: Duration,
}

impl Execution {
    pub fn timed_out(&self) -> bool {
        self.termination == Termination::Timeout
    }

    /// Normal termination with exit status 0
    pub fn success(&self) -> bool {
        self.termination == Termination::Normal && self.code == 0 && self.signal == 0
    }
}
