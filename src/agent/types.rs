// Agent data types
#![allow(dead_code)]

use crate::agent::error::Result;
use crate::exec::{CommandSpec, Execution, Rusage};
use crate::mux::Message;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Files and stdin supplied by the client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Input {
    /// File name (relative to the job workdir) to content
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    #[serde(default)]
    pub stdin: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, serde_json::Value>,
}

/// One build + run job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub input: Input,
    /// Skipped for interpreted languages
    #[serde(default)]
    pub build: Option<CommandSpec>,
    pub run: CommandSpec,
    /// Where input files are written and commands run by default
    pub workdir: PathBuf,
}

impl Job {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Command lines as shown to the client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLine {
    pub build: String,
    pub run: String,
}

/// Overall job outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Success,
    BuildError,
    RuntimeError,
    TimeLimitExceeded,
}

impl Status {
    /// Outcome that ends the job after the build phase, if any
    pub fn after_build(exec: &Execution) -> Option<Self> {
        if exec.timed_out() {
            Some(Status::TimeLimitExceeded)
        } else if !exec.success() {
            Some(Status::BuildError)
        } else {
            None
        }
    }

    pub fn after_run(exec: &Execution) -> Self {
        if exec.timed_out() {
            Status::TimeLimitExceeded
        } else if !exec.success() {
            Status::RuntimeError
        } else {
            Status::Success
        }
    }
}

/// Full result record returned to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Output {
    pub build_stdout: String,
    pub build_stderr: String,
    pub run_stdout: String,
    pub run_stderr: String,
    pub rusage: Rusage,
    /// Every fragment of all four streams, in the order it was written
    pub mixed_output: Vec<Message>,
    pub command: CommandLine,
    pub code: i32,
    pub signal: i32,
    pub status: Status,
    /// Wall-clock seconds of the run phase
    pub running_time: f64,
}

impl Output {
    pub fn new(command: CommandLine) -> Self {
        Self {
            build_stdout: String::new(),
            build_stderr: String::new(),
            run_stdout: String::new(),
            run_stderr: String::new(),
            rusage: Rusage::default(),
            mixed_output: Vec::new(),
            command,
            code: 0,
            signal: 0,
            status: Status::Success,
            running_time: 0.0,
        }
    }
}
