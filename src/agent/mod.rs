// Agent module - assembles the full result record of a build + run job
#![allow(unused_imports)]

pub mod error;
pub mod runner;
pub mod types;

pub use error::{AgentError, Result};
pub use runner::Agent;
pub use types::{CommandLine, Input, Job, Output, Status};

/// Tags of the four logical streams in the mixed output
pub const BUILD_STDOUT: &str = "build-stdout";
pub const BUILD_STDERR: &str = "build-stderr";
pub const RUN_STDOUT: &str = "run-stdout";
pub const RUN_STDERR: &str = "run-stderr";
