// Exec module - runs one external command under output and time bounds
#![allow(unused_imports)]

pub mod config;
pub mod controller;
pub mod error;
pub mod reaper;
pub mod rusage;
pub mod types;

pub use config::ExecConfig;
pub use controller::exec;
pub use error::{ConfigError, ExecError, Result};
pub use rusage::Rusage;
pub use types::{CommandSpec, Execution, Termination};
