mod agent;
mod exec;
mod mux;
mod sink;

use agent::{Agent, Job};
use clap::{Parser, Subcommand};
use exec::{CommandSpec, ExecConfig, Rusage, Termination};
use mux::MixedStream;
use serde::Serialize;
use sink::SharedBuffer;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::fmt;

/// CLI arguments
#[derive(Debug, Parser)]
#[command(name = "sango")]
#[command(about = "Run commands under output and time limits")]
struct Args {
    /// Config file path (default: ~/.sango/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a single command and report how it ended
    Exec {
        /// Timeout in milliseconds (0 = none)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Per-stream output cap in bytes
        #[arg(long)]
        limit: Option<u64>,

        /// File fed to the command's stdin
        #[arg(long)]
        stdin: Option<PathBuf>,

        /// Working directory
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Stream tagged MessagePack frames to stdout; the report goes to stderr
        #[arg(long)]
        mux: bool,

        /// Program followed by its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        argv: Vec<String>,
    },
    /// Run a build + run job described by a JSON file
    Job {
        /// Job file
        file: PathBuf,

        /// Timeout in milliseconds per phase (0 = none)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

/// Report printed by `sango exec`
#[derive(Debug, Serialize)]
struct ExecReport {
    status: Termination,
    code: i32,
    signal: i32,
    rusage: Rusage,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stderr: Option<String>,
    /// Seconds from spawn to reap
    elapsed: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // stdout carries results, so logs go to stderr
    fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mut config = ExecConfig::load(args.config.as_deref())?;

    let outcome = match args.command {
        Command::Exec {
            timeout_ms,
            limit,
            stdin,
            cwd,
            mux,
            argv,
        } => {
            if let Some(ms) = timeout_ms {
                config.timeout = Duration::from_millis(ms);
            }
            if let Some(bytes) = limit {
                config.output_limit_bytes = bytes;
            }
            run_exec(&config, argv, stdin, cwd, mux).await
        }
        Command::Job { file, timeout_ms } => {
            if let Some(ms) = timeout_ms {
                config.timeout = Duration::from_millis(ms);
            }
            run_job(config, file).await
        }
    };

    if let Err(e) = outcome {
        error!(error = %e, "sango failed");
        process::exit(1);
    }
    Ok(())
}

async fn run_exec(
    config: &ExecConfig,
    argv: Vec<String>,
    stdin: Option<PathBuf>,
    cwd: Option<PathBuf>,
    mux: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = argv.into_iter();
    let program = argv.next().ok_or("missing program")?;
    let mut cmd = CommandSpec::new(program).args(argv);
    cmd.cwd = cwd;

    let input = match stdin {
        Some(path) => std::fs::read(path)?,
        None => Vec::new(),
    };

    let report = if mux {
        let stream = MixedStream::new(std::io::stdout());
        let execution = exec::exec(
            &cmd,
            input,
            stream.writer("stdout"),
            stream.writer("stderr"),
            config,
        )
        .await?;
        ExecReport::new(&execution, None, None)
    } else {
        let stdout = SharedBuffer::new();
        let stderr = SharedBuffer::new();
        let execution = exec::exec(&cmd, input, stdout.clone(), stderr.clone(), config).await?;
        ExecReport::new(
            &execution,
            Some(stdout.to_string_lossy()),
            Some(stderr.to_string_lossy()),
        )
    };

    let json = serde_json::to_string_pretty(&report)?;
    if mux {
        eprintln!("{json}");
    } else {
        println!("{json}");
    }
    Ok(())
}

async fn run_job(config: ExecConfig, file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(&file)?;
    let job = Job::from_json(&content)?;
    info!(file = %file.display(), run = %job.run.command_line(), "running job");

    let output = Agent::new(config).run_job(&job).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

impl ExecReport {
    fn new(execution: &exec::Execution, stdout: Option<String>, stderr: Option<String>) -> Self {
        Self {
            status: execution.termination,
            code: execution.code,
            signal: execution.signal,
            rusage: execution.rusage,
            stdout,
            stderr,
            elapsed: execution.elapsed.as_secs_f64(),
        }
    }
}
