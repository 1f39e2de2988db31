// Build + run job execution
#![allow(dead_code)]

use crate::agent::error::{AgentError, Result};
use crate::agent::types::{CommandLine, Job, Output, Status};
use crate::agent::{BUILD_STDERR, BUILD_STDOUT, RUN_STDERR, RUN_STDOUT};
use crate::exec::{CommandSpec, ExecConfig, Execution, exec};
use crate::mux::{MixedStream, decode_messages};
use crate::sink::{SharedBuffer, Tee};
use std::fs;
use std::path::{Component, Path};
use tracing::{debug, info};

/// Captured output of one phase
struct Phase {
    exec: Execution,
    stdout: String,
    stderr: String,
}

/// Runs jobs with a fixed exec configuration
pub struct Agent {
    config: ExecConfig,
}

impl Agent {
    pub fn new(config: ExecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Write the input files, build if needed, run, and assemble the result
    pub async fn run_job(&self, job: &Job) -> Result<Output> {
        write_files(&job.workdir, &job.input.files)?;

        let command = CommandLine {
            build: job.build.as_ref().map(CommandSpec::command_line).unwrap_or_default(),
            run: job.run.command_line(),
        };
        let mut output = Output::new(command);
        let mixed = MixedStream::new(Vec::new());

        if let Some(build) = &job.build {
            let build = in_workdir(build, &job.workdir);
            let phase = self
                .run_phase(&build, Vec::new(), &mixed, BUILD_STDOUT, BUILD_STDERR)
                .await?;
            output.build_stdout = phase.stdout;
            output.build_stderr = phase.stderr;

            if let Some(status) = Status::after_build(&phase.exec) {
                info!(status = ?status, code = phase.exec.code, "build phase failed, skipping run");
                output.status = status;
                output.code = phase.exec.code;
                output.signal = phase.exec.signal;
                output.mixed_output = decode_messages(&mixed.lock())?;
                return Ok(output);
            }
        }

        let run = in_workdir(&job.run, &job.workdir);
        let stdin = job.input.stdin.clone().into_bytes();
        let phase = self
            .run_phase(&run, stdin, &mixed, RUN_STDOUT, RUN_STDERR)
            .await?;

        output.run_stdout = phase.stdout;
        output.run_stderr = phase.stderr;
        output.status = Status::after_run(&phase.exec);
        output.code = phase.exec.code;
        output.signal = phase.exec.signal;
        output.rusage = phase.exec.rusage;
        output.running_time = phase.exec.elapsed.as_secs_f64();
        output.mixed_output = decode_messages(&mixed.lock())?;

        info!(
            status = ?output.status,
            code = output.code,
            signal = output.signal,
            running_time = output.running_time,
            "job finished"
        );
        Ok(output)
    }

    async fn run_phase(
        &self,
        cmd: &CommandSpec,
        stdin: Vec<u8>,
        mixed: &MixedStream<Vec<u8>>,
        out_tag: &str,
        err_tag: &str,
    ) -> Result<Phase> {
        let stdout = SharedBuffer::new();
        let stderr = SharedBuffer::new();

        debug!(command = %cmd.command_line(), tag = out_tag, "starting phase");
        let exec = exec(
            cmd,
            stdin,
            Tee::new(stdout.clone(), mixed.writer(out_tag)),
            Tee::new(stderr.clone(), mixed.writer(err_tag)),
            &self.config,
        )
        .await?;

        Ok(Phase {
            exec,
            stdout: stdout.to_string_lossy(),
            stderr: stderr.to_string_lossy(),
        })
    }
}

/// Default the command's working directory to the job workdir
fn in_workdir(cmd: &CommandSpec, workdir: &Path) -> CommandSpec {
    let mut cmd = cmd.clone();
    if cmd.cwd.is_none() {
        cmd.cwd = Some(workdir.to_path_buf());
    }
    cmd
}

/// Write input files below `workdir`, refusing names that escape it
fn write_files<'a, I>(workdir: &Path, files: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    for (name, content) in files {
        let relative = Path::new(name);
        let contained = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained {
            return Err(AgentError::InvalidPath(name.clone()));
        }

        let path = workdir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        debug!(path = %path.display(), bytes = content.len(), "input file written");
    }
    Ok(())
}
