// Process execution controller

use crate::exec::config::ExecConfig;
use crate::exec::error::{ExecError, Result};
use crate::exec::reaper::{Reaped, Reaper};
use crate::exec::types::{CommandSpec, Execution, Termination};
use crate::sink::{LimitedWriter, is_exhausted};
use std::io::{self, Write};
use std::os::unix::process::CommandExt;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStderr, ChildStdin, ChildStdout};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const READ_CHUNK: usize = 8192;

/// Run `cmd` to completion or until `config.timeout` elapses.
///
/// `stdin` is fed to the child and then closed. Output goes to `stdout` and
/// `stderr` through `LimitedWriter`s of `config.output_limit_bytes`; output
/// beyond the cap is read and dropped so the child is never held up by it.
///
/// The child leads its own process group. On timeout the whole group is
/// killed and the child reaped before returning, and the result is
/// `Termination::Timeout` whatever status the kill produced.
pub async fn exec<O, E>(
    cmd: &CommandSpec,
    stdin: Vec<u8>,
    stdout: O,
    stderr: E,
    config: &ExecConfig,
) -> Result<Execution>
where
    O: Write + Send + 'static,
    E: Write + Send + 'static,
{
    let mut command = std::process::Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0);
    if let Some(dir) = &cmd.cwd {
        command.current_dir(dir);
    }

    let mut child = command.spawn().map_err(|e| ExecError::SpawnFailed {
        program: cmd.program.clone(),
        source: e,
    })?;
    let started = Instant::now();
    let reaper = Reaper::group_leader(child.id());
    let pid = reaper.pid();

    debug!(
        pid = pid,
        command = %cmd.command_line(),
        timeout_ms = config.timeout.as_millis() as u64,
        output_limit_bytes = config.output_limit_bytes,
        "process spawned"
    );

    let pipes = (child.stdin.take(), child.stdout.take(), child.stderr.take());
    let (child_stdin, child_stdout, child_stderr) = match attach(pipes) {
        Ok(pipes) => pipes,
        Err(e) => {
            // Never leave the child behind unreaped
            let _ = reaper.kill();
            let _ = tokio::task::spawn_blocking(move || reaper.wait()).await;
            return Err(ExecError::Io(e));
        }
    };

    let feeder = tokio::spawn(feed(child_stdin, stdin));
    let limit = config.output_limit_bytes;
    let out_task = tokio::spawn(drain(child_stdout, LimitedWriter::new(stdout, limit), "stdout"));
    let err_task = tokio::spawn(drain(child_stderr, LimitedWriter::new(stderr, limit), "stderr"));

    let (tx, mut rx) = oneshot::channel();
    let waiter = reaper.clone();
    tokio::task::spawn_blocking(move || {
        let _ = tx.send(waiter.wait());
    });

    let (outcome, timed_out) = if config.timeout.is_zero() {
        (rx.await, false)
    } else {
        tokio::select! {
            outcome = &mut rx => (outcome, false),
            _ = tokio::time::sleep(config.timeout) => {
                let killed = match reaper.kill() {
                    Ok(killed) => killed,
                    Err(e) => {
                        warn!(pid = pid, error = %e, "failed to kill timed out process");
                        true
                    }
                };
                if killed {
                    info!(pid = pid, timeout_ms = config.timeout.as_millis() as u64, "timeout elapsed, process killed");
                } else {
                    debug!(pid = pid, "timeout elapsed after the process had already exited");
                }
                (rx.await, killed)
            }
        }
    };

    let reaped: Reaped = outcome
        .unwrap_or_else(|_| Err(io::Error::other("wait worker dropped its result")))
        .map_err(|e| ExecError::Wait { pid, source: e })?;
    let elapsed = started.elapsed();

    finish_io(feeder, out_task, err_task, config).await;

    let (code, signal) = reaped.exit_detail();
    let termination = if timed_out {
        Termination::Timeout
    } else {
        Termination::Normal
    };

    info!(
        pid = pid,
        duration_ms = elapsed.as_millis() as u64,
        code = code,
        signal = signal,
        timed_out = timed_out,
        "process finished"
    );

    Ok(Execution {
        termination,
        code,
        signal,
        rusage: reaped.rusage,
        elapsed,
    })
}

type StdPipes = (
    Option<std::process::ChildStdin>,
    Option<std::process::ChildStdout>,
    Option<std::process::ChildStderr>,
);

/// Register the child's pipes with the runtime
fn attach(pipes: StdPipes) -> io::Result<(ChildStdin, ChildStdout, ChildStderr)> {
    let missing = |name| io::Error::other(format!("child {name} was not piped"));
    let (stdin, stdout, stderr) = pipes;
    Ok((
        ChildStdin::from_std(stdin.ok_or_else(|| missing("stdin"))?)?,
        ChildStdout::from_std(stdout.ok_or_else(|| missing("stdout"))?)?,
        ChildStderr::from_std(stderr.ok_or_else(|| missing("stderr"))?)?,
    ))
}

/// Write the whole input, then close the pipe
async fn feed(mut pipe: ChildStdin, input: Vec<u8>) {
    if input.is_empty() {
        return;
    }
    match pipe.write_all(&input).await {
        Ok(()) => {}
        // The child exited or closed stdin without reading everything
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!("child closed stdin before reading all input");
        }
        Err(e) => warn!(error = %e, "failed to write child stdin"),
    }
}

/// Copy a child pipe into `sink` until EOF.
///
/// Once the sink refuses a write the rest of the stream is still read, just
/// not forwarded. Returns the number of bytes read from the pipe.
async fn drain<R, W>(mut src: R, mut sink: W, stream: &'static str) -> u64
where
    R: AsyncRead + Unpin,
    W: Write,
{
    let mut buf = vec![0u8; READ_CHUNK];
    let mut total = 0u64;
    let mut discarding = false;

    loop {
        let n = match src.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(stream = stream, error = %e, "failed to read child output");
                break;
            }
        };
        total += n as u64;

        if discarding {
            continue;
        }
        if let Err(e) = sink.write_all(&buf[..n]) {
            if is_exhausted(&e) {
                debug!(stream = stream, "output cap reached, discarding the rest");
            } else {
                warn!(stream = stream, error = %e, "output sink failed, discarding the rest");
            }
            discarding = true;
        }
    }

    if let Err(e) = sink.flush() {
        warn!(stream = stream, error = %e, "failed to flush output sink");
    }
    debug!(stream = stream, bytes = total, "output drained");
    total
}

/// Give the drains up to `drain_grace` to reach EOF, then stop them.
///
/// Returns only once both drains are gone, so their sinks have been dropped
/// and nothing more reaches the caller's writers.
async fn finish_io(
    feeder: JoinHandle<()>,
    out_task: JoinHandle<u64>,
    err_task: JoinHandle<u64>,
    config: &ExecConfig,
) {
    feeder.abort();

    let out_abort = out_task.abort_handle();
    let err_abort = err_task.abort_handle();
    let mut drains = futures::future::join(out_task, err_task);

    if tokio::time::timeout(config.drain_grace, &mut drains).await.is_err() {
        // A process outside the group still holds a pipe open
        warn!(
            grace_ms = config.drain_grace.as_millis() as u64,
            "output still open after the process exited, abandoning it"
        );
        out_abort.abort();
        err_abort.abort();
        // Aborted tasks drop their sinks, which may flush a held UTF-8 tail
        let _ = drains.await;
    }
}
