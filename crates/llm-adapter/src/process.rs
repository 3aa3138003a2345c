use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::protocol::StreamDecoder;
use crate::types::{AdapterConfig, ProcessResult, StreamEvent};
use crate::{AdapterError, Result};

const READ_CHUNK: usize = 8 * 1024;

// ─── CliProcess ───────────────────────────────────────────────────────────

/// A running LLM CLI subprocess whose prompt has been handed to stdin.
///
/// stdin is written from a background task and then closed, so a child that
/// starts writing output before it has drained its input cannot deadlock us.
/// The child is killed if this value is dropped before it exits.
pub(crate) struct CliProcess {
    child: Child,
    stdout: ChildStdout,
    stderr: ChildStderr,
    stdin_task: Option<JoinHandle<std::io::Result<()>>>,
}

impl CliProcess {
    /// Spawn `cmd` and start feeding `prompt` to its stdin.
    pub(crate) fn spawn(mut cmd: Command, prompt: &str) -> Result<Self> {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(AdapterError::Io)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AdapterError::Io(std::io::Error::other("stdout not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AdapterError::Io(std::io::Error::other("stderr not captured")))?;

        let stdin_task = child.stdin.take().map(|mut stdin| {
            let payload = prompt.as_bytes().to_vec();
            tokio::spawn(async move {
                stdin.write_all(&payload).await?;
                stdin.flush().await?;
                // dropping `stdin` closes the pipe
                Ok(())
            })
        });

        Ok(Self {
            child,
            stdout,
            stderr,
            stdin_task,
        })
    }

    /// Read stdout and stderr until both reach EOF, forwarding decoded
    /// stdout events to `tx` in arrival order, then wait for exit.
    ///
    /// Both pipes are serviced in the same `select!` loop so a chatty stderr
    /// can never block stdout (or vice versa). If the receiver is dropped the
    /// child is killed and the pump returns quietly.
    pub(crate) async fn pump(mut self, tx: mpsc::Sender<Result<StreamEvent>>) {
        let mut decoder = StreamDecoder::new();
        let mut stderr_bytes = Vec::new();
        let mut out_buf = vec![0u8; READ_CHUNK];
        let mut err_buf = vec![0u8; READ_CHUNK];
        let mut out_open = true;
        let mut err_open = true;

        while out_open || err_open {
            tokio::select! {
                read = self.stdout.read(&mut out_buf), if out_open => match read {
                    Ok(0) => {
                        out_open = false;
                        if let Some(event) = decoder.finish() {
                            if !forward(&tx, event).await {
                                return self.kill().await;
                            }
                        }
                    }
                    Ok(n) => {
                        for event in decoder.push(&out_buf[..n]) {
                            if !forward(&tx, event).await {
                                return self.kill().await;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(AdapterError::Io(e))).await;
                        return self.kill().await;
                    }
                },
                read = self.stderr.read(&mut err_buf), if err_open => match read {
                    Ok(0) => err_open = false,
                    Ok(n) => stderr_bytes.extend_from_slice(&err_buf[..n]),
                    Err(e) => {
                        tracing::debug!(error = %e, "stderr read failed; ignoring");
                        err_open = false;
                    }
                },
                _ = tx.closed() => {
                    tracing::debug!("event receiver dropped; killing subprocess");
                    return self.kill().await;
                }
            }
        }

        // Both pipes are closed but the child may still be running.
        let status = tokio::select! {
            status = self.wait() => status,
            _ = tx.closed() => {
                tracing::debug!("event receiver dropped after EOF; killing subprocess");
                return self.kill().await;
            }
        };
        let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();
        if let Some(err) = exit_error(status, stderr) {
            let _ = tx.send(Err(err)).await;
        }
    }

    /// Collect all of stdout and stderr and wait for exit (non-streaming).
    pub(crate) async fn output(mut self) -> Result<ProcessResult> {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        // Concurrent reads: neither pipe can fill up while the other is drained.
        let (out, err) = tokio::join!(
            self.stdout.read_to_end(&mut stdout),
            self.stderr.read_to_end(&mut stderr)
        );
        out?;
        err?;

        let status = self.wait().await?;

        Ok(ProcessResult {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code: status.code(),
        })
    }

    async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.finish_stdin().await;
        self.child.wait().await
    }

    /// A child that exits without reading its input makes the writer fail
    /// with a broken pipe; that is reported through the exit status instead.
    async fn finish_stdin(&mut self) {
        if let Some(task) = self.stdin_task.take() {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!(error = %e, "stdin write failed"),
                Err(e) => tracing::debug!(error = %e, "stdin writer task panicked"),
            }
        }
    }

    /// Kill the subprocess (best-effort; errors are silently ignored).
    async fn kill(&mut self) {
        if let Some(task) = self.stdin_task.take() {
            task.abort();
        }
        let _ = self.child.kill().await;
    }
}

/// An error for a non-zero exit code or a signal-terminated process.
fn exit_error(status: std::io::Result<ExitStatus>, stderr: String) -> Option<AdapterError> {
    let status = match status {
        Ok(s) => s,
        Err(e) => return Some(AdapterError::Io(e)),
    };
    if status.success() {
        return None;
    }
    Some(AdapterError::Process {
        exit_code: status.code(),
        stderr,
        partial_output: String::new(),
    })
}

async fn forward(tx: &mpsc::Sender<Result<StreamEvent>>, event: StreamEvent) -> bool {
    if let StreamEvent::Unparseable { raw } = &event {
        tracing::trace!(line = %raw, "ignoring unparseable stream line");
    }
    tx.send(Ok(event)).await.is_ok()
}

// ─── Command builder ──────────────────────────────────────────────────────

/// `<tool> --print [stream flags] [--model M] [--system-prompt S] [extra…]`.
/// The prompt itself is never an argument; it goes to stdin.
pub(crate) fn build_command(
    config: &AdapterConfig,
    system_prompt: Option<&str>,
    streaming: bool,
) -> Command {
    let mut cmd = Command::new(&config.executable);
    cmd.arg("--print");

    if streaming {
        cmd.arg("--output-format")
            .arg("stream-json")
            .arg("--verbose")
            .arg("--include-partial-messages");
    }

    if let Some(model) = &config.model {
        cmd.arg("--model").arg(model);
    }

    if let Some(sp) = system_prompt {
        cmd.arg("--system-prompt").arg(sp);
    }

    cmd.args(&config.extra_args);

    // Allow running from inside an interactive Claude session.
    cmd.env_remove("CLAUDECODE");

    cmd
}
