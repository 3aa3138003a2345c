use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use crate::process::{build_command, CliProcess};
use crate::protocol::TextAccumulator;
use crate::stream::EventStream;
use crate::types::{AdapterConfig, ExecuteRequest, ProcessResult};
use crate::{AdapterError, Result};

/// Callback receiving each streamed text fragment, in arrival order.
pub type ChunkSink<'a> = &'a mut (dyn FnMut(&str) + Send);

// ─── LlmExecutor ──────────────────────────────────────────────────────────

/// Anything that can turn a prompt into a complete response.
///
/// [`CliAdapter`] is the real implementation; tests substitute scripted
/// doubles.
#[async_trait]
pub trait LlmExecutor: Send + Sync {
    /// Run `request` to completion and return the full response text.
    ///
    /// When `request.streaming` is set, `on_chunk` receives every
    /// incremental fragment before this returns.
    async fn execute(
        &self,
        request: ExecuteRequest<'_>,
        on_chunk: Option<ChunkSink<'_>>,
    ) -> Result<String>;

    /// Whether the backing tool can be invoked at all.
    fn is_available(&self) -> bool {
        true
    }
}

// ─── CliAdapter ───────────────────────────────────────────────────────────

/// Drives an LLM command-line tool (`claude` by default) as a subprocess.
#[derive(Debug, Clone, Default)]
pub struct CliAdapter {
    config: AdapterConfig,
}

impl CliAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Run once and return the raw process outcome without interpreting the
    /// exit code. Always non-streaming.
    pub async fn invoke(&self, prompt: &str, system_prompt: Option<&str>) -> Result<ProcessResult> {
        self.ensure_available()?;
        let cmd = build_command(&self.config, system_prompt, false);
        tracing::debug!(executable = %self.config.executable, "invoking (non-streaming)");
        let process = CliProcess::spawn(cmd, prompt)?;
        with_deadline(self.config.timeout, process.output()).await?
    }

    fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(AdapterError::ToolNotFound(self.config.executable.clone()))
        }
    }

    async fn execute_plain(&self, request: ExecuteRequest<'_>) -> Result<String> {
        let result = self.invoke(request.prompt, request.system_prompt).await?;
        if !result.success() {
            return Err(AdapterError::Process {
                exit_code: result.exit_code,
                stderr: result.stderr,
                partial_output: result.stdout,
            });
        }
        Ok(result.stdout)
    }

    async fn execute_streaming(
        &self,
        request: ExecuteRequest<'_>,
        on_chunk: Option<ChunkSink<'_>>,
    ) -> Result<String> {
        self.ensure_available()?;
        let cmd = build_command(&self.config, request.system_prompt, true);
        tracing::debug!(executable = %self.config.executable, "invoking (streaming)");
        let events = EventStream::spawn(cmd, request.prompt)?;

        let mut acc = TextAccumulator::new();
        let outcome = with_deadline(
            self.config.timeout,
            consume(events, &mut acc, on_chunk),
        )
        .await;

        // A timed-out `consume` drops the stream, which kills the child.
        match outcome {
            Ok(Ok(())) => Ok(acc.into_string()),
            Ok(Err(e)) | Err(e) => Err(e.with_partial_output(acc.into_string())),
        }
    }
}

#[async_trait]
impl LlmExecutor for CliAdapter {
    async fn execute(
        &self,
        request: ExecuteRequest<'_>,
        on_chunk: Option<ChunkSink<'_>>,
    ) -> Result<String> {
        if request.streaming {
            self.execute_streaming(request, on_chunk).await
        } else {
            self.execute_plain(request).await
        }
    }

    /// `true` when the executable resolves on `PATH` (or is a valid path).
    fn is_available(&self) -> bool {
        which::which(&self.config.executable).is_ok()
    }
}

// ─── Internal ─────────────────────────────────────────────────────────────

/// Drain `events` into `acc`, forwarding deltas to `on_chunk`.
pub(crate) async fn consume(
    mut events: EventStream,
    acc: &mut TextAccumulator,
    mut on_chunk: Option<ChunkSink<'_>>,
) -> Result<()> {
    while let Some(event) = events.next().await {
        let event = event?;
        if let Some(text) = acc.apply(&event) {
            if let Some(sink) = on_chunk.as_deref_mut() {
                sink(text);
            }
        }
    }
    Ok(())
}

/// Await `fut`, failing with [`AdapterError::Timeout`] after `limit`.
async fn with_deadline<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = T>,
) -> std::result::Result<T, AdapterError> {
    match limit {
        None => Ok(fut.await),
        Some(after) => tokio::time::timeout(after, fut).await.map_err(|_| {
            tracing::warn!(timeout_ms = after.as_millis() as u64, "subprocess timed out; killing it");
            AdapterError::Timeout {
                after,
                partial_output: String::new(),
            }
        }),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
