use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::process::CliProcess;
use crate::types::StreamEvent;
use crate::Result;

// ─── EventStream ──────────────────────────────────────────────────────────

/// An async stream of [`StreamEvent`]s decoded from one subprocess.
///
/// Backed by a Tokio mpsc channel. A background task owns the process,
/// forwards events in arrival order and, once both pipes close, yields a
/// final `Err` if the exit status was non-zero. Dropping `EventStream`
/// closes the receiver, which makes the background task kill the child.
///
/// The stream is tied to a single process and cannot be restarted.
pub struct EventStream {
    rx: mpsc::Receiver<Result<StreamEvent>>,
}

impl EventStream {
    /// Spawn `cmd`, hand it `prompt` on stdin, and start decoding stdout.
    ///
    /// Spawn failures are returned immediately rather than through the stream.
    pub(crate) fn spawn(cmd: Command, prompt: &str) -> Result<Self> {
        let process = CliProcess::spawn(cmd, prompt)?;
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(process.pump(tx));
        Ok(Self { rx })
    }

    /// Test-only constructor: wrap a raw mpsc receiver as an `EventStream`.
    #[cfg(test)]
    pub(crate) fn from_channel(rx: mpsc::Receiver<Result<StreamEvent>>) -> Self {
        Self { rx }
    }
}

impl Stream for EventStream {
    type Item = Result<StreamEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
