use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("executable '{0}' not found on PATH")]
    ToolNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{}", process_message(.exit_code, .stderr))]
    Process {
        /// `None` when the process was terminated by a signal.
        exit_code: Option<i32>,
        stderr: String,
        /// Whatever stdout (or accumulated stream text) existed at exit.
        partial_output: String,
    },

    #[error("process did not finish within {after:?}")]
    Timeout {
        after: Duration,
        partial_output: String,
    },
}

impl AdapterError {
    /// Attach accumulated output to a `Process` or `Timeout` error.
    /// Other variants are returned unchanged.
    pub fn with_partial_output(self, text: impl Into<String>) -> Self {
        match self {
            AdapterError::Process {
                exit_code, stderr, ..
            } => AdapterError::Process {
                exit_code,
                stderr,
                partial_output: text.into(),
            },
            AdapterError::Timeout { after, .. } => AdapterError::Timeout {
                after,
                partial_output: text.into(),
            },
            other => other,
        }
    }

    pub fn partial_output(&self) -> Option<&str> {
        match self {
            AdapterError::Process { partial_output, .. }
            | AdapterError::Timeout { partial_output, .. } => Some(partial_output),
            _ => None,
        }
    }
}

fn process_message(exit_code: &Option<i32>, stderr: &str) -> String {
    let head = match exit_code {
        Some(code) => format!("process exited with code {code}"),
        None => "process terminated by signal".to_string(),
    };
    if stderr.trim().is_empty() {
        head
    } else {
        format!("{head}\nstderr: {}", stderr.trim_end())
    }
}
