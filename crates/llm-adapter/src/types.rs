use serde::{Deserialize, Serialize};
use std::time::Duration;

// ─── Wire records ─────────────────────────────────────────────────────────

/// One line of `--output-format stream-json` output, discriminated by the
/// JSON `"type"` field. Only the two shapes that carry assistant text are
/// modelled; everything else lands in `Other`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum WireRecord {
    /// `stream_event`: partial assistant output (`--include-partial-messages`)
    StreamEvent { event: WireEvent },
    /// `assistant`: the consolidated message for one turn
    Assistant { message: WireMessage },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum WireEvent {
    ContentBlockDelta { delta: WireDelta },
    #[serde(other)]
    Other,
}

/// `text_delta` carries `text`; `input_json_delta` and `thinking_delta` do
/// not, so the field is optional.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireDelta {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireMessage {
    #[serde(default)]
    pub content: Vec<WireContentBlock>,
}

/// Content blocks are polymorphic (`text`, `tool_use`, `thinking`); only
/// `text` matters here.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireContentBlock {
    #[serde(default)]
    pub text: Option<String>,
}

// ─── StreamEvent ──────────────────────────────────────────────────────────

/// One classified line of subprocess output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental text; concatenated in arrival order.
    PartialDelta { text: String },
    /// Authoritative full text of a turn; supersedes the deltas.
    FinalMessage { text: String },
    /// Anything else: invalid JSON, log noise, shapes without text.
    Unparseable { raw: String },
}

// ─── Invocation ───────────────────────────────────────────────────────────

/// A single prompt to send to the tool.
#[derive(Debug, Clone, Copy)]
pub struct ExecuteRequest<'a> {
    pub prompt: &'a str,
    pub system_prompt: Option<&'a str>,
    /// Request stream-json output and surface chunks as they arrive.
    pub streaming: bool,
}

impl<'a> ExecuteRequest<'a> {
    pub fn new(prompt: &'a str) -> Self {
        Self {
            prompt,
            system_prompt: None,
            streaming: false,
        }
    }

    pub fn system_prompt(mut self, system_prompt: &'a str) -> Self {
        self.system_prompt = Some(system_prompt);
        self
    }

    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }
}

/// Raw outcome of one subprocess execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

// ─── AdapterConfig ────────────────────────────────────────────────────────

/// How to reach the LLM command-line tool.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Executable name or path (default: `"claude"`)
    pub executable: String,
    /// Model override passed as `--model`
    pub model: Option<String>,
    /// Upper bound for a single invocation; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Extra arguments appended after the protocol flags
    pub extra_args: Vec<String>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            executable: "claude".to_string(),
            model: None,
            timeout: Some(Duration::from_secs(30 * 60)),
            extra_args: Vec::new(),
        }
    }
}
