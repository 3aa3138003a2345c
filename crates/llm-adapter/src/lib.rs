//! `llm-adapter` — drive an LLM command-line tool as a subprocess.
//!
//! The prompt goes to the tool's stdin; the answer comes back either as
//! plain stdout (`--print`) or as newline-delimited JSON
//! (`--output-format stream-json --include-partial-messages`), decoded
//! incrementally so callers can watch text arrive.
//!
//! # Architecture
//!
//! ```text
//! ExecuteRequest
//!     │
//!     ▼
//! CliAdapter      ← checks the executable, applies the timeout
//!     │
//!     ▼
//! CliProcess      ← spawns `<tool> --print …`, writes stdin, selects over
//!     │              stdout + stderr
//!     ▼
//! StreamDecoder   ← bytes → lines → StreamEvent
//!     │
//!     ▼
//! EventStream     ← futures::Stream<Item = Result<StreamEvent>>
//!     │
//!     ▼
//! TextAccumulator ← deltas appended, final message authoritative
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use llm_adapter::{CliAdapter, ExecuteRequest, LlmExecutor};
//!
//! let adapter = CliAdapter::default();
//! let mut print = |chunk: &str| eprint!("{chunk}");
//! let text = adapter
//!     .execute(ExecuteRequest::new("say hello").streaming(true), Some(&mut print))
//!     .await?;
//! ```

pub mod adapter;
pub mod error;
pub mod protocol;
pub mod stream;
pub mod types;

pub(crate) mod process;


pub use adapter::{ChunkSink, CliAdapter, LlmExecutor};
pub use error::AdapterError;
pub use protocol::{parse_line, StreamDecoder, TextAccumulator};
pub use stream::EventStream;
pub use types::{AdapterConfig, ExecuteRequest, ProcessResult, StreamEvent};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, AdapterError>;
