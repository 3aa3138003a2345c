//! `eval-core` — judge an agent's output against per-domain rubrics.
//!
//! A [`Harness`] runs a [`Scenario`] through an [`llm_adapter::LlmExecutor`]
//! twice: once as the agent, once as a judge grading every configured
//! domain in a single composite prompt. The judge's reply is segmented by
//! marker lines, scored, folded into a [`Verdict`] and persisted by the
//! [`RunRecorder`].

pub mod compose;
pub mod config;
pub mod error;
pub mod harness;
pub mod io;
pub mod library;
pub mod paths;
pub mod recorder;
pub mod scenario;
pub mod segment;
pub mod vcs;
pub mod verdict;

pub use config::{Config, ConfigWarning, DomainConfig, WarnLevel};
pub use error::{EvalError, Result};
pub use harness::{Harness, ScenarioOutcome};
pub use library::{ContentLibrary, DomainSpec};
pub use recorder::{LiveLog, RunRecord, RunRecorder, Timing};
pub use scenario::Scenario;
pub use segment::{DelimitedSegmenter, ResponseSegmenter};
pub use vcs::{FixedVcs, GitCli, VcsContextProvider};
pub use verdict::{DomainJudgment, Verdict};
