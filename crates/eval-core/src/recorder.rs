//! Persists every judged run: one entry in the append-only history file and
//! one timestamped directory of artifacts.
//!
//! Layout under `log_dir`:
//!
//! ```text
//! judge_history.md                      append-only, one entry per run
//! live.log                              truncated per scenario, tail -f
//! runs/<YYYYMMDD_HHMMSS>_<scenario>/
//!     agent_output.md
//!     <domain>_judgment.md              one per domain
//!     summary.md
//!     record.json
//! ```

use crate::compose::display_name;
use crate::error::{EvalError, Result};
use crate::io;
use crate::paths;
use crate::verdict::Verdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Serializes history appends within this process.
static HISTORY_LOCK: Mutex<()> = Mutex::new(());

// ---------------------------------------------------------------------------
// RunRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    pub agent_duration_ms: u64,
    pub judge_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl Timing {
    pub fn new(agent: Duration, judge: Duration, total: Duration) -> Self {
        Self {
            agent_duration_ms: agent.as_millis() as u64,
            judge_duration_ms: judge.as_millis() as u64,
            total_duration_ms: total.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub timestamp: DateTime<Utc>,
    pub scenario_name: String,
    pub git_sha: String,
    pub git_branch: String,
    pub verdict: Verdict,
    pub timing: Timing,
    pub agent_output: String,
}

// ---------------------------------------------------------------------------
// RunRecorder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunRecorder {
    log_dir: PathBuf,
}

impl RunRecorder {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn history_path(&self) -> PathBuf {
        paths::history_path(&self.log_dir)
    }

    /// Write all artifacts for `record` and append its history entry.
    /// Returns the run directory.
    pub fn record(&self, record: &RunRecord) -> Result<PathBuf> {
        io::ensure_dir(&self.log_dir)?;
        let run_dir = self.create_run_dir(record)?;

        io::atomic_write(
            &run_dir.join(paths::AGENT_OUTPUT_FILE),
            record.agent_output.as_bytes(),
        )?;
        let per_domain = record.verdict.max_score_per_domain;
        for judgment in &record.verdict.judgments {
            let body = format!(
                "# {} Judgment\n\n**Score:** {}/{per_domain}\n\n{}\n",
                display_name(&judgment.domain),
                judgment.score,
                judgment.score_text.trim_end(),
            );
            io::atomic_write(
                &run_dir.join(paths::judgment_file(&judgment.domain)),
                body.as_bytes(),
            )?;
        }
        io::atomic_write(
            &run_dir.join(paths::SUMMARY_FILE),
            summary_markdown(record).as_bytes(),
        )?;
        let json = serde_json::to_string_pretty(record)?;
        io::atomic_write(&run_dir.join(paths::RECORD_FILE), json.as_bytes())?;

        let entry = history_entry(record, &self.relative(&run_dir));
        {
            let _guard = HISTORY_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
            io::append_text(&self.history_path(), &entry)?;
        }

        tracing::info!(
            scenario = %record.scenario_name,
            run_dir = %run_dir.display(),
            "run recorded"
        );
        Ok(run_dir)
    }

    /// Create a fresh run directory, suffixing `_2`, `_3`, … when a run with
    /// the same second and scenario already exists.
    fn create_run_dir(&self, record: &RunRecord) -> Result<PathBuf> {
        let runs = paths::runs_dir(&self.log_dir);
        io::ensure_dir(&runs)?;
        let base = paths::run_dir_name(record.timestamp, &record.scenario_name);

        let mut attempt = 1u32;
        loop {
            let name = match attempt {
                1 => base.clone(),
                n => format!("{base}_{n}"),
            };
            let candidate = runs.join(name);
            match std::fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(EvalError::persistence(candidate, e)),
            }
        }
    }

    fn relative(&self, run_dir: &Path) -> String {
        run_dir
            .strip_prefix(&self.log_dir)
            .unwrap_or(run_dir)
            .display()
            .to_string()
    }
}

fn secs(ms: u64) -> String {
    format!("{:.1}s", ms as f64 / 1000.0)
}

fn history_entry(record: &RunRecord, run_dir: &str) -> String {
    let v = &record.verdict;
    let t = &record.timing;
    let per_domain = v.max_score_per_domain;

    let mut s = String::new();
    let _ = writeln!(s, "## Run: {}\n", record.scenario_name);
    let _ = writeln!(s, "- **Timestamp:** {}", record.timestamp.to_rfc3339());
    let _ = writeln!(s, "- **Git:** `{}` on `{}`", record.git_sha, record.git_branch);
    let _ = writeln!(
        s,
        "- **Timing:** agent {}, judge {}, total {}",
        secs(t.agent_duration_ms),
        secs(t.judge_duration_ms),
        secs(t.total_duration_ms),
    );
    let _ = writeln!(
        s,
        "- **Result:** {} ({}/{}, {}%, threshold {})",
        if v.passed { "PASS" } else { "FAIL" },
        v.total_score,
        v.max_score,
        v.percentage,
        v.pass_threshold,
    );
    let _ = writeln!(s, "- **Artifacts:** `{run_dir}`\n");
    let _ = writeln!(s, "### Scores\n");
    for j in &v.judgments {
        let note = if j.degraded { " (could not parse)" } else { "" };
        let _ = writeln!(s, "- {}: {}/{per_domain}{note}", j.domain, j.score);
    }
    s.push_str("\n---\n\n");
    s
}

fn summary_markdown(record: &RunRecord) -> String {
    let v = &record.verdict;
    let per_domain = v.max_score_per_domain;

    let mut s = String::new();
    let _ = writeln!(s, "# {}\n", record.scenario_name);
    let _ = writeln!(s, "**Result:** {v}\n");
    let _ = writeln!(
        s,
        "- Timestamp: {}\n- Git: `{}` on `{}`\n- Agent: {}\n- Judge: {}\n- Total: {}\n",
        record.timestamp.to_rfc3339(),
        record.git_sha,
        record.git_branch,
        secs(record.timing.agent_duration_ms),
        secs(record.timing.judge_duration_ms),
        secs(record.timing.total_duration_ms),
    );
    s.push_str("| Domain | Score | Judgment |\n|---|---|---|\n");
    for j in &v.judgments {
        let file = paths::judgment_file(&j.domain);
        let _ = writeln!(
            s,
            "| {} | {}/{per_domain}{} | [{file}]({file}) |",
            j.domain,
            j.score,
            if j.degraded { " ⚠" } else { "" },
        );
    }
    let _ = writeln!(
        s,
        "\nAgent output: [{f}]({f})",
        f = paths::AGENT_OUTPUT_FILE
    );
    s
}

// ---------------------------------------------------------------------------
// LiveLog
// ---------------------------------------------------------------------------

/// Plain-text file mirroring streamed output as it arrives, for a human
/// running `tail -f`. Failures only warn: the history file is the record.
#[derive(Debug)]
pub struct LiveLog {
    path: PathBuf,
    file: Option<std::fs::File>,
}

impl LiveLog {
    /// Truncate (or create) `live.log` under `log_dir` and write `header`.
    pub fn start(log_dir: &Path, header: &str) -> Self {
        let path = paths::live_log_path(log_dir);
        let file = std::fs::create_dir_all(log_dir)
            .and_then(|_| std::fs::File::create(&path))
            .map_err(|e| {
                tracing::warn!(path = %path.display(), error = %e, "cannot open live log");
            })
            .ok();
        let mut log = Self { path, file };
        log.append(header);
        log
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, text: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let written = file.write_all(text.as_bytes()).and_then(|_| file.flush());
        if let Err(e) = written {
            tracing::warn!(path = %self.path.display(), error = %e, "live log write failed; disabling");
            self.file = None;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
