use crate::error::{EvalError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const EVAL_DIR: &str = ".eval";
pub const SCENARIOS_DIR: &str = ".eval/scenarios";
pub const DEFAULT_LOG_DIR: &str = ".eval/logs";

pub const CONFIG_FILE: &str = ".eval/config.yaml";

/// Chronological, append-only history of every judged run.
pub const HISTORY_FILE: &str = "judge_history.md";
/// Truncated per scenario; meant for `tail -f`.
pub const LIVE_LOG_FILE: &str = "live.log";
pub const RUNS_DIR: &str = "runs";

pub const AGENT_OUTPUT_FILE: &str = "agent_output.md";
pub const SUMMARY_FILE: &str = "summary.md";
pub const RECORD_FILE: &str = "record.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn eval_dir(root: &Path) -> PathBuf {
    root.join(EVAL_DIR)
}

pub fn scenarios_dir(root: &Path) -> PathBuf {
    root.join(SCENARIOS_DIR)
}

pub fn history_path(log_dir: &Path) -> PathBuf {
    log_dir.join(HISTORY_FILE)
}

pub fn live_log_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LIVE_LOG_FILE)
}

pub fn runs_dir(log_dir: &Path) -> PathBuf {
    log_dir.join(RUNS_DIR)
}

/// `<YYYYMMDD_HHMMSS>_<scenario>`
pub fn run_dir_name(timestamp: DateTime<Utc>, scenario: &str) -> String {
    format!("{}_{scenario}", timestamp.format("%Y%m%d_%H%M%S"))
}

pub fn judgment_file(domain: &str) -> String {
    format!("{domain}_judgment.md")
}

// ---------------------------------------------------------------------------
// Name validation
// ---------------------------------------------------------------------------

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9_\-]*[a-z0-9]$|^[a-z0-9]$").expect("valid name regex")
    })
}

/// Scenario and domain names end up in file names, so they are restricted
/// to lowercase alphanumerics, hyphens and underscores.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 || !name_re().is_match(name) {
        return Err(EvalError::InvalidName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
