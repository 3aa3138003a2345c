//! Splits the judge's composite reply into per-domain judgments and pulls a
//! numeric score out of each.
//!
//! LLM formatting is not fully reliable, so every step degrades instead of
//! failing: a missing section becomes a zero-score judgment flagged as
//! degraded, and an unreadable total becomes zero.

use crate::compose::{display_name, end_marker, start_marker};
use crate::verdict::DomainJudgment;
use regex::Regex;
use std::sync::OnceLock;

/// Placeholder `score_text` for a domain whose section could not be found.
pub const PARSE_ERROR_TEXT: &str = "ERROR: Could not parse judgment";

// ---------------------------------------------------------------------------
// ResponseSegmenter
// ---------------------------------------------------------------------------

/// Turns a composite judge response into one judgment per domain.
///
/// Implementations must return exactly one judgment for every entry in
/// `domains`, in the same order, and must not fail.
pub trait ResponseSegmenter: Send + Sync {
    fn segment(&self, response: &str, domains: &[String]) -> Vec<DomainJudgment>;
}

/// Finds `### DOMAIN: x` … `### END DOMAIN: x` sections by literal marker.
#[derive(Debug, Clone)]
pub struct DelimitedSegmenter {
    max_score_per_domain: u32,
}

impl DelimitedSegmenter {
    pub fn new(max_score_per_domain: u32) -> Self {
        Self {
            max_score_per_domain,
        }
    }

    fn judge_one(&self, response: &str, domain: &str) -> DomainJudgment {
        let Some(section) = find_section(response, domain) else {
            tracing::warn!(domain, "judgment markers not found; scoring domain as 0");
            return DomainJudgment::degraded(domain);
        };

        let raw = extract_score(section, domain);
        let score = if raw > self.max_score_per_domain {
            tracing::warn!(
                domain,
                score = raw,
                max = self.max_score_per_domain,
                "score exceeds per-domain maximum; clamping"
            );
            self.max_score_per_domain
        } else {
            raw
        };

        DomainJudgment {
            domain: domain.to_string(),
            score_text: section.to_string(),
            score,
            degraded: false,
        }
    }
}

impl ResponseSegmenter for DelimitedSegmenter {
    fn segment(&self, response: &str, domains: &[String]) -> Vec<DomainJudgment> {
        domains
            .iter()
            .map(|d| self.judge_one(response, d))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Section lookup
// ---------------------------------------------------------------------------

/// Text between the domain's start and end markers, trimmed.
///
/// The start marker must sit on a line of its own. The end marker may follow
/// text on the same line but must not run into another name character, so
/// `test` never matches `tests`.
pub fn find_section<'r>(response: &'r str, domain: &str) -> Option<&'r str> {
    let pattern = format!(
        r"(?ms)^[ \t]*{}[ \t]*\r?$(.*?){}(?:[^\w-]|$)",
        regex::escape(&start_marker(domain)),
        regex::escape(&end_marker(domain)),
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

// ---------------------------------------------------------------------------
// Score extraction
// ---------------------------------------------------------------------------

static LOOSE_TOTAL_RE: OnceLock<Regex> = OnceLock::new();

fn loose_total_re() -> &'static Regex {
    LOOSE_TOTAL_RE
        .get_or_init(|| Regex::new(r"(?i)Total:[ \t]*(\d+)[ \t]*/[ \t]*\d+").expect("valid regex"))
}

/// Extract the domain total from `score_text`.
///
/// Tries `## {Domain} Total: NN/MM` first (case-insensitive, one or two
/// `#`), then any `Total: NN/MM`, and gives 0 when neither matches.
pub fn extract_score(score_text: &str, domain: &str) -> u32 {
    let primary = Regex::new(&format!(
        r"(?i)##?[ \t]*{}[ \t]+Total:[ \t]*(\d+)[ \t]*/[ \t]*\d+",
        regex::escape(&display_name(domain)),
    ))
    .ok();

    if let Some(score) = primary.as_ref().and_then(|re| first_number(re, score_text)) {
        return score;
    }
    if let Some(score) = first_number(loose_total_re(), score_text) {
        tracing::debug!(domain, score, "score found via fallback pattern");
        return score;
    }
    tracing::warn!(domain, "no score pattern found; using 0");
    0
}

fn first_number(re: &Regex, text: &str) -> Option<u32> {
    re.captures_iter(text)
        .find_map(|c| c.get(1).and_then(|m| m.as_str().parse().ok()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
