use crate::segment::PARSE_ERROR_TEXT;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// DomainJudgment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainJudgment {
    pub domain: String,
    /// The judge's raw text for this domain, markers excluded.
    pub score_text: String,
    pub score: u32,
    /// Set when the domain's section could not be located in the response.
    #[serde(default)]
    pub degraded: bool,
}

impl DomainJudgment {
    pub fn degraded(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            score_text: PARSE_ERROR_TEXT.to_string(),
            score: 0,
            degraded: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub judgments: Vec<DomainJudgment>,
    pub total_score: u32,
    pub max_score: u32,
    #[serde(default)]
    pub max_score_per_domain: u32,
    /// `floor(total * 100 / max)`.
    pub percentage: u32,
    /// Smallest total that passes: `ceil(max * threshold_percent / 100)`.
    pub pass_threshold: u32,
    pub passed: bool,
}

impl Verdict {
    /// Score exactly the `domains` that were asked for, in that order.
    ///
    /// A domain with no judgment counts as degraded (score 0). Judgments for
    /// domains that were not asked for are dropped, as are repeats.
    pub fn for_domains(
        domains: &[String],
        judgments: Vec<DomainJudgment>,
        max_score_per_domain: u32,
        threshold_percent: u32,
    ) -> Self {
        let mut judgments: Vec<Option<DomainJudgment>> =
            judgments.into_iter().map(Some).collect();
        let mut ordered = Vec::with_capacity(domains.len());
        for domain in domains {
            let found = judgments
                .iter_mut()
                .find(|slot| matches!(slot, Some(j) if &j.domain == domain))
                .and_then(Option::take);
            ordered.push(found.unwrap_or_else(|| {
                tracing::warn!(domain = %domain, "no judgment for domain; scoring it as degraded");
                DomainJudgment::degraded(domain)
            }));
        }
        for extra in judgments.into_iter().flatten() {
            tracing::warn!(domain = %extra.domain, "dropping unexpected or repeated judgment");
        }
        Self::from_judgments(ordered, max_score_per_domain, threshold_percent)
    }

    /// Score `judgments` as given: one domain per entry.
    pub fn from_judgments(
        judgments: Vec<DomainJudgment>,
        max_score_per_domain: u32,
        threshold_percent: u32,
    ) -> Self {
        let total: u64 = judgments.iter().map(|j| u64::from(j.score)).sum();
        let max = u64::from(max_score_per_domain) * judgments.len() as u64;
        let percentage = if max == 0 { 0 } else { total * 100 / max };
        let pass_threshold = (max * u64::from(threshold_percent)).div_ceil(100);

        Self {
            judgments,
            total_score: saturate(total),
            max_score: saturate(max),
            max_score_per_domain,
            percentage: saturate(percentage),
            pass_threshold: saturate(pass_threshold),
            passed: total >= pass_threshold,
        }
    }

    pub fn degraded_domains(&self) -> Vec<&str> {
        self.judgments
            .iter()
            .filter(|j| j.degraded)
            .map(|j| j.domain.as_str())
            .collect()
    }

    /// `backend 45/50, frontend 40/50, ...`
    pub fn breakdown(&self) -> String {
        let per_domain = self.max_score_per_domain;
        self.judgments
            .iter()
            .map(|j| {
                let flag = if j.degraded { " (unparsed)" } else { "" };
                format!("{} {}/{per_domain}{flag}", j.domain, j.score)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

}

/// `validate()` rejects configurations whose totals do not fit in `u32`.
fn saturate(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{} ({}%, threshold {})",
            if self.passed { "PASS" } else { "FAIL" },
            self.total_score,
            self.max_score,
            self.percentage,
            self.pass_threshold,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn judgments(scores: &[u32]) -> Vec<DomainJudgment> {
        ["backend", "frontend", "tests", "security"]
            .iter()
            .zip(scores)
            .map(|(d, &score)| DomainJudgment {
                domain: d.to_string(),
                score_text: String::new(),
                score,
                degraded: false,
            })
            .collect()
    }

    #[test]
    fn sums_and_floors_percentage() {
        let v = Verdict::from_judgments(judgments(&[45, 40, 38, 42]), 50, 70);
        assert_eq!(v.total_score, 165);
        assert_eq!(v.max_score, 200);
        assert_eq!(v.percentage, 82);
        assert_eq!(v.pass_threshold, 140);
        assert!(v.passed);
    }

    #[test]
    fn threshold_boundary() {
        assert!(Verdict::from_judgments(judgments(&[35, 35, 35, 35]), 50, 70).passed);
        assert!(!Verdict::from_judgments(judgments(&[35, 35, 35, 34]), 50, 70).passed);
        assert!(Verdict::from_judgments(judgments(&[50, 50, 50, 50]), 50, 70).passed);
    }

    #[test]
    fn threshold_rounds_up() {
        // 3 domains * 10 = 30; 70% = 21 exactly, 75% = 22.5 -> 23
        assert_eq!(Verdict::from_judgments(judgments(&[7, 7, 7]), 10, 70).pass_threshold, 21);
        let v = Verdict::from_judgments(judgments(&[8, 7, 7]), 10, 75);
        assert_eq!(v.pass_threshold, 23);
        assert!(!v.passed);
    }

    #[test]
    fn degraded_judgment_counts_as_zero() {
        let mut js = judgments(&[45, 40, 38]);
        js.push(DomainJudgment::degraded("security"));
        let v = Verdict::from_judgments(js, 50, 70);
        assert_eq!(v.total_score, 123);
        assert_eq!(v.max_score, 200);
        assert!(!v.passed);
        assert_eq!(v.degraded_domains(), vec!["security"]);
        assert!(v.breakdown().contains("security 0/50 (unparsed)"));
    }

    fn names(domains: &[&str]) -> Vec<String> {
        domains.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn missing_domain_counts_against_configured_total() {
        let domains = names(&["backend", "frontend", "tests", "security"]);
        let v = Verdict::for_domains(&domains, judgments(&[45, 40, 38]), 50, 70);
        assert_eq!(v.total_score, 123);
        assert_eq!(v.max_score, 200);
        assert_eq!(v.percentage, 61);
        assert!(!v.passed);
        assert_eq!(v.judgments.len(), 4);
        assert_eq!(v.degraded_domains(), vec!["security"]);
    }

    #[test]
    fn unexpected_and_repeated_domains_are_dropped() {
        let mut js = judgments(&[45, 40]);
        js.push(DomainJudgment {
            domain: "backend".into(),
            score_text: String::new(),
            score: 1,
            degraded: false,
        });
        js.push(DomainJudgment {
            domain: "docs".into(),
            score_text: String::new(),
            score: 50,
            degraded: false,
        });
        let v = Verdict::for_domains(&names(&["frontend", "backend"]), js, 50, 70);
        let order: Vec<&str> = v.judgments.iter().map(|j| j.domain.as_str()).collect();
        assert_eq!(order, vec!["frontend", "backend"]);
        assert_eq!(v.total_score, 85);
        assert_eq!(v.max_score, 100);
        assert!(v.degraded_domains().is_empty());
    }

    #[test]
    fn huge_maximum_does_not_overflow() {
        let v = Verdict::from_judgments(judgments(&[0, 0, 0, 0]), 2_000_000_000, 70);
        assert_eq!(v.max_score, u32::MAX);
        assert_eq!(v.max_score_per_domain, 2_000_000_000);
        assert_eq!(v.percentage, 0);
        assert!(!v.passed);
    }

    #[test]
    fn empty_judgments_do_not_divide_by_zero() {
        let v = Verdict::from_judgments(vec![], 50, 70);
        assert_eq!(v.percentage, 0);
        assert_eq!(v.pass_threshold, 0);
        assert_eq!(v.breakdown(), "");
    }

    #[test]
    fn display_summarizes() {
        let v = Verdict::from_judgments(judgments(&[45, 40, 38, 42]), 50, 70);
        assert_eq!(v.to_string(), "PASS 165/200 (82%, threshold 140)");
    }
}
