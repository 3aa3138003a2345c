//! Runs one scenario end to end: agent, judge, verdict, record.
//!
//! Phases are strictly sequential. Tool and process failures abort the
//! scenario; an unparseable judgment does not, it degrades that domain.

use crate::compose::{compose, JUDGE_SYSTEM_PROMPT};
use crate::config::Config;
use crate::error::{EvalError, Result};
use crate::library::{ContentLibrary, DomainSpec};
use crate::recorder::{LiveLog, RunRecord, RunRecorder, Timing};
use crate::scenario::Scenario;
use crate::segment::{DelimitedSegmenter, ResponseSegmenter};
use crate::vcs::{GitCli, VcsContextProvider};
use crate::verdict::Verdict;
use chrono::Utc;
use llm_adapter::{CliAdapter, ExecuteRequest, LlmExecutor};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// ScenarioOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub scenario: String,
    pub expected_pass: bool,
    pub verdict: Verdict,
    pub timing: Timing,
    pub run_dir: PathBuf,
}

impl ScenarioOutcome {
    pub fn matches_expectation(&self) -> bool {
        self.verdict.passed == self.expected_pass
    }

    /// Fail with the score breakdown and artifact location when the verdict
    /// disagrees with the scenario's `expected_pass`.
    pub fn check_expectation(&self) -> Result<()> {
        if self.matches_expectation() {
            return Ok(());
        }
        let expected = if self.expected_pass { "PASS" } else { "FAIL" };
        let mut message = format!(
            "scenario '{}': expected {expected}, got {}\n  scores: {}",
            self.scenario,
            self.verdict,
            self.verdict.breakdown(),
        );
        let degraded = self.verdict.degraded_domains();
        if !degraded.is_empty() {
            message.push_str(&format!("\n  unparsed: {}", degraded.join(", ")));
        }
        message.push_str(&format!("\n  artifacts: {}", self.run_dir.display()));
        Err(EvalError::UnexpectedVerdict(message))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    config: Config,
    executor: Arc<dyn LlmExecutor>,
    library: ContentLibrary,
    recorder: RunRecorder,
    vcs: Box<dyn VcsContextProvider>,
    segmenter: Box<dyn ResponseSegmenter>,
}

impl Harness {
    /// Production wiring: the configured CLI tool, git, and content
    /// directories relative to `root`.
    pub fn new(config: Config, root: &Path) -> Result<Self> {
        let executor = Arc::new(CliAdapter::new(config.adapter_config()));
        let library = ContentLibrary::from_config(&config, root);
        let recorder = RunRecorder::new(config.resolve_log_dir(root));
        Self::with_parts(
            config,
            executor,
            library,
            recorder,
            Box::new(GitCli::new(root)),
        )
    }

    pub fn with_parts(
        config: Config,
        executor: Arc<dyn LlmExecutor>,
        library: ContentLibrary,
        recorder: RunRecorder,
        vcs: Box<dyn VcsContextProvider>,
    ) -> Result<Self> {
        config.ensure_valid()?;
        let segmenter = Box::new(DelimitedSegmenter::new(config.max_score_per_domain));
        Ok(Self {
            config,
            executor,
            library,
            recorder,
            vcs,
            segmenter,
        })
    }

    pub fn with_segmenter(mut self, segmenter: Box<dyn ResponseSegmenter>) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn recorder(&self) -> &RunRecorder {
        &self.recorder
    }

    /// Run the agent on `scenario`, then judge and record its output.
    pub async fn run_scenario(&self, scenario: &Scenario) -> Result<ScenarioOutcome> {
        scenario.validate()?;
        let specs = self.domain_specs()?;
        let started = Instant::now();
        let mut live = self.start_live_log(scenario);

        tracing::info!(scenario = %scenario.name, "agent phase");
        live.append("\n--- agent ---\n");
        let mut request =
            ExecuteRequest::new(&scenario.agent_prompt).streaming(self.config.streaming);
        if let Some(sp) = scenario.system_prompt() {
            request = request.system_prompt(sp);
        }
        let agent_started = Instant::now();
        let agent_output = self.invoke("agent", request, &mut live).await?;
        let agent_elapsed = agent_started.elapsed();
        tracing::info!(
            scenario = %scenario.name,
            chars = agent_output.len(),
            elapsed_ms = agent_elapsed.as_millis() as u64,
            "agent finished"
        );

        self.judge(scenario, &specs, agent_output, agent_elapsed, started, &mut live)
            .await
    }

    /// Judge an output produced elsewhere; the agent phase is skipped.
    pub async fn judge_output(
        &self,
        scenario: &Scenario,
        agent_output: &str,
    ) -> Result<ScenarioOutcome> {
        scenario.validate()?;
        let specs = self.domain_specs()?;
        let started = Instant::now();
        let mut live = self.start_live_log(scenario);
        self.judge(
            scenario,
            &specs,
            agent_output.to_string(),
            Duration::ZERO,
            started,
            &mut live,
        )
        .await
    }

    async fn judge(
        &self,
        scenario: &Scenario,
        specs: &[DomainSpec],
        agent_output: String,
        agent_elapsed: Duration,
        started: Instant,
        live: &mut LiveLog,
    ) -> Result<ScenarioOutcome> {
        let max_per_domain = self.config.max_score_per_domain;
        let prompt = compose(&scenario.agent_prompt, &agent_output, specs, max_per_domain)?;

        tracing::info!(
            scenario = %scenario.name,
            domains = specs.len(),
            prompt_chars = prompt.len(),
            "judge phase"
        );
        live.append("\n--- judge ---\n");
        let request = ExecuteRequest::new(&prompt)
            .system_prompt(JUDGE_SYSTEM_PROMPT)
            .streaming(self.config.streaming);
        let judge_started = Instant::now();
        let response = self.invoke("judge", request, live).await?;
        let judge_elapsed = judge_started.elapsed();

        let names: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
        let judgments = self.segmenter.segment(&response, &names);
        let verdict = Verdict::for_domains(
            &names,
            judgments,
            max_per_domain,
            self.config.pass_threshold_percent,
        );
        tracing::info!(scenario = %scenario.name, %verdict, "verdict");
        live.append(&format!("\n--- verdict: {verdict} ---\n"));

        let timing = Timing::new(agent_elapsed, judge_elapsed, started.elapsed());
        let record = RunRecord {
            timestamp: Utc::now(),
            scenario_name: scenario.name.clone(),
            git_sha: self.vcs.current_sha(),
            git_branch: self.vcs.current_branch(),
            verdict,
            timing,
            agent_output,
        };
        let run_dir = self.recorder.record(&record)?;

        Ok(ScenarioOutcome {
            scenario: record.scenario_name,
            expected_pass: scenario.expected_pass,
            verdict: record.verdict,
            timing,
            run_dir,
        })
    }

    async fn invoke(
        &self,
        phase: &'static str,
        request: ExecuteRequest<'_>,
        live: &mut LiveLog,
    ) -> Result<String> {
        let streaming = request.streaming;
        let mut sink = |chunk: &str| live.append(chunk);
        let text = self
            .executor
            .execute(request, Some(&mut sink))
            .await
            .map_err(|source| EvalError::Llm { phase, source })?;
        if !streaming {
            live.append(&text);
        }
        Ok(text)
    }

    fn domain_specs(&self) -> Result<Vec<DomainSpec>> {
        self.library.domain_specs(&self.config.domains)
    }

    fn start_live_log(&self, scenario: &Scenario) -> LiveLog {
        let log = LiveLog::start(
            self.recorder.log_dir(),
            &format!("=== {} @ {} ===\n", scenario.name, Utc::now().to_rfc3339()),
        );
        tracing::debug!(path = %log.path().display(), "live log started");
        log
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::FixedVcs;
    use crate::verdict::DomainJudgment;
    use async_trait::async_trait;
    use llm_adapter::{AdapterError, ChunkSink};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Debug, Clone)]
    struct SeenRequest {
        prompt: String,
        system_prompt: Option<String>,
        streaming: bool,
    }

    /// Returns canned responses in order, streaming each in two chunks.
    #[derive(Default)]
    struct ScriptedExecutor {
        responses: Mutex<VecDeque<llm_adapter::Result<String>>>,
        seen: Mutex<Vec<SeenRequest>>,
    }

    impl ScriptedExecutor {
        fn new(responses: Vec<llm_adapter::Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                seen: Mutex::default(),
            })
        }

        fn seen(&self) -> Vec<SeenRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmExecutor for ScriptedExecutor {
        async fn execute(
            &self,
            request: ExecuteRequest<'_>,
            on_chunk: Option<ChunkSink<'_>>,
        ) -> llm_adapter::Result<String> {
            self.seen.lock().unwrap().push(SeenRequest {
                prompt: request.prompt.to_string(),
                system_prompt: request.system_prompt.map(str::to_string),
                streaming: request.streaming,
            });
            let response = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected extra request");
            if let (Ok(text), Some(sink), true) = (&response, on_chunk, request.streaming) {
                let mid = text.char_indices().nth(text.chars().count() / 2).map_or(0, |(i, _)| i);
                sink(&text[..mid]);
                sink(&text[mid..]);
            }
            response
        }
    }

    const AGENT_OUTPUT: &str = "class Post < ApplicationRecord\n  validates :title, presence: true\nend\n";

    fn judge_response(scores: &[(&str, u32)]) -> String {
        scores
            .iter()
            .map(|(d, s)| {
                format!(
                    "### DOMAIN: {d}\nReviewed.\n## {} Total: {s}/50\n### END DOMAIN: {d}\n\n",
                    crate::compose::display_name(d)
                )
            })
            .collect()
    }

    fn fixture(executor: Arc<ScriptedExecutor>) -> (TempDir, Harness) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("rubrics")).unwrap();
        for d in ["backend", "frontend", "tests", "security"] {
            std::fs::write(root.join(format!("rubrics/{d}-rubric.md")), format!("{d} rubric")).unwrap();
        }
        let config = Config::default();
        let harness = Harness::with_parts(
            config.clone(),
            executor,
            ContentLibrary::from_config(&config, root),
            RunRecorder::new(config.resolve_log_dir(root)),
            Box::new(FixedVcs::new("abc123", "main")),
        )
        .unwrap();
        (dir, harness)
    }

    fn scenario(expected_pass: bool) -> Scenario {
        Scenario::new(
            "blog-post",
            "You are a Rails developer.",
            "Add a Post model",
            expected_pass,
        )
    }

    #[tokio::test]
    async fn run_scenario_end_to_end() {
        let exec = ScriptedExecutor::new(vec![
            Ok(AGENT_OUTPUT.to_string()),
            Ok(judge_response(&[
                ("backend", 45),
                ("frontend", 40),
                ("tests", 38),
                ("security", 42),
            ])),
        ]);
        let (_dir, harness) = fixture(exec.clone());

        let outcome = harness.run_scenario(&scenario(true)).await.unwrap();
        assert_eq!(outcome.verdict.total_score, 165);
        assert_eq!(outcome.verdict.percentage, 82);
        assert!(outcome.verdict.passed);
        outcome.check_expectation().unwrap();

        let seen = exec.seen();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].prompt, "Add a Post model");
        assert_eq!(seen[0].system_prompt.as_deref(), Some("You are a Rails developer."));
        assert!(seen[0].streaming);
        assert!(seen[1].prompt.contains(AGENT_OUTPUT));
        assert!(seen[1].prompt.contains("security rubric"));
        assert_eq!(seen[1].system_prompt.as_deref(), Some(JUDGE_SYSTEM_PROMPT));

        assert!(outcome.run_dir.join("agent_output.md").is_file());
        assert!(outcome.run_dir.join("tests_judgment.md").is_file());
        let history = std::fs::read_to_string(harness.recorder().history_path()).unwrap();
        assert!(history.contains("## Run: blog-post"));
        assert!(history.contains("`abc123` on `main`"));

        let live = std::fs::read_to_string(
            crate::paths::live_log_path(harness.recorder().log_dir()),
        )
        .unwrap();
        assert!(live.contains(AGENT_OUTPUT));
        assert!(live.contains("### END DOMAIN: security"));
    }

    #[tokio::test]
    async fn missing_domain_degrades_and_reports() {
        let exec = ScriptedExecutor::new(vec![
            Ok(AGENT_OUTPUT.to_string()),
            Ok(judge_response(&[("backend", 45), ("frontend", 40), ("tests", 38)])),
        ]);
        let (_dir, harness) = fixture(exec);

        let outcome = harness.run_scenario(&scenario(true)).await.unwrap();
        assert_eq!(outcome.verdict.total_score, 123);
        assert!(!outcome.verdict.passed);
        assert_eq!(outcome.verdict.degraded_domains(), vec!["security"]);

        let err = outcome.check_expectation().unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, EvalError::UnexpectedVerdict(_)));
        assert!(msg.contains("expected PASS"));
        assert!(msg.contains("backend 45/50"));
        assert!(msg.contains("unparsed: security"));
        assert!(msg.contains(&outcome.run_dir.display().to_string()));
    }

    /// Returns judgments only for domains it recognizes, plus one stray.
    struct PartialSegmenter;

    impl ResponseSegmenter for PartialSegmenter {
        fn segment(&self, _response: &str, _domains: &[String]) -> Vec<DomainJudgment> {
            [("backend", 45), ("frontend", 40), ("tests", 38), ("docs", 50)]
                .iter()
                .map(|(d, s)| DomainJudgment {
                    domain: d.to_string(),
                    score_text: String::new(),
                    score: *s,
                    degraded: false,
                })
                .collect()
        }
    }

    #[tokio::test]
    async fn custom_segmenter_is_scored_against_configured_domains() {
        let exec = ScriptedExecutor::new(vec![
            Ok(AGENT_OUTPUT.to_string()),
            Ok("free-form review".to_string()),
        ]);
        let (_dir, harness) = fixture(exec);
        let harness = harness.with_segmenter(Box::new(PartialSegmenter));

        let outcome = harness.run_scenario(&scenario(true)).await.unwrap();
        let v = &outcome.verdict;
        assert_eq!(v.total_score, 123);
        assert_eq!(v.max_score, 200);
        assert_eq!(v.percentage, 61);
        assert!(!v.passed);
        assert_eq!(v.degraded_domains(), vec!["security"]);
        assert!(v.judgments.iter().all(|j| j.domain != "docs"));
        assert!(outcome.run_dir.join("security_judgment.md").is_file());
    }

    #[tokio::test]
    async fn expected_failure_that_fails_is_ok() {
        let exec = ScriptedExecutor::new(vec![
            Ok("nothing useful".to_string()),
            Ok(judge_response(&[
                ("backend", 5),
                ("frontend", 5),
                ("tests", 0),
                ("security", 10),
            ])),
        ]);
        let (_dir, harness) = fixture(exec);
        let outcome = harness.run_scenario(&scenario(false)).await.unwrap();
        assert!(!outcome.verdict.passed);
        outcome.check_expectation().unwrap();
    }

    #[tokio::test]
    async fn agent_failure_aborts_without_recording() {
        let exec = ScriptedExecutor::new(vec![Err(AdapterError::Process {
            exit_code: Some(2),
            stderr: "rate limited".into(),
            partial_output: String::new(),
        })]);
        let (_dir, harness) = fixture(exec.clone());

        let err = harness.run_scenario(&scenario(true)).await.unwrap_err();
        assert!(matches!(err, EvalError::Llm { phase: "agent", .. }), "{err}");
        assert!(err.to_string().contains("rate limited"));
        assert_eq!(exec.seen().len(), 1);
        assert!(!harness.recorder().history_path().exists());
    }

    #[tokio::test]
    async fn judge_output_skips_agent_phase() {
        let exec = ScriptedExecutor::new(vec![Ok(judge_response(&[
            ("backend", 50),
            ("frontend", 50),
            ("tests", 50),
            ("security", 50),
        ]))]);
        let (_dir, harness) = fixture(exec.clone());

        let outcome = harness
            .judge_output(&scenario(true), AGENT_OUTPUT)
            .await
            .unwrap();
        assert_eq!(outcome.verdict.total_score, 200);
        assert_eq!(outcome.timing.agent_duration_ms, 0);
        assert_eq!(exec.seen().len(), 1);
        assert!(exec.seen()[0].prompt.contains(AGENT_OUTPUT));
    }

    #[tokio::test]
    async fn missing_rubric_fails_before_any_invocation() {
        let exec = ScriptedExecutor::new(vec![]);
        let (dir, harness) = fixture(exec.clone());
        std::fs::remove_file(dir.path().join("rubrics/security-rubric.md")).unwrap();

        let err = harness.run_scenario(&scenario(true)).await.unwrap_err();
        assert!(matches!(err, EvalError::ContentNotFound { .. }), "{err}");
        assert!(exec.seen().is_empty());
    }
}
