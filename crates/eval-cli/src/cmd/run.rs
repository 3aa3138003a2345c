use crate::output::{print_json, print_outcome};
use anyhow::Context;
use eval_core::{Config, Harness, Scenario, ScenarioOutcome};
use std::path::{Path, PathBuf};

pub fn run(root: &Path, scenario_paths: &[PathBuf], json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let scenarios = scenario_paths
        .iter()
        .map(|p| Scenario::load(p).with_context(|| format!("failed to load {}", p.display())))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let harness = Harness::new(config, root)?;
    let rt = tokio::runtime::Runtime::new()?;

    let mut outcomes: Vec<ScenarioOutcome> = Vec::with_capacity(scenarios.len());
    let mut errors = Vec::new();
    for scenario in &scenarios {
        if !json {
            eprintln!("running {} ...", scenario.name);
        }
        match rt.block_on(harness.run_scenario(scenario)) {
            Ok(outcome) => {
                if !json {
                    print_outcome(&outcome);
                }
                outcomes.push(outcome);
            }
            Err(e) => {
                errors.push(format!("scenario '{}' failed: {e}", scenario.name));
            }
        }
    }

    if json {
        print_json(&outcomes)?;
    }
    let mismatches = report_mismatches(&outcomes);
    if errors.is_empty() {
        return mismatches;
    }
    let mut message = format!(
        "{} of {} scenario(s) could not be evaluated\n{}",
        errors.len(),
        scenarios.len(),
        errors.join("\n")
    );
    if let Err(e) = mismatches {
        message.push_str(&format!("\n{e}"));
    }
    anyhow::bail!(message)
}

/// Every verdict that disagrees with its scenario's expectation, as one error.
pub(crate) fn report_mismatches(outcomes: &[ScenarioOutcome]) -> anyhow::Result<()> {
    let failures: Vec<String> = outcomes
        .iter()
        .filter_map(|o| o.check_expectation().err())
        .map(|e| e.to_string())
        .collect();
    if failures.is_empty() {
        return Ok(());
    }
    anyhow::bail!(
        "{} of {} scenario(s) did not match expectation\n{}",
        failures.len(),
        outcomes.len(),
        failures.join("\n")
    )
}
