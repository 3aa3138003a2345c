use crate::output::{print_json, print_outcome};
use anyhow::Context;
use eval_core::{Config, Harness, Scenario};
use std::path::Path;

pub fn run(root: &Path, scenario_path: &Path, output_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let scenario = Scenario::load(scenario_path)
        .with_context(|| format!("failed to load {}", scenario_path.display()))?;
    let agent_output = std::fs::read_to_string(output_path)
        .with_context(|| format!("failed to read {}", output_path.display()))?;

    let harness = Harness::new(config, root)?;
    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt
        .block_on(harness.judge_output(&scenario, &agent_output))
        .with_context(|| format!("judging '{}' failed", scenario.name))?;

    if json {
        print_json(&outcome)?;
    } else {
        print_outcome(&outcome);
    }
    super::run::report_mismatches(std::slice::from_ref(&outcome))
}
