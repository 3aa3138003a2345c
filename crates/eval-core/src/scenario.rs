use crate::error::{EvalError, Result};
use crate::paths::validate_name;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One judged task: what the agent is told, and whether its output is
/// expected to clear the pass threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub system_prompt: String,
    pub agent_prompt: String,
    #[serde(default = "default_expected_pass")]
    pub expected_pass: bool,
}

fn default_expected_pass() -> bool {
    true
}

impl Scenario {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        agent_prompt: impl Into<String>,
        expected_pass: bool,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            agent_prompt: agent_prompt.into(),
            expected_pass,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let scenario: Scenario = serde_yaml::from_str(&data)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        if self.agent_prompt.trim().is_empty() {
            return Err(EvalError::InvalidScenario {
                name: self.name.clone(),
                reason: "agent_prompt is empty".to_string(),
            });
        }
        Ok(())
    }

    /// `None` when the scenario runs with the tool's default system prompt.
    pub fn system_prompt(&self) -> Option<&str> {
        let sp = self.system_prompt.trim();
        (!sp.is_empty()).then_some(self.system_prompt.as_str())
    }
}

/// Starter scenario written by `agent-eval init`.
pub const EXAMPLE_SCENARIO: &str = r#"name: example-blog-post-model
expected_pass: true
system_prompt: |
  You are a senior Rails developer. Follow the project's conventions:
  thin controllers, validations in models, fixtures for tests.
agent_prompt: |
  Add a Post model to a Rails 8 app with a title (required, max 120 chars)
  and a body. Include the migration, model validations, a controller with
  index/show/create, and model tests using fixtures.
"#;
