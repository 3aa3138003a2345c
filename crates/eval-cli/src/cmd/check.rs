use crate::output::print_json;
use anyhow::Context;
use eval_core::{Config, ConfigWarning, ContentLibrary, WarnLevel};
use llm_adapter::{CliAdapter, LlmExecutor};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let available = CliAdapter::new(config.adapter_config()).is_available();

    let mut warnings = config.validate();
    let library = ContentLibrary::from_config(&config, root);
    for domain in &config.domains {
        if let Err(e) = library.domain_spec(domain) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("domain '{}': {e}", domain.name),
            });
        }
    }

    if json {
        let value = serde_json::json!({
            "executable": config.executable,
            "available": available,
            "warnings": warnings,
        });
        print_json(&value)?;
    } else {
        let status = if available { "found" } else { "NOT FOUND" };
        println!("executable: {} ({status})", config.executable);
        if warnings.is_empty() {
            println!("Config is valid. No warnings.");
        }
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if !available {
        anyhow::bail!("'{}' is not on PATH", config.executable);
    }
    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config check found errors");
    }
    Ok(())
}
