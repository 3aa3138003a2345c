use anyhow::Context;
use eval_core::{io, paths, scenario::EXAMPLE_SCENARIO, Config};
use std::path::Path;

const EXAMPLE_SCENARIO_FILE: &str = "example.yaml";

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing agent-eval in: {}", root.display());

    // 1. Create .eval directory structure
    for dir in [paths::EVAL_DIR, paths::SCENARIOS_DIR] {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    // 2. Write config.yaml if missing
    let config_path = paths::config_path(root);
    if !config_path.exists() {
        Config::default()
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }
    let config = Config::load(root).context("failed to load config")?;

    // 3. Example scenario
    let scenario_path = paths::scenarios_dir(root).join(EXAMPLE_SCENARIO_FILE);
    report(
        io::write_if_missing(&scenario_path, EXAMPLE_SCENARIO.as_bytes())?,
        &format!("{}/{EXAMPLE_SCENARIO_FILE}", paths::SCENARIOS_DIR),
    );

    // 4. Starter rubric per configured domain, in the first content directory
    if let Some(content_dir) = config.content_dirs.first() {
        for domain in &config.domains {
            let rel = content_dir.join(format!("{}.md", domain.rubric));
            let body = starter_rubric(&domain.name, config.max_score_per_domain);
            report(
                io::write_if_missing(&root.join(&rel), body.as_bytes())?,
                &rel.display().to_string(),
            );
        }
    }

    println!("\nagent-eval initialized.");
    println!("Next: edit the rubrics, then run `agent-eval run {}/{EXAMPLE_SCENARIO_FILE}`", paths::SCENARIOS_DIR);
    Ok(())
}

fn report(created: bool, rel: &str) {
    if created {
        println!("  created: {rel}");
    } else {
        println!("  exists:  {rel}");
    }
}

fn starter_rubric(domain: &str, max: u32) -> String {
    format!(
        "# {domain} rubric\n\n\
         Score the {domain} aspects of the work out of {max}.\n\n\
         ## Criteria\n\n\
         - Correctness: does it do what was asked? ({c} pts)\n\
         - Conventions: does it follow the project's established patterns? ({c} pts)\n\
         - Completeness: are edge cases and failure paths handled? ({rest} pts)\n\n\
         Deduct for every concrete problem you can point to in the output.\n",
        c = max * 2 / 5,
        rest = max - 2 * (max * 2 / 5),
    )
}
