//! Builds the single composite prompt that asks the judge to grade every
//! domain independently and to frame each answer with literal markers.

use crate::error::{EvalError, Result};
use crate::library::DomainSpec;
use std::fmt::Write as _;

pub const START_MARKER: &str = "### DOMAIN:";
pub const END_MARKER: &str = "### END DOMAIN:";

/// System prompt for the judge invocation.
pub const JUDGE_SYSTEM_PROMPT: &str = "You are a strict, impartial senior reviewer grading \
work produced by an AI coding agent. You score only against the rubric you are given, cite \
concrete evidence from the output for every deduction, and never award points for work that \
is not present. You follow the requested output format exactly.";

/// `### DOMAIN: backend`
pub fn start_marker(domain: &str) -> String {
    format!("{START_MARKER} {domain}")
}

/// `### END DOMAIN: backend`
pub fn end_marker(domain: &str) -> String {
    format!("{END_MARKER} {domain}")
}

/// `backend` → `Backend`, as used in the `## Backend Total: NN/MM` line.
pub fn display_name(domain: &str) -> String {
    let mut chars = domain.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `## Backend Total: NN/50`
pub fn total_line(domain: &str, max_score: u32) -> String {
    format!("## {} Total: NN/{max_score}", display_name(domain))
}

/// Compose the judge prompt for `agent_output` produced in response to
/// `agent_prompt`, covering every domain in `domains`.
pub fn compose(
    agent_prompt: &str,
    agent_output: &str,
    domains: &[DomainSpec],
    max_score_per_domain: u32,
) -> Result<String> {
    if domains.is_empty() {
        return Err(EvalError::NoDomains);
    }

    let names: Vec<&str> = domains.iter().map(|d| d.name.as_str()).collect();
    let mut p = String::with_capacity(agent_output.len() + 4096);

    let _ = writeln!(
        p,
        "You are running {n} independent evaluations of the same piece of work, one per \
         domain: {list}.\n\
         Treat each domain as if a separate reviewer were grading it in parallel: score it \
         only against its own rubric and context, and do not let findings in one domain raise \
         or lower the score of another.\n",
        n = domains.len(),
        list = names.join(", "),
    );

    p.push_str("# Original Requirements\n\n");
    p.push_str(agent_prompt.trim_end());
    p.push_str("\n\n");

    p.push_str("# Agent Output\n\n");
    p.push_str("The complete output under evaluation, verbatim:\n\n<agent_output>\n");
    p.push_str(agent_output);
    if !agent_output.ends_with('\n') {
        p.push('\n');
    }
    p.push_str("</agent_output>\n\n");

    p.push_str("# Evaluation Domains\n\n");
    for d in domains {
        let _ = writeln!(p, "## Domain `{}`\n", d.name);
        p.push_str("### Rubric\n\n");
        p.push_str(d.rubric.trim_end());
        p.push_str("\n\n");
        if !d.context.trim().is_empty() {
            p.push_str("### Supporting Context\n\n");
            p.push_str(d.context.trim_end());
            p.push_str("\n\n");
        }
    }

    let _ = writeln!(
        p,
        "# Required Output Format\n\n\
         Produce exactly one section per domain, in the order listed, and nothing outside \
         the sections. Each section starts and ends with the marker lines shown, written \
         exactly as shown on lines of their own. Inside, give your evaluation against the \
         rubric and finish with the total line, replacing NN with a whole number from 0 to \
         {max_score_per_domain}.\n"
    );
    for d in domains {
        let _ = writeln!(
            p,
            "{}\n<evaluation of {} against its rubric>\n{}\n{}\n",
            start_marker(&d.name),
            d.name,
            total_line(&d.name, max_score_per_domain),
            end_marker(&d.name),
        );
    }

    Ok(p)
}
