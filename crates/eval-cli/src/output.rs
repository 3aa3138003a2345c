use eval_core::ScenarioOutcome;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    // Calculate column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

/// Per-domain scores followed by the overall verdict line.
pub fn print_outcome(outcome: &ScenarioOutcome) {
    let v = &outcome.verdict;
    let per_domain = v.max_score_per_domain;

    println!("\n{}", outcome.scenario);
    let rows = v
        .judgments
        .iter()
        .map(|j| {
            vec![
                j.domain.clone(),
                format!("{}/{per_domain}", j.score),
                if j.degraded { "unparsed".into() } else { String::new() },
            ]
        })
        .collect();
    print_table(&["DOMAIN", "SCORE", "NOTE"], rows);

    let expectation = if outcome.matches_expectation() {
        "as expected"
    } else if outcome.expected_pass {
        "UNEXPECTED: expected pass"
    } else {
        "UNEXPECTED: expected fail"
    };
    println!("{v}  [{expectation}]");
    println!("artifacts: {}", outcome.run_dir.display());
}
