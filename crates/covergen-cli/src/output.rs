use covergen_core::status::StatusSummary;
use covergen_core::types::StepStatus;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    // Calculate column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
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

/// One-line progress, e.g. `3/6 (50%) next: Prompt Generation`.
pub fn progress_line(status: &StatusSummary) -> String {
    let head = format!(
        "{}/{} ({}%)",
        status.completed_steps, status.total_steps, status.percent_complete
    );
    match (&status.current_step_name, status.is_failed, status.is_running) {
        (None, _, _) => format!("{head} complete"),
        (Some(step), true, _) => format!("{head} failed at: {step}"),
        (Some(step), _, true) => format!("{head} running: {step}"),
        (Some(step), _, _) => format!("{head} next: {step}"),
    }
}

/// Human-readable status: progress line plus a per-step table.
pub fn print_status(status: &StatusSummary) {
    println!("{}  {}", status.slug, progress_line(status));
    println!();
    let rows = status
        .steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            vec![
                (i + 1).to_string(),
                step.name.clone(),
                step.status.to_string(),
                match step.status {
                    StepStatus::Pending => "-".to_string(),
                    _ => step
                        .timestamp
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                        .unwrap_or_else(|| "-".to_string()),
                },
                step.error.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["#", "STEP", "STATUS", "UPDATED", "ERROR"], rows);
}
