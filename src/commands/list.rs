//! List all pending and completed watches

use anyhow::Result;
use colored::{ColoredString, Colorize};

use super::common::{column_widths, format_timestamp};
use crate::models::Phase;
use crate::registry::Registry;

pub fn execute(registry: &Registry) -> Result<()> {
    let mut watches = registry.watches()?;
    if watches.is_empty() {
        eprintln!("There are no processes monitored");
        return Ok(());
    }

    // Enumeration order is whatever the directory scan produced
    watches.sort_by_key(|watch| watch.watcher_pid);

    let titles = ["PID", "Name", "Started", "Ended", "Status"];
    let rows: Vec<Vec<String>> = watches
        .iter()
        .map(|watch| {
            vec![
                watch.record.target_pid.to_string(),
                watch.record.name.clone(),
                format_timestamp(watch.record.started_at),
                format_timestamp(watch.record.finished_at),
                watch.effective_phase().to_string(),
            ]
        })
        .collect();

    // Hand-rolled rendering instead of common::render_table: the status
    // cell is colourised after padding so ANSI codes do not skew widths.
    let widths = column_widths(&titles, &rows);
    let header: Vec<String> = titles
        .iter()
        .enumerate()
        .map(|(col, title)| format!("{title:<width$}", width = widths[col]))
        .collect();
    println!("{}", header.join(" | "));
    let separator: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    println!("{}", separator.join("-+-"));

    for (watch, row) in watches.iter().zip(&rows) {
        let mut cells: Vec<String> = row
            .iter()
            .take(4)
            .enumerate()
            .map(|(col, cell)| format!("{cell:<width$}", width = widths[col]))
            .collect();
        cells.push(colour_phase(watch.effective_phase()).to_string());
        println!("{}", cells.join(" | "));
    }

    Ok(())
}

fn colour_phase(phase: Phase) -> ColoredString {
    let label = phase.to_string();
    match phase {
        Phase::Notified => label.as_str().green(),
        Phase::Failed => label.as_str().red(),
        Phase::Monitoring => label.as_str().cyan(),
        Phase::Notifying => label.as_str().yellow(),
        Phase::NotStarted => label.as_str().normal(),
    }
}
