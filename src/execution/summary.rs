//! End of run summary

use crate::console::{Color, ConsoleSink, Message, Style};
use crate::core::{RunReport, StepResult};
use std::time::Duration;

/// Print the per-step table, total time and the final status line
pub fn print(console: &dyn ConsoleSink, report: &RunReport) {
    console.write(&render(report, separator_width()));
}

/// Summary lines for `report`
pub fn render(report: &RunReport, width: usize) -> Vec<Message> {
    let name_width = report
        .results
        .iter()
        .map(|result| result.step().name.chars().count())
        .max()
        .unwrap_or(0);

    let mut lines = vec![
        Message::info("─".repeat(width)),
        Message::info("Summary: ").styled(report.pipeline_name.clone(), Style::new().bold()),
    ];

    for result in &report.results {
        let name = format!("  {:<width$}  ", result.step().name, width = name_width);
        let line = match result {
            StepResult::Success(_, stat) => Message::info(name)
                .colored("Succeeded", Color::Green)
                .text(format!("  {}", format_duration(stat.execution_time))),
            StepResult::Failed(_, stat, _) => Message::info(name)
                .colored("Failed   ", Color::Red)
                .text(format!("  {}", format_duration(stat.execution_time))),
            StepResult::Skipped(_) => {
                Message::info(name).styled("Skipped", Style::new().dim())
            }
        };
        lines.push(line);
    }

    lines.push(Message::info(format!(
        "Total time: {}",
        format_duration(report.total_time())
    )));
    lines.push(status_line(report));
    lines
}

fn status_line(report: &RunReport) -> Message {
    if report.is_success() {
        Message::info("").styled(
            format!("Pipeline {} succeeded", report.pipeline_name),
            Style::new().green().bold(),
        )
    } else {
        Message::error("").styled(
            format!("Pipeline {} failed", report.pipeline_name),
            Style::new().red().bold(),
        )
    }
}

fn separator_width() -> usize {
    term_size::dimensions_stdout()
        .map(|(w, _)| w)
        .unwrap_or(80)
        .min(120)
}

/// Human readable duration
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
