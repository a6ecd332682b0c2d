//! Formatting utilities for durations and build summaries.

use crate::build::BuildReport;
use console::Term;
use owo_colors::OwoColorize;
use std::time::Duration;

/// Format duration in human-readable format.
///
/// ```
/// use std::time::Duration;
/// use siteweave_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Print one line per page plus a totals line to stderr.
pub fn print_build_summary(report: &BuildReport) {
    let width = (Term::stderr().size().1 as usize).min(80);

    eprintln!("\n{}", "Build Summary".bold().underline());
    eprintln!("{}", "─".repeat(width));

    for result in &report.results {
        if result.success {
            eprintln!(
                "  {} {} {}",
                "▸".blue(),
                result.output.bright_white().bold(),
                format!("({})", result.template).dimmed()
            );
        } else {
            eprintln!(
                "  {} {} {}",
                "✗".red(),
                result.output.red().bold(),
                result.error.as_deref().unwrap_or("unknown error").red()
            );
        }
    }

    eprintln!("{}", "─".repeat(width));

    let pages = format!("{}/{} pages", report.succeeded(), report.results.len());
    let pages = if report.is_success() {
        pages.green().to_string()
    } else {
        pages.yellow().to_string()
    };
    eprintln!(
        "  {} {}, {} assets in {}",
        "Total:".bold(),
        pages,
        report.assets_copied,
        format_duration(report.duration).green()
    );
}
