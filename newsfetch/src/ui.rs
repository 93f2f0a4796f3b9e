//! Terminal display logic for the newsfetch CLI.
//!
//! This module handles text output: colored result lines, grouped
//! `--pretty` output, the spinner shown while a batch runs, headers and
//! summaries. Uses only the `console` crate.

use console::{pad_str, style, Alignment, Term};
use newsfetch_lib::{FetchError, FetchResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::ErrorStats;

const LABEL_WIDTH: usize = 48;
const PREVIEW_CHARS: usize = 160;

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner that writes to stderr so stdout stays clean.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    /// Start a spinner with the given message, or return None if stderr isn't a TTY.
    pub fn start(message: String) -> Option<Self> {
        let term = Term::stderr();
        if !term.is_term() {
            return None;
        }

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = tokio::spawn(async move {
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let _ = term.clear_line();
                let _ = term.write_str(&format!("{} {}", style(frame).cyan(), message));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Some(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Stop the spinner and clear the line.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a pretty run.
pub fn print_header(task_count: usize, workers: usize, interval: Duration, keyword: Option<&str>) {
    println!(
        "{} {} {}",
        style("newsfetch").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "· Fetching {} article{}",
            task_count,
            if task_count == 1 { "" } else { "s" }
        ))
        .dim(),
    );

    let mut meta_parts: Vec<String> = Vec::new();
    if let Some(keyword) = keyword {
        meta_parts.push(format!("Keyword: {}", keyword));
    }
    meta_parts.push(format!("Workers: {}", workers));
    meta_parts.push(format!("Interval: {}ms", interval.as_millis()));

    println!("{}", style(meta_parts.join(" | ")).dim());
    println!();
}

// ── Single result line ───────────────────────────────────────────────────────

/// Print one result as a flat, colored line.
///
/// `show_preview` adds the first part of the fetched content underneath.
pub fn print_result(result: &FetchResult, show_preview: bool, debug: bool) {
    let padded = pad_str(result.task.label(), LABEL_WIDTH, Alignment::Left, Some(".."));

    match &result.error {
        None => {
            println!(
                "  {}  {}  {}",
                style(&padded).white(),
                style("FETCHED").green().bold(),
                style(format!("{} chars", result.content.chars().count())).dim(),
            );
        }
        Some(error) => {
            println!(
                "  {}  {}  {}",
                style(&padded).white(),
                style("FAILED").red().bold(),
                style(brief_error(error)).dim(),
            );
        }
    }

    print_details(result, show_preview, debug, "    ");
}

// ── Grouped output ───────────────────────────────────────────────────────────

/// Print results grouped into Fetched and Failed sections.
/// Empty sections are omitted entirely.
pub fn print_grouped_results(results: &[FetchResult], show_preview: bool, debug: bool) {
    let (fetched, failed): (Vec<&FetchResult>, Vec<&FetchResult>) =
        results.iter().partition(|r| r.is_success());

    if !fetched.is_empty() {
        println!(
            "  {} {}",
            style(format!("── Fetched ({}) ", fetched.len())).green().bold(),
            style("─".repeat(40)).green().dim(),
        );
        for r in &fetched {
            let padded = pad_str(r.task.label(), LABEL_WIDTH, Alignment::Left, Some(".."));
            println!(
                "    {}  {}",
                style(&padded).white(),
                style(&r.domain).dim()
            );
            print_details(r, show_preview, debug, "      ");
        }
        println!();
    }

    if !failed.is_empty() {
        println!(
            "  {} {}",
            style(format!("── Failed ({}) ", failed.len())).red().bold(),
            style("─".repeat(41)).red().dim(),
        );
        for r in &failed {
            let padded = pad_str(r.task.label(), LABEL_WIDTH, Alignment::Left, Some(".."));
            let reason = r.error.as_ref().map(brief_error).unwrap_or_default();
            println!("    {}  {}", style(&padded).white(), style(reason).dim());
            print_details(r, false, debug, "      ");
        }
        println!();
    }
}

fn print_details(result: &FetchResult, show_preview: bool, debug: bool, indent: &str) {
    if show_preview && result.has_content() {
        println!(
            "{}{} {}",
            indent,
            style("│").dim(),
            style(content_preview(&result.content, PREVIEW_CHARS)).dim()
        );
    }

    if debug {
        let timing = result
            .fetch_duration
            .map(|d| format!("in {}ms", d.as_millis()))
            .unwrap_or_else(|| "without a response".to_string());
        println!(
            "{}{} {} via {} {}",
            indent,
            style("└─").dim(),
            result.task.url,
            result.domain,
            timing,
        );
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the final summary bar with colored counts.
pub fn print_summary(total: usize, fetched: usize, failed: usize, duration: Duration) {
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!(
        "  {} article{} in {:.1}s  {}  {}  {}  {}",
        style(total).bold(),
        if total == 1 { "" } else { "s" },
        duration.as_secs_f64(),
        style("|").dim(),
        style(format!("{} fetched", fetched)).green(),
        style("|").dim(),
        style(format!("{} failed", failed)).red(),
    );
}

// ── Error summary ────────────────────────────────────────────────────────────

/// Print a categorized error summary using colors.
pub fn print_error_summary(error_stats: &ErrorStats) {
    if !error_stats.has_errors() {
        return;
    }

    println!();
    println!("  {}", style("Some articles could not be fetched:").yellow());
    for line in error_stats.summary_lines(5) {
        println!("  {} {}", style("•").dim(), line);
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Short parenthesized reason for a failed fetch.
pub fn brief_error(error: &FetchError) -> String {
    match error {
        FetchError::Timeout { .. } => "(timeout)".to_string(),
        FetchError::Status { status, .. } => format!("(HTTP {})", status),
        FetchError::NetworkError { .. } => "(network error)".to_string(),
        FetchError::ParseError { .. } => "(unreadable response)".to_string(),
        FetchError::InvalidUrl { .. } => "(invalid URL)".to_string(),
        _ => "(error)".to_string(),
    }
}

/// Single-line excerpt of page content.
fn content_preview(content: &str, max_chars: usize) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    newsfetch_lib::truncate_content(&flat, max_chars)
}

// ── Tests ────────────────────────────────────────────────────────────────────
