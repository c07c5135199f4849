//! Progress reporting for long-running stages
//!
//! Provides a spinner during scans and styled summaries once a stage
//! completes, using indicatif and console.

use crate::builder::ScanStats;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a scan or repair run is in flight
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Invalid progress template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Print a summary of a completed scan
pub fn print_scan_summary(stats: &ScanStats, store_path: &str) {
    let duration_secs = stats.duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        stats.cataloged as f64 / duration_secs
    } else {
        0.0
    };

    println!();
    println!("{}", style("Scan complete").green().bold());
    println!("  Cataloged:  {}", stats.cataloged);
    if stats.skipped_existing > 0 {
        println!("  Skipped:    {} (already cataloged)", stats.skipped_existing);
    }
    if stats.vanished > 0 {
        println!("  Vanished:   {}", stats.vanished);
    }
    if stats.errors > 0 {
        println!("  Errors:     {} (logged and skipped)", stats.errors);
    }
    println!(
        "  Content:    {}",
        format_size(stats.bytes_fingerprinted, BINARY)
    );
    println!("  Duration:   {:.1}s ({:.0} files/s)", duration_secs, rate);
    println!("  Store:      {}", store_path);
}
