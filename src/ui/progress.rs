//! Progress reporting

use indicatif::{HumanBytes, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;
use std::time::{Duration, Instant};

/// Progress reporter for a backup run
pub struct ProgressReporter {
    scan_bar: ProgressBar,
    copy_bar: ProgressBar,
    copy_started_at: Option<Instant>,
    copied_bytes: u64,
}

impl ProgressReporter {
    /// Create a reporter drawing to stderr
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// Create a reporter that draws nothing
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let scan_bar = ProgressBar::with_draw_target(None, target);
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            scan_bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }
        if !scan_bar.is_hidden() {
            scan_bar.enable_steady_tick(Duration::from_millis(120));
        }

        let copy_bar = ProgressBar::hidden();
        if let Ok(style) =
            ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} files | {msg}")
        {
            copy_bar.set_style(style.progress_chars("=>-"));
        }

        Self {
            scan_bar,
            copy_bar,
            copy_started_at: None,
            copied_bytes: 0,
        }
    }

    /// Mark start of a scanning phase.
    pub fn start_scan(&self, label: &str) {
        self.scan_bar.set_message(format!("Scanning {}...", label));
    }

    /// Update scanning progress counters.
    pub fn update_scan(&self, label: &str, files: u64, bytes: u64) {
        self.scan_bar.set_message(format!(
            "Scanning {}... {} files | {}",
            label,
            files,
            HumanBytes(bytes)
        ));
    }

    /// Report the end of one scan; the spinner keeps running for the next.
    pub fn finish_scan(&self, label: &str, files: usize, bytes: u64) {
        self.scan_bar.println(format!(
            "Scanned {}: {} files | {}",
            label,
            files,
            HumanBytes(bytes)
        ));
    }

    /// Stop the scanning spinner
    pub fn end_scanning(&self) {
        self.scan_bar.finish_and_clear();
    }

    /// Initialize the copy phase.
    pub fn start_copy(&mut self, total_files: u64) {
        if !self.scan_bar.is_hidden() {
            self.copy_bar.set_draw_target(ProgressDrawTarget::stderr());
        }
        self.copy_started_at = Some(Instant::now());
        self.copied_bytes = 0;
        self.copy_bar.set_length(total_files);
        self.copy_bar.set_position(0);
        self.copy_bar.set_message("Starting copy...".to_string());
    }

    /// Update current file indicator.
    pub fn set_current_file(&self, path: &Path) {
        self.copy_bar
            .set_message(format!("Copy {}", path.display()));
    }

    /// Mark one file complete and refresh the throughput display.
    pub fn complete_file(&mut self, bytes: u64) {
        self.copied_bytes = self.copied_bytes.saturating_add(bytes);
        self.copy_bar.inc(1);

        let throughput = self.current_throughput_bps();
        self.copy_bar.set_message(format!(
            "{} copied | {}/s",
            HumanBytes(self.copied_bytes),
            HumanBytes(throughput)
        ));
    }

    /// Surface a failed copy; it still counts toward the bar.
    pub fn copy_error(&self, path: &Path, err: &str) {
        self.copy_bar.inc(1);
        self.copy_bar
            .println(format!("ERROR copy {}: {}", path.display(), err));
    }

    /// Finalize the copy phase.
    pub fn finish_copy(&self, succeeded: usize, failed: usize, bytes: u64) {
        let throughput = self.current_throughput_bps();
        self.copy_bar.finish_with_message(format!(
            "Copy complete: {} succeeded, {} failed | {} total | {}/s",
            succeeded,
            failed,
            HumanBytes(bytes),
            HumanBytes(throughput)
        ));
    }

    fn current_throughput_bps(&self) -> u64 {
        match self.copy_started_at {
            Some(started) => {
                let secs = started.elapsed().as_secs_f64();
                if secs > 0.0 {
                    (self.copied_bytes as f64 / secs) as u64
                } else {
                    0
                }
            }
            None => 0,
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
