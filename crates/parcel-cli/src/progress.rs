//! Progress reporting for CLI operations.

use indicatif::{ProgressBar, ProgressStyle};
use parcel_pm::{DistributionEvent, EventListener};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::output::Output;

/// Renders distributor events as a spinner or an operation bar
pub struct ProgressReporter {
    output: Output,
    enabled: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new(output: Output, enabled: bool) -> Self {
        Self {
            output,
            enabled,
            bar: Mutex::new(None),
        }
    }

    /// Create a spinner for indeterminate operations
    fn create_spinner(&self, message: String) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Create an operation bar counting processed dependencies
    fn create_operation_bar(&self, total: u64) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    fn slot(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Print a line above the active bar
    fn line(&self, message: String) {
        match self.slot().as_ref() {
            Some(bar) if self.enabled && !bar.is_hidden() => bar.println(message),
            _ => self.output.writeln(&message),
        }
    }

    /// Remove whatever bar is still on screen, e.g. after a failure
    pub fn clear(&self) {
        if let Some(bar) = self.slot().take() {
            bar.finish_and_clear();
        }
    }
}

impl EventListener for ProgressReporter {
    fn handle(&self, event: &DistributionEvent<'_>) {
        match event {
            DistributionEvent::CreateStarted { manifest } => {
                let spinner =
                    self.create_spinner(format!("Building {}@{}", manifest.name, manifest.version));
                *self.slot() = Some(spinner);
            }
            DistributionEvent::ArchiveBuilt { handle, path } => {
                self.output.verbose(&format!("Wrote {}", path.display()));
                if let Some(bar) = self.slot().as_ref() {
                    bar.set_message(format!("Uploading {}", handle));
                }
            }
            DistributionEvent::Uploaded { .. } => self.clear(),
            DistributionEvent::UpdateStarted { total, .. } => {
                *self.slot() = Some(self.create_operation_bar(*total as u64));
            }
            DistributionEvent::Fetching { dependency, .. } => {
                if let Some(bar) = self.slot().as_ref() {
                    bar.set_message(format!("Fetching {}", dependency));
                }
            }
            DistributionEvent::Fetched { dependency, bytes, .. } => {
                if let Some(bar) = self.slot().as_ref() {
                    bar.set_message(format!("Extracting {} ({})", dependency, format_bytes(*bytes)));
                }
            }
            DistributionEvent::Extracted { dependency, entries, .. } => {
                self.line(format!("  - Installed {} ({} entries)", dependency, entries));
                if let Some(bar) = self.slot().as_ref() {
                    bar.inc(1);
                }
            }
            DistributionEvent::UpdateFinished { .. } => self.clear(),
        }
    }
}

/// Helper to format bytes for display
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
