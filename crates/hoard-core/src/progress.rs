use std::path::Path;

/// Trait for reporting scan and deletion progress.
///
/// CLI implements with indicatif. Calls arrive from the scan worker thread,
/// so implementations must be `Send + Sync`. All methods have default no-op
/// implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self, _root: &Path) {}
    fn on_scan_progress(&self, _files_found: usize, _current_dir: &Path) {}
    fn on_scan_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_delete_start(&self, _candidates: usize) {}
    fn on_delete_progress(&self, _done: usize, _total: usize) {}
    fn on_delete_complete(&self, _succeeded: usize, _failed: usize) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
