use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tempfile::tempdir;

use hoard_core::{
    Error, ExtensionFilter, PipelineSettings, ProgressReporter, ScanConfig, ScanPipeline,
    ScanState, SilentReporter,
};

const MB: u64 = 1024 * 1024;

/// Creates a sparse file of `size` bytes.
fn sparse_file(path: &Path, size: u64) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    File::create(path).unwrap().set_len(size).unwrap();
}

fn pipeline() -> ScanPipeline {
    ScanPipeline::new(PipelineSettings::default(), Arc::new(SilentReporter))
}

fn fast_settings() -> PipelineSettings {
    PipelineSettings {
        drain_interval_ms: 5,
        ..PipelineSettings::default()
    }
}

fn run(pipeline: &mut ScanPipeline, config: ScanConfig) -> ScanState {
    pipeline.start(config).unwrap();
    pipeline.run_until_done(|_, _| {})
}

fn result_paths(pipeline: &ScanPipeline) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = pipeline
        .results()
        .records()
        .iter()
        .map(|r| r.path().to_path_buf())
        .collect();
    paths.sort();
    paths
}

#[test]
fn test_min_size_keeps_only_large_files() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    sparse_file(&root.join("a/small.bin"), 10 * MB);
    sparse_file(&root.join("a/b/medium.bin"), 60 * MB);
    sparse_file(&root.join("a/b/c/large.bin"), 200 * MB);

    let mut config = ScanConfig::new(root);
    config.min_size_bytes = 50 * MB;

    let mut p = ScanPipeline::new(fast_settings(), Arc::new(SilentReporter));
    assert_eq!(run(&mut p, config), ScanState::Completed);

    let mut sizes: Vec<u64> = p.results().records().iter().map(|r| r.size_bytes()).collect();
    sizes.sort();
    assert_eq!(sizes, vec![60 * MB, 200 * MB]);
    assert!(p
        .results()
        .records()
        .iter()
        .all(|r| r.size_bytes() >= 50 * MB));
}

#[test]
fn test_extension_filter_is_case_insensitive() {
    let tmp = tempdir().unwrap();
    sparse_file(&tmp.path().join("clip.MKV"), MB);
    sparse_file(&tmp.path().join("movie.mp4"), MB);
    sparse_file(&tmp.path().join("notes.txt"), MB);

    let mut config = ScanConfig::new(tmp.path());
    config.extensions = ExtensionFilter::from_list(["mkv", ".MP4"]);

    let mut p = ScanPipeline::new(fast_settings(), Arc::new(SilentReporter));
    assert_eq!(run(&mut p, config), ScanState::Completed);

    let names: Vec<String> = result_paths(&p)
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["clip.MKV", "movie.mp4"]);
}

#[test]
fn test_excluded_dir_names_hold_across_repeated_scans() {
    let tmp = tempdir().unwrap();
    sparse_file(&tmp.path().join("web/node_modules/big/dep.bin"), MB);
    sparse_file(&tmp.path().join("web/node_modules/nested/node_modules/x.bin"), MB);
    sparse_file(&tmp.path().join("web/dist/bundle.bin"), MB);

    let mut config = ScanConfig::new(tmp.path());
    config.excluded_dir_names.insert("node_modules".to_string());

    let mut p = ScanPipeline::new(fast_settings(), Arc::new(SilentReporter));
    for _ in 0..2 {
        assert_eq!(run(&mut p, config.clone()), ScanState::Completed);
        let paths = result_paths(&p);
        assert_eq!(paths.len(), 1);
        assert!(paths.iter().all(|path| !path
            .components()
            .any(|c| c.as_os_str() == "node_modules")));
        assert!(p.reset());
    }
}

#[test]
fn test_results_have_unique_paths_across_many_drains() {
    let tmp = tempdir().unwrap();
    for i in 0..50 {
        sparse_file(&tmp.path().join(format!("d{}/f{}.bin", i % 7, i)), 1024);
    }

    let settings = PipelineSettings {
        drain_batch: 3,
        drain_interval_ms: 1,
        lossless: true,
        ..PipelineSettings::default()
    };
    let mut p = ScanPipeline::new(settings, Arc::new(SilentReporter));
    let mut polls = 0;
    p.start(ScanConfig::new(tmp.path())).unwrap();
    let state = p.run_until_done(|_, report| {
        assert!(report.received <= 3);
        polls += 1;
    });

    assert_eq!(state, ScanState::Completed);
    assert!(polls > 1);
    let paths = result_paths(&p);
    let mut unique = paths.clone();
    unique.dedup();
    assert_eq!(paths.len(), 50);
    assert_eq!(unique.len(), paths.len());
}

#[test]
fn test_created_range_filters_records() {
    let tmp = tempdir().unwrap();
    sparse_file(&tmp.path().join("fresh.bin"), MB);

    let mut config = ScanConfig::new(tmp.path());
    config.created_after = Some(Utc::now() + ChronoDuration::days(1));
    let mut p = ScanPipeline::new(fast_settings(), Arc::new(SilentReporter));
    assert_eq!(run(&mut p, config), ScanState::Completed);
    assert!(p.results().is_empty());
    p.reset();

    let mut config = ScanConfig::new(tmp.path());
    config.created_after = Some(Utc::now() - ChronoDuration::days(1));
    config.created_before = Some(Utc::now() + ChronoDuration::days(1));
    assert_eq!(run(&mut p, config), ScanState::Completed);
    assert_eq!(p.results().len(), 1);
}

#[test]
fn test_invalid_root_keeps_pipeline_idle() {
    let tmp = tempdir().unwrap();
    let mut p = pipeline();

    let err = p.start(ScanConfig::new(tmp.path().join("missing"))).unwrap_err();
    assert!(matches!(err, Error::InvalidRoot(_)));
    assert_eq!(p.state(), &ScanState::Idle);

    // The pipeline is still usable afterwards.
    sparse_file(&tmp.path().join("ok.bin"), 10);
    assert_eq!(run(&mut p, ScanConfig::new(tmp.path())), ScanState::Completed);
}

#[test]
fn test_start_is_rejected_unless_idle() {
    let tmp = tempdir().unwrap();
    sparse_file(&tmp.path().join("a.bin"), 10);

    let mut p = pipeline();
    p.start(ScanConfig::new(tmp.path())).unwrap();
    let err = p.start(ScanConfig::new(tmp.path())).unwrap_err();
    assert!(matches!(err, Error::ScanNotIdle("running")));

    assert!(!p.reset());
    let state = p.run_until_done(|_, _| {});
    assert_eq!(state, ScanState::Completed);

    let err = p.start(ScanConfig::new(tmp.path())).unwrap_err();
    assert!(matches!(err, Error::ScanNotIdle("completed")));
    assert!(p.reset());
    assert_eq!(p.state(), &ScanState::Idle);
    p.start(ScanConfig::new(tmp.path())).unwrap();
    p.cancel();
    p.run_until_done(|_, _| {});
}

#[test]
fn test_cancel_reaches_cancelled_and_keeps_drained_records() {
    let tmp = tempdir().unwrap();
    for i in 0..200 {
        sparse_file(&tmp.path().join(format!("dir{}/sub/file{}.bin", i, i)), 10);
    }

    let mut p = ScanPipeline::new(fast_settings(), Arc::new(SilentReporter));
    p.start(ScanConfig::new(tmp.path())).unwrap();
    p.cancel();
    p.cancel();

    let mut polls = 0;
    let state = p.run_until_done(|_, _| polls += 1);
    assert_eq!(state, ScanState::Cancelled);
    assert!(polls < 1000);

    let summary = p.summary().unwrap();
    assert_eq!(p.results().len(), summary.published);
    assert!(p.results().len() <= 200);

    // Cancelling a finished scan changes nothing.
    p.cancel();
    assert_eq!(p.state(), &ScanState::Cancelled);
}

#[test]
fn test_full_channel_drops_records_and_counts_them() {
    let tmp = tempdir().unwrap();
    for i in 0..30 {
        sparse_file(&tmp.path().join(format!("f{}.bin", i)), 10);
    }

    let settings = PipelineSettings {
        channel_capacity: 1,
        drain_interval_ms: 1,
        ..PipelineSettings::default()
    };
    let mut p = ScanPipeline::new(settings, Arc::new(SilentReporter));
    p.start(ScanConfig::new(tmp.path())).unwrap();
    // Give the worker time to overrun the channel before draining.
    thread::sleep(Duration::from_millis(200));
    assert_eq!(p.run_until_done(|_, _| {}), ScanState::Completed);

    let summary = p.summary().unwrap();
    assert_eq!(summary.published, p.results().len());
    assert_eq!(summary.published + summary.dropped, 30);
    assert!(summary.dropped > 0);
}

#[test]
fn test_lossless_mode_keeps_every_record() {
    let tmp = tempdir().unwrap();
    for i in 0..30 {
        sparse_file(&tmp.path().join(format!("f{}.bin", i)), 10);
    }

    let settings = PipelineSettings {
        channel_capacity: 1,
        drain_interval_ms: 1,
        lossless: true,
        ..PipelineSettings::default()
    };
    let mut p = ScanPipeline::new(settings, Arc::new(SilentReporter));
    p.start(ScanConfig::new(tmp.path())).unwrap();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(p.run_until_done(|_, _| {}), ScanState::Completed);

    assert_eq!(p.results().len(), 30);
    assert_eq!(p.summary().unwrap().dropped, 0);
}

#[derive(Default)]
struct RecordingReporter {
    started: Mutex<Vec<PathBuf>>,
    completed: AtomicUsize,
}

impl ProgressReporter for RecordingReporter {
    fn on_scan_start(&self, root: &Path) {
        self.started.lock().unwrap().push(root.to_path_buf());
    }

    fn on_scan_complete(&self, total_files: usize, _duration_secs: f64) {
        self.completed.store(total_files + 1, Ordering::SeqCst);
    }
}

#[test]
fn test_reporter_sees_start_and_completion() {
    let tmp = tempdir().unwrap();
    sparse_file(&tmp.path().join("one.bin"), 10);
    sparse_file(&tmp.path().join("two.bin"), 10);

    let reporter = Arc::new(RecordingReporter::default());
    let mut p = ScanPipeline::new(fast_settings(), reporter.clone());
    assert_eq!(run(&mut p, ScanConfig::new(tmp.path())), ScanState::Completed);

    assert_eq!(reporter.started.lock().unwrap().as_slice(), &[tmp.path().to_path_buf()]);
    assert_eq!(reporter.completed.load(Ordering::SeqCst), 3);
}

struct ExplodingReporter;

impl ProgressReporter for ExplodingReporter {
    fn on_scan_start(&self, _root: &Path) {
        panic!("reporter exploded");
    }
}

#[test]
fn test_worker_panic_becomes_failed_state() {
    let tmp = tempdir().unwrap();
    let mut p = ScanPipeline::new(fast_settings(), Arc::new(ExplodingReporter));
    let state = run(&mut p, ScanConfig::new(tmp.path()));

    assert_eq!(state, ScanState::Failed("reporter exploded".to_string()));
    let failure = p.take_failure().unwrap();
    assert!(matches!(&failure, Error::WorkerFailed(m) if m == "reporter exploded"));
    assert!(p.take_failure().is_none());
    assert!(p.reset());
}
