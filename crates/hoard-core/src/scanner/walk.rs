use std::collections::HashSet;
use std::fs::{self, DirEntry, ReadDir};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::matcher::PathMatcher;
use crate::cancel::CancelToken;
use crate::config::ScanConfig;
use crate::platform;

/// Minimum time between two progress callbacks.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Counters describing what a walk touched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    pub dirs_listed: usize,
    pub dirs_failed: usize,
    pub entries_skipped: usize,
    pub files_yielded: usize,
}

type ProgressFn<'a> = Box<dyn FnMut(&Path) + 'a>;

/// Iterative, single-threaded traversal yielding regular-file paths.
///
/// Directories are kept on an explicit stack, so tree depth is bounded by
/// memory rather than by the call stack. Listing and per-entry failures are
/// logged and skipped. The walk is single-pass: once exhausted or cancelled
/// it yields nothing more.
pub struct TreeWalker<'a> {
    config: &'a ScanConfig,
    matcher: PathMatcher,
    cancel: CancelToken,
    stack: Vec<PathBuf>,
    current: Option<ReadDir>,
    root_dev: Option<u64>,
    visited: HashSet<PathBuf>,
    on_progress: Option<ProgressFn<'a>>,
    last_progress: Option<Instant>,
    stats: WalkStats,
}

impl<'a> TreeWalker<'a> {
    pub fn new(config: &'a ScanConfig, cancel: CancelToken) -> Self {
        let root = config.root.clone();

        let root_dev = if config.same_filesystem_only {
            fs::metadata(&root)
                .ok()
                .and_then(|m| platform::device_id(&m))
        } else {
            None
        };

        let mut visited = HashSet::new();
        if config.follow_symlinks {
            if let Ok(canonical) = fs::canonicalize(&root) {
                visited.insert(canonical);
            }
        }

        Self {
            config,
            matcher: PathMatcher::new(&config.excluded_path_fragments),
            cancel,
            stack: vec![root],
            current: None,
            root_dev,
            visited,
            on_progress: None,
            last_progress: None,
            stats: WalkStats::default(),
        }
    }

    /// Called with the directory about to be listed, at most once per
    /// [`PROGRESS_INTERVAL`].
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&Path) + 'a,
    {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    fn report_progress(&mut self, dir: &Path) {
        let Some(callback) = self.on_progress.as_mut() else {
            return;
        };
        let due = self
            .last_progress
            .map_or(true, |last| last.elapsed() >= PROGRESS_INTERVAL);
        if due {
            self.last_progress = Some(Instant::now());
            callback(dir);
        }
    }

    fn open_dir(&mut self, dir: &Path) {
        match fs::read_dir(dir) {
            Ok(entries) => {
                self.stats.dirs_listed += 1;
                self.current = Some(entries);
            }
            Err(err) => {
                self.stats.dirs_failed += 1;
                debug!("Skipping unreadable directory {}: {}", dir.display(), err);
            }
        }
    }

    /// Applies the entry filters; returns the path when it is a file to yield.
    /// Directories that pass are pushed onto the stack.
    fn visit_entry(&mut self, entry: &DirEntry) -> Option<PathBuf> {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if self.config.skip_hidden && name.starts_with('.') {
            return self.skip();
        }

        let path = entry.path();
        if self.matcher.is_excluded(&path) {
            return self.skip();
        }

        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                trace!("Cannot read type of {}: {}", path.display(), err);
                return self.skip();
            }
        };

        let (is_dir, is_file) = if file_type.is_symlink() {
            if !self.config.follow_symlinks {
                return self.skip();
            }
            match fs::metadata(&path) {
                Ok(target) => (target.is_dir(), target.is_file()),
                Err(err) => {
                    trace!("Dangling symlink {}: {}", path.display(), err);
                    return self.skip();
                }
            }
        } else {
            (file_type.is_dir(), file_type.is_file())
        };

        if is_dir {
            if self.config.excluded_dir_names.contains(&*name) {
                return self.skip();
            }
            if let Some(root_dev) = self.root_dev {
                match fs::symlink_metadata(&path) {
                    Ok(m) if platform::device_id(&m) == Some(root_dev) => {}
                    Ok(_) => {
                        debug!("Not crossing filesystem boundary at {}", path.display());
                        return self.skip();
                    }
                    Err(_) => return self.skip(),
                }
            }
            if self.config.follow_symlinks {
                match fs::canonicalize(&path) {
                    Ok(canonical) => {
                        if !self.visited.insert(canonical) {
                            debug!("Already visited {}, not descending again", path.display());
                            return self.skip();
                        }
                    }
                    Err(_) => return self.skip(),
                }
            }
            self.stack.push(path);
            None
        } else if is_file {
            self.stats.files_yielded += 1;
            Some(path)
        } else {
            self.skip()
        }
    }

    fn skip(&mut self) -> Option<PathBuf> {
        self.stats.entries_skipped += 1;
        None
    }

    fn stop(&mut self) {
        self.current = None;
        self.stack.clear();
    }
}

impl Iterator for TreeWalker<'_> {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            if self.cancel.is_cancelled() {
                self.stop();
                return None;
            }

            if self.current.is_some() {
                let next = self.current.as_mut().and_then(|entries| entries.next());
                match next {
                    Some(Ok(entry)) => {
                        if let Some(path) = self.visit_entry(&entry) {
                            return Some(path);
                        }
                    }
                    Some(Err(err)) => {
                        debug!("Abandoning directory listing: {}", err);
                        self.current = None;
                    }
                    None => self.current = None,
                }
                continue;
            }

            let dir = self.stack.pop()?;
            if self.matcher.is_excluded(&dir) {
                continue;
            }
            self.report_progress(&dir);
            self.open_dir(&dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"data").unwrap();
    }

    fn walk_names(config: &ScanConfig) -> Vec<String> {
        let mut names: Vec<String> = TreeWalker::new(config, CancelToken::new())
            .map(|p| {
                p.strip_prefix(&config.root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_yields_files_at_every_depth() {
        let tmp = tempdir().unwrap();
        touch(&tmp.path().join("a.txt"));
        touch(&tmp.path().join("one/b.txt"));
        touch(&tmp.path().join("one/two/c.txt"));
        fs::create_dir_all(tmp.path().join("empty")).unwrap();

        let config = ScanConfig::new(tmp.path());
        assert_eq!(
            walk_names(&config),
            vec!["a.txt", "one/b.txt", "one/two/c.txt"]
        );
    }

    #[test]
    fn test_hidden_entries_are_skipped_unless_requested() {
        let tmp = tempdir().unwrap();
        touch(&tmp.path().join(".secret"));
        touch(&tmp.path().join(".cache/blob.bin"));
        touch(&tmp.path().join("visible.txt"));

        let mut config = ScanConfig::new(tmp.path());
        assert_eq!(walk_names(&config), vec!["visible.txt"]);

        config.skip_hidden = false;
        assert_eq!(
            walk_names(&config),
            vec![".cache/blob.bin", ".secret", "visible.txt"]
        );
    }

    #[test]
    fn test_excluded_dir_names_are_not_entered() {
        let tmp = tempdir().unwrap();
        touch(&tmp.path().join("app/node_modules/pkg/index.js"));
        touch(&tmp.path().join("app/src/main.js"));

        let mut config = ScanConfig::new(tmp.path());
        config.excluded_dir_names.insert("node_modules".to_string());
        assert_eq!(walk_names(&config), vec!["app/src/main.js"]);
    }

    #[test]
    fn test_path_fragments_exclude_files_and_directories() {
        let tmp = tempdir().unwrap();
        touch(&tmp.path().join("keep/a.bin"));
        touch(&tmp.path().join("OneDriveCloudTemp/b.bin"));
        touch(&tmp.path().join("keep/skipme.bin"));
        let absolute = tmp.path().join("abs");
        touch(&absolute.join("c.bin"));

        let mut config = ScanConfig::new(tmp.path());
        config.excluded_path_fragments = vec![
            "OneDriveCloudTemp".to_string(),
            "skipme".to_string(),
            absolute.to_string_lossy().into_owned(),
        ];
        assert_eq!(walk_names(&config), vec!["keep/a.bin"]);
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let tmp = tempdir().unwrap();
        let config = ScanConfig::new(tmp.path().join("does-not-exist"));
        let mut walker = TreeWalker::new(&config, CancelToken::new());
        assert!(walker.next().is_none());
        assert_eq!(walker.stats().dirs_failed, 1);
    }

    #[test]
    fn test_deep_tree_does_not_recurse() {
        let tmp = tempdir().unwrap();
        let mut deep = tmp.path().to_path_buf();
        for i in 0..200 {
            deep.push(format!("d{}", i % 10));
        }
        touch(&deep.join("bottom.txt"));

        let config = ScanConfig::new(tmp.path());
        let found: Vec<PathBuf> = TreeWalker::new(&config, CancelToken::new()).collect();
        assert_eq!(found, vec![deep.join("bottom.txt")]);
    }

    #[test]
    fn test_cancel_before_start_lists_nothing() {
        let tmp = tempdir().unwrap();
        touch(&tmp.path().join("a.txt"));

        let config = ScanConfig::new(tmp.path());
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut walker = TreeWalker::new(&config, cancel);
        assert!(walker.next().is_none());
        assert_eq!(walker.stats().dirs_listed, 0);
    }

    #[test]
    fn test_cancel_mid_walk_stops_listing() {
        let tmp = tempdir().unwrap();
        for i in 0..20 {
            touch(&tmp.path().join(format!("dir{}/file.txt", i)));
        }

        let config = ScanConfig::new(tmp.path());
        let cancel = CancelToken::new();
        let mut walker = TreeWalker::new(&config, cancel.clone());
        assert!(walker.next().is_some());
        let listed = walker.stats().dirs_listed;

        cancel.cancel();
        assert!(walker.next().is_none());
        assert!(walker.next().is_none());
        assert_eq!(walker.stats().dirs_listed, listed);
    }

    #[test]
    fn test_progress_reports_first_directory() {
        let tmp = tempdir().unwrap();
        touch(&tmp.path().join("x/y.txt"));

        let config = ScanConfig::new(tmp.path());
        let seen = RefCell::new(Vec::new());
        let walker = TreeWalker::new(&config, CancelToken::new())
            .with_progress(|dir| seen.borrow_mut().push(dir.to_path_buf()));
        assert_eq!(walker.count(), 1);
        let seen = seen.into_inner();
        assert!(!seen.is_empty());
        assert_eq!(seen[0], tmp.path());
    }

    #[test]
    fn test_progress_is_rate_limited() {
        let tmp = tempdir().unwrap();
        for i in 0..60 {
            touch(&tmp.path().join(format!("d{}/f.txt", i)));
        }

        let config = ScanConfig::new(tmp.path());
        let calls = RefCell::new(0u32);
        let started = Instant::now();
        let mut walker = TreeWalker::new(&config, CancelToken::new())
            .with_progress(|_| *calls.borrow_mut() += 1);
        assert_eq!(walker.by_ref().count(), 60);
        let elapsed = started.elapsed();
        let listed = walker.stats().dirs_listed;
        drop(walker);

        let calls = calls.into_inner();
        let allowed = (elapsed.as_millis() / PROGRESS_INTERVAL.as_millis()) as u32 + 1;
        assert_eq!(listed, 61);
        assert!(calls >= 1);
        assert!(calls <= allowed, "{} callbacks in {:?}", calls, elapsed);
        assert!((calls as usize) < listed);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_same_filesystem_skips_other_mounts() {
        let dev = Path::new("/dev");
        let shm = Path::new("/dev/shm");
        let (Ok(dev_meta), Ok(shm_meta)) = (fs::metadata(dev), fs::metadata(shm)) else {
            return;
        };
        if platform::device_id(&dev_meta) == platform::device_id(&shm_meta) {
            return;
        }
        let Ok(mounted) = tempfile::Builder::new().prefix("hoard-").tempdir_in(shm) else {
            return;
        };
        let marker = mounted.path().join("marker.bin");
        touch(&marker);

        let mut config = ScanConfig::new(dev);
        assert!(TreeWalker::new(&config, CancelToken::new()).all(|p| p != marker));

        config.same_filesystem_only = false;
        assert!(TreeWalker::new(&config, CancelToken::new()).any(|p| p == marker));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_follow_policy() {
        use std::os::unix::fs::symlink;

        let tmp = tempdir().unwrap();
        let target = tmp.path().join("real");
        touch(&target.join("inner.txt"));
        touch(&tmp.path().join("file.txt"));
        symlink(&target, tmp.path().join("linkdir")).unwrap();
        symlink(tmp.path().join("file.txt"), tmp.path().join("linkfile")).unwrap();

        let mut config = ScanConfig::new(tmp.path());
        assert_eq!(walk_names(&config), vec!["file.txt", "real/inner.txt"]);

        config.follow_symlinks = true;
        let names = walk_names(&config);
        assert!(names.contains(&"linkfile".to_string()));
        assert!(names.contains(&"file.txt".to_string()));
        // "real" and "linkdir" resolve to the same directory; only one is entered.
        let inner = names.iter().filter(|n| n.ends_with("inner.txt")).count();
        assert_eq!(inner, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_terminates() {
        use std::os::unix::fs::symlink;

        let tmp = tempdir().unwrap();
        touch(&tmp.path().join("a/file.txt"));
        symlink(tmp.path(), tmp.path().join("a/loop")).unwrap();

        let mut config = ScanConfig::new(tmp.path());
        config.follow_symlinks = true;
        assert_eq!(walk_names(&config), vec!["a/file.txt"]);
    }
}
