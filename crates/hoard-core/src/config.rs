use chrono::{DateTime, Utc};
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings loaded from `Hoard.toml` and `HOARD_*` environment variables.
///
/// Values here are still "user input": sizes are megabytes, dates are absent,
/// extension lists may lack their leading dot. The CLI turns them into a
/// validated [`ScanConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Empty means the whole machine.
    pub root: String,
    pub extensions: Vec<String>,
    pub min_size_mb: f64,
    pub top_n: usize,
    pub skip_hidden: bool,
    pub follow_symlinks: bool,
    pub same_filesystem_only: bool,
    pub excluded_dir_names: Vec<String>,
    pub excluded_paths: Vec<String>,
    pub clean_threshold_mb: f64,
    pub pipeline: PipelineSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root: String::new(),
            extensions: [".mov", ".mp4", ".mkv", ".zip", ".dmg", ".pkg"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_size_mb: 50.0,
            top_n: 200,
            skip_hidden: true,
            follow_symlinks: false,
            same_filesystem_only: true,
            excluded_dir_names: Vec::new(),
            excluded_paths: vec![
                "~/Library/CloudStorage".to_string(),
                "~/Library/Mobile Documents".to_string(),
                "/Volumes".to_string(),
                "OneDriveCloudTemp".to_string(),
            ],
            clean_threshold_mb: 100.0,
            pipeline: PipelineSettings::default(),
        }
    }
}

/// Tuning for the worker → consumer hand-off.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub channel_capacity: usize,
    pub drain_batch: usize,
    pub drain_interval_ms: u64,
    /// Use an unbounded channel instead of dropping records when it is full.
    pub lossless: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 5000,
            drain_batch: 200,
            drain_interval_ms: 60,
            lossless: false,
        }
    }
}

impl PipelineSettings {
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Hoard").required(false))
        .add_source(
            Environment::with_prefix("HOARD")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("extensions")
                .with_list_parse_key("excluded_dir_names")
                .with_list_parse_key("excluded_paths"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Which file extensions a scan accepts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExtensionFilter {
    #[default]
    Any,
    /// Lowercase extensions including the leading dot, e.g. `.mkv`.
    Only(BTreeSet<String>),
}

impl ExtensionFilter {
    /// Builds a filter from raw entries. An empty list accepts everything.
    pub fn from_list<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = entries
            .into_iter()
            .filter_map(|e| normalize_extension(e.as_ref()))
            .collect();
        if set.is_empty() {
            ExtensionFilter::Any
        } else {
            ExtensionFilter::Only(set)
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        match self {
            ExtensionFilter::Any => true,
            ExtensionFilter::Only(set) => path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
                .is_some_and(|ext| set.contains(&ext)),
        }
    }
}

fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim().to_lowercase();
    if trimmed.is_empty() || trimmed == "." {
        return None;
    }
    if trimmed.starts_with('.') {
        Some(trimmed)
    } else {
        Some(format!(".{}", trimmed))
    }
}

/// Validated, immutable parameters of a single scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub root: PathBuf,
    pub extensions: ExtensionFilter,
    pub min_size_bytes: u64,
    pub follow_symlinks: bool,
    pub skip_hidden: bool,
    pub excluded_dir_names: BTreeSet<String>,
    pub same_filesystem_only: bool,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub excluded_path_fragments: Vec<String>,
}

impl ScanConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: ExtensionFilter::Any,
            min_size_bytes: 0,
            follow_symlinks: false,
            skip_hidden: true,
            excluded_dir_names: BTreeSet::new(),
            same_filesystem_only: true,
            created_after: None,
            created_before: None,
            excluded_path_fragments: Vec::new(),
        }
    }

    /// Canonical form of the filters: lowercase dotted extensions, trimmed
    /// non-empty exclusion fragments and directory names.
    pub fn normalized(mut self) -> Self {
        if let ExtensionFilter::Only(set) = &self.extensions {
            self.extensions = ExtensionFilter::from_list(set.iter());
        }
        self.excluded_path_fragments = self
            .excluded_path_fragments
            .iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        self.excluded_dir_names = self
            .excluded_dir_names
            .iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();
        self
    }

    pub fn in_created_range(&self, created_at: &DateTime<Utc>) -> bool {
        if let Some(after) = &self.created_after {
            if created_at < after {
                return false;
            }
        }
        if let Some(before) = &self.created_before {
            if created_at > before {
                return false;
            }
        }
        true
    }
}
