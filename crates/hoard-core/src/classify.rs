//! Path-based risk classification.
//!
//! This is a best-effort heuristic built from fixed tables, not a guarantee
//! that deleting a `Safe` file is harmless. Checks run in a fixed order and
//! the first match wins:
//!
//! 1. `System` when the path is (under) a system root prefix.
//! 2. `Safe` when the path lies inside a package-manager cache or build
//!    output directory, or has a compiler intermediate extension.
//! 3. `Caution` otherwise, with a reason describing why.
//!
//! Reordering these checks changes outcomes.

use lazy_static::lazy_static;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use crate::scanner::absolute_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    Safe,
    Caution,
    System,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Safe, Tier::Caution, Tier::System];

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Safe => "Safe",
            Tier::Caution => "Caution",
            Tier::System => "System",
        }
    }

    pub fn dot(&self) -> &'static str {
        "●"
    }

    /// Position when sorting by risk, least risky first.
    pub fn rank(&self) -> u8 {
        match self {
            Tier::Safe => 0,
            Tier::Caution => 1,
            Tier::System => 2,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "safe" => Ok(Tier::Safe),
            "caution" => Ok(Tier::Caution),
            "system" => Ok(Tier::System),
            other => Err(format!(
                "unknown tier '{}' (expected safe, caution or system)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub tier: Tier,
    pub reason: String,
}

impl Classification {
    fn new(tier: Tier, reason: impl Into<String>) -> Self {
        Self {
            tier,
            reason: reason.into(),
        }
    }
}

#[cfg(not(windows))]
const SYSTEM_ROOT_PREFIXES: &[&str] = &[
    "/System",
    "/Library",
    "/usr",
    "/bin",
    "/sbin",
    "/private",
    "/opt",
    "/Applications",
];

#[cfg(windows)]
const SYSTEM_ROOT_PREFIXES: &[&str] = &[
    "C:\\Windows",
    "C:\\Program Files",
    "C:\\Program Files (x86)",
    "C:\\ProgramData",
];

/// Cache directories, matched as consecutive directory names anywhere in the
/// path so that they apply to every user's home.
const CACHE_DIRS: &[&str] = &[
    ".npm",
    ".cache/yarn",
    ".cache/pnpm",
    ".cargo/registry",
    ".cargo/git",
    "Library/Developer/Xcode/DerivedData",
    "Library/Developer/CoreSimulator",
    "Library/Caches",
];

/// Compiler output directories.
const BUILD_DIRS: &[&str] = &["target", "deps", "incremental", "build"];

/// Compiler intermediate and metadata files.
const BUILD_EXTENSIONS: &[&str] = &["rlib", "rmeta", "d"];

const LARGE_USER_EXTENSIONS: &[&str] = &["mov", "mp4", "mkv", "zip", "dmg", "pkg", "iso"];

const DOWNLOADS_DIR: &str = "Downloads";

#[derive(Debug, Clone)]
enum SafePattern {
    CacheDir { label: &'static str, parts: Vec<&'static str> },
    BuildDir(&'static str),
    Extension(&'static str),
}

impl SafePattern {
    fn matches(&self, dirs: &[String], extension: Option<&str>) -> bool {
        match self {
            SafePattern::CacheDir { parts, .. } => dirs
                .windows(parts.len())
                .any(|window| window.iter().zip(parts).all(|(a, b)| a == b)),
            SafePattern::BuildDir(name) => dirs.iter().any(|d| d == name),
            SafePattern::Extension(ext) => extension == Some(*ext),
        }
    }

    fn reason(&self) -> String {
        match self {
            SafePattern::CacheDir { label, .. } => format!("cache/build artifact: {}", label),
            SafePattern::BuildDir(name) => format!("build temporary: */{}/*", name),
            SafePattern::Extension(ext) => format!("build temporary: *.{}", ext),
        }
    }
}

/// Classifier over fixed system-prefix and safe-pattern tables.
#[derive(Debug, Clone)]
pub struct Classifier {
    system_prefixes: Vec<PathBuf>,
    safe_patterns: Vec<SafePattern>,
}

impl Default for Classifier {
    fn default() -> Self {
        let mut safe_patterns: Vec<SafePattern> = CACHE_DIRS
            .iter()
            .map(|&label| SafePattern::CacheDir {
                label,
                parts: label.split('/').collect(),
            })
            .collect();
        safe_patterns.extend(BUILD_DIRS.iter().copied().map(SafePattern::BuildDir));
        safe_patterns.extend(BUILD_EXTENSIONS.iter().copied().map(SafePattern::Extension));

        Self {
            system_prefixes: SYSTEM_ROOT_PREFIXES.iter().map(PathBuf::from).collect(),
            safe_patterns,
        }
    }
}

impl Classifier {
    pub fn classify(&self, path: &Path) -> Classification {
        let path = absolute_path(path);

        if let Some(prefix) = self.system_prefixes.iter().find(|p| path.starts_with(p)) {
            return Classification::new(
                Tier::System,
                format!("system path: {}", prefix.display()),
            );
        }

        let dirs = parent_dir_names(&path);
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());

        if let Some(pattern) = self
            .safe_patterns
            .iter()
            .find(|p| p.matches(&dirs, extension.as_deref()))
        {
            return Classification::new(Tier::Safe, pattern.reason());
        }

        if extension
            .as_deref()
            .is_some_and(|e| LARGE_USER_EXTENSIONS.contains(&e))
        {
            return Classification::new(Tier::Caution, "large user file/package");
        }
        if dirs.iter().any(|d| d == DOWNLOADS_DIR) {
            return Classification::new(Tier::Caution, "downloads folder");
        }
        Classification::new(Tier::Caution, "unknown, verify before deletion")
    }
}

lazy_static! {
    static ref DEFAULT_CLASSIFIER: Classifier = Classifier::default();
}

/// Classifies `path` with the built-in tables.
pub fn classify(path: &Path) -> Classification {
    DEFAULT_CLASSIFIER.classify(path)
}

fn parent_dir_names(path: &Path) -> Vec<String> {
    path.parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|c| match c {
                    Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}
