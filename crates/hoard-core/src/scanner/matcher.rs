use std::env;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Fragment {
    /// Absolute or home-relative entry, matched as a string prefix of the
    /// absolute path.
    Prefix(String),
    /// Anything else, matched as a substring of the absolute path.
    Substring(String),
}

/// Path exclusion test against a list of user-supplied fragments.
///
/// Fragments starting with `/`, `~` (or any absolute path on the host) are
/// expanded and matched as string prefixes, so `/data/proj` also covers
/// `/data/project`. All others are plain substrings.
/// A fragment that cannot be expanded (no home directory) never matches.
#[derive(Debug, Clone, Default)]
pub struct PathMatcher {
    fragments: Vec<Fragment>,
}

impl PathMatcher {
    pub fn new<S: AsRef<str>>(fragments: &[S]) -> Self {
        Self::with_home(fragments, dirs::home_dir().as_deref())
    }

    pub fn with_home<S: AsRef<str>>(fragments: &[S], home: Option<&Path>) -> Self {
        let fragments = fragments
            .iter()
            .filter_map(|raw| compile_fragment(raw.as_ref(), home))
            .collect();
        Self { fragments }
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.fragments.is_empty() {
            return false;
        }
        let absolute = absolute_path(path);
        let absolute_str = absolute.to_string_lossy();
        self.fragments.iter().any(|fragment| match fragment {
            Fragment::Prefix(prefix) => absolute_str.starts_with(prefix.as_str()),
            Fragment::Substring(needle) => absolute_str.contains(needle.as_str()),
        })
    }
}

/// One-shot form of [`PathMatcher::is_excluded`].
pub fn is_excluded<S: AsRef<str>>(path: &Path, fragments: &[S]) -> bool {
    PathMatcher::new(fragments).is_excluded(path)
}

fn compile_fragment(raw: &str, home: Option<&Path>) -> Option<Fragment> {
    let fragment = raw.trim();
    if fragment.is_empty() {
        return None;
    }
    if let Some(rest) = fragment.strip_prefix('~') {
        let home = home?;
        let rest = rest.trim_start_matches(['/', '\\']);
        let expanded = if rest.is_empty() {
            home.to_path_buf()
        } else {
            home.join(rest)
        };
        return Some(prefix(&expanded));
    }
    if fragment.starts_with('/') || Path::new(fragment).is_absolute() {
        return Some(prefix(Path::new(fragment)));
    }
    Some(Fragment::Substring(fragment.to_string()))
}

fn prefix(path: &Path) -> Fragment {
    Fragment::Prefix(normalize(path).to_string_lossy().into_owned())
}

/// Absolute, lexically normalized form of `path`. Relative paths are resolved
/// against the current directory; when that is unavailable the path is used
/// as given.
pub fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize(path);
    }
    match env::current_dir() {
        Ok(cwd) => normalize(&cwd.join(path)),
        Err(_) => normalize(path),
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other),
        }
    }
    normalized
}
