pub mod matcher;
pub mod walk;

pub use matcher::{absolute_path, is_excluded, PathMatcher};
pub use walk::{TreeWalker, WalkStats, PROGRESS_INTERVAL};
