use chrono::{DateTime, Local, Utc};
use humansize::{format_size, BINARY};
use std::path::{Path, PathBuf};

/// A file that passed every filter of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    path: PathBuf,
    size_bytes: u64,
    created_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(path: PathBuf, size_bytes: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            path,
            size_bytes,
            created_at,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn dir_name(&self) -> String {
        self.path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn base_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn formatted_size(&self) -> String {
        format_size(self.size_bytes, BINARY)
    }

    pub fn formatted_created(&self) -> String {
        if self.created_at.timestamp() <= 0 {
            return "-".to_string();
        }
        self.created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    }
}
