#[cfg(target_os = "windows")]
pub mod windows;

use std::fs::Metadata;
use std::path::PathBuf;
use std::time::SystemTime;

/// Identifier of the storage device holding a file.
#[cfg(unix)]
pub fn device_id(metadata: &Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.dev())
}

/// Identifier of the storage device holding a file.
///
/// Not exposed by the standard library on this platform, so
/// same-filesystem checks are a no-op.
#[cfg(not(unix))]
pub fn device_id(_metadata: &Metadata) -> Option<u64> {
    None
}

/// Birth time where the filesystem records it, otherwise the inode change
/// time on Unix, otherwise the modification time.
pub fn created_time(metadata: &Metadata) -> SystemTime {
    if let Ok(created) = metadata.created() {
        return created;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        use std::time::{Duration, UNIX_EPOCH};
        let secs = metadata.ctime();
        let nanos = metadata.ctime_nsec().clamp(0, 999_999_999) as u32;
        if secs >= 0 {
            return UNIX_EPOCH + Duration::new(secs as u64, nanos);
        }
    }
    metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Root used when the user leaves the scan root empty: the whole machine.
#[cfg(target_os = "windows")]
pub fn default_root() -> PathBuf {
    windows::system_drive_root()
}

/// Root used when the user leaves the scan root empty: the whole machine.
#[cfg(not(target_os = "windows"))]
pub fn default_root() -> PathBuf {
    PathBuf::from("/")
}

/// Whether the platform has a trash / recycle facility the `trash` crate
/// can move files into.
pub fn has_trash() -> bool {
    cfg!(any(
        target_os = "windows",
        target_os = "macos",
        all(
            unix,
            not(target_os = "macos"),
            not(target_os = "ios"),
            not(target_os = "android")
        )
    ))
}
