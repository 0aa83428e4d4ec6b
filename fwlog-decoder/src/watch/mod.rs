//! File-change notification for follow mode
//!
//! When following a trace that is still being written, the decoder blocks on
//! a [`FileWatcher`] each time it reaches the end of the input. A watcher
//! observes the parent directory of one target file and wakes the caller only
//! for changes to that file name.
//!
//! Two backends are provided:
//! - [`InotifyWatcher`] (Linux): inotify `IN_MODIFY` on the parent directory
//! - [`PollWatcher`] (portable): periodic size/mtime comparison
//!
//! [`platform_watcher`] picks the best one for the build target.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(target_os = "linux")]
mod inotify;
mod poll;

#[cfg(target_os = "linux")]
pub use inotify::InotifyWatcher;
pub use poll::{PollWatcher, StopHandle};

/// Poll interval used by [`platform_watcher`] on targets without inotify
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Errors reported by file watchers
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("already subscribed to {0:?}")]
    AlreadySubscribed(PathBuf),

    #[error("not subscribed to any file")]
    NotSubscribed,

    #[error("cannot watch {0:?}: path has no file name")]
    InvalidTarget(PathBuf),

    #[error("watcher was closed")]
    Closed,

    #[error("watch I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Subscribe / wait / unsubscribe over a single target file
///
/// Only one subscription may be active per instance; a second `subscribe`
/// without an intervening `unsubscribe` is rejected.
pub trait FileWatcher {
    /// Start observing modifications of `path`
    fn subscribe(&mut self, path: &Path) -> Result<(), WatchError>;

    /// Block until the subscribed file is modified
    ///
    /// There is no timeout. [`WatchError::Closed`] means the watcher was
    /// stopped on purpose rather than failing.
    fn wait_for_signal(&mut self) -> Result<(), WatchError>;

    /// Stop observing; a no-op when not subscribed
    fn unsubscribe(&mut self);
}

/// Watcher backend for the build target
pub fn platform_watcher() -> Result<Box<dyn FileWatcher>, WatchError> {
    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(InotifyWatcher::new()?))
    }
    #[cfg(not(target_os = "linux"))]
    {
        Ok(Box::new(PollWatcher::new(DEFAULT_POLL_INTERVAL)))
    }
}

/// Split a target path into the directory to watch and the file name to match
pub(crate) fn split_target(path: &Path) -> Result<(PathBuf, OsString), WatchError> {
    let name = path
        .file_name()
        .ok_or_else(|| WatchError::InvalidTarget(path.to_path_buf()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, name.to_os_string()))
}
