//! inotify backend (Linux)

use super::{split_target, FileWatcher, WatchError};
use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify, WatchDescriptor};
use std::ffi::OsString;
use std::io;
use std::path::Path;

/// Watches the target's parent directory for `IN_MODIFY` events
pub struct InotifyWatcher {
    inotify: Inotify,
    watch: Option<WatchDescriptor>,
    filename: OsString,
}

impl InotifyWatcher {
    /// Create an inotify instance; no directory is watched yet
    pub fn new() -> Result<Self, WatchError> {
        let inotify = Inotify::init(InitFlags::IN_CLOEXEC).map_err(io::Error::from)?;
        Ok(Self {
            inotify,
            watch: None,
            filename: OsString::new(),
        })
    }
}

impl FileWatcher for InotifyWatcher {
    fn subscribe(&mut self, path: &Path) -> Result<(), WatchError> {
        if self.watch.is_some() {
            return Err(WatchError::AlreadySubscribed(path.to_path_buf()));
        }

        let (dir, filename) = split_target(path)?;
        let wd = self
            .inotify
            .add_watch(dir.as_path(), AddWatchFlags::IN_MODIFY)
            .map_err(io::Error::from)?;

        log::debug!("Watching {:?} for changes to {:?}", dir, filename);
        self.watch = Some(wd);
        self.filename = filename;
        Ok(())
    }

    fn wait_for_signal(&mut self) -> Result<(), WatchError> {
        if self.watch.is_none() {
            return Err(WatchError::NotSubscribed);
        }

        loop {
            // blocking read; events for other files in the directory are dropped
            let events = self.inotify.read_events().map_err(io::Error::from)?;
            if events
                .iter()
                .any(|event| event.name.as_deref() == Some(self.filename.as_os_str()))
            {
                return Ok(());
            }
        }
    }

    fn unsubscribe(&mut self) {
        if let Some(wd) = self.watch.take() {
            if let Err(err) = self.inotify.rm_watch(wd) {
                log::warn!("inotify_rm_watch failed: {}", err);
            }
        }
    }
}

impl Drop for InotifyWatcher {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
