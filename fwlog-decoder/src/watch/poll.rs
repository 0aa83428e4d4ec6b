//! Portable polling backend

use super::{split_target, FileWatcher, WatchError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

/// Observed state of the target; `None` while the file does not exist
type Stamp = Option<(u64, Option<SystemTime>)>;

fn stamp(path: &Path) -> Stamp {
    fs::metadata(path)
        .ok()
        .map(|meta| (meta.len(), meta.modified().ok()))
}

/// Stops a [`PollWatcher`] from another thread
///
/// A pending or later `wait_for_signal` returns [`WatchError::Closed`].
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Compares file size and modification time every `interval`
#[derive(Debug)]
pub struct PollWatcher {
    interval: Duration,
    stopped: Arc<AtomicBool>,
    target: Option<(PathBuf, Stamp)>,
}

impl PollWatcher {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            stopped: Arc::new(AtomicBool::new(false)),
            target: None,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stopped))
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl FileWatcher for PollWatcher {
    fn subscribe(&mut self, path: &Path) -> Result<(), WatchError> {
        if self.target.is_some() {
            return Err(WatchError::AlreadySubscribed(path.to_path_buf()));
        }
        split_target(path)?;

        log::debug!("Polling {:?} every {:?}", path, self.interval);
        self.target = Some((path.to_path_buf(), stamp(path)));
        Ok(())
    }

    fn wait_for_signal(&mut self) -> Result<(), WatchError> {
        let interval = self.interval;
        loop {
            if self.is_stopped() {
                return Err(WatchError::Closed);
            }
            let (path, last) = self.target.as_mut().ok_or(WatchError::NotSubscribed)?;

            let current = stamp(path);
            if current != *last {
                *last = current;
                return Ok(());
            }
            thread::sleep(interval);
        }
    }

    fn unsubscribe(&mut self) {
        self.target = None;
    }
}
