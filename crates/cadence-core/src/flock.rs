use crate::error::{CadenceError, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Advisory lock guarding one load-mutate-persist window of the store.
/// Released on drop, so a crashed process never leaves a stale lock behind.
pub struct StoreGuard {
    file: File,
}

impl StoreGuard {
    /// Acquire an exclusive lock on `path`, retrying with exponential backoff
    /// (1ms to 512ms, ~1s total) before failing with `ConcurrentModification`.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let mut delay = std::time::Duration::from_millis(1);
        let max_delay = std::time::Duration::from_millis(512);

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { file }),
                Err(_) if delay <= max_delay => {
                    std::thread::sleep(delay);
                    delay *= 2;
                }
                Err(_) => {
                    return Err(CadenceError::ConcurrentModification(
                        path.display().to_string(),
                    ));
                }
            }
        }
    }
}

impl Drop for StoreGuard {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}
