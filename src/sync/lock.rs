use chrono::{DateTime, Duration, Utc};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use tracing::{debug, warn};

use super::SyncError;

/// TTL-bound advisory lock for the reconciliation job.
///
/// Two layers: an fd lock on a guard file serializes the check-and-stamp so
/// two racing invocations cannot both pass, and a timestamp stamp file is the
/// actual lock. The stamp is removed when the guard drops — on every exit
/// path — and a crashed holder is bounded by the TTL instead of wedging sync
/// forever.
#[derive(Debug, Clone)]
pub struct SyncLock {
    stamp_path: PathBuf,
    ttl_minutes: i64,
}

impl SyncLock {
    pub fn new(stamp_path: impl Into<PathBuf>, ttl_minutes: i64) -> Self {
        Self {
            stamp_path: stamp_path.into(),
            ttl_minutes,
        }
    }

    pub fn acquire(&self) -> Result<SyncLockGuard, SyncError> {
        if let Some(parent) = self.stamp_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let guard_path = self.stamp_path.with_extension("guard");
        let guard_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&guard_path)?;
        let mut fd = fd_lock::RwLock::new(guard_file);
        let _fd_guard = fd.try_write().map_err(|_| SyncError::AlreadyRunning {
            since: self.read_stamp().unwrap_or_else(Utc::now),
        })?;

        if let Some(since) = self.read_stamp() {
            let age = Utc::now().signed_duration_since(since);
            if age < Duration::minutes(self.ttl_minutes) {
                return Err(SyncError::AlreadyRunning { since });
            }
            warn!(%since, "sync lock stamp is past its TTL, reclaiming");
        }

        fs::write(&self.stamp_path, Utc::now().to_rfc3339())?;
        debug!(path = %self.stamp_path.display(), "acquired sync lock");
        Ok(SyncLockGuard {
            stamp_path: self.stamp_path.clone(),
        })
    }

    fn read_stamp(&self) -> Option<DateTime<Utc>> {
        let raw = fs::read_to_string(&self.stamp_path).ok()?;
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|stamp| stamp.with_timezone(&Utc))
    }
}

/// Releases the lock on drop; keeps the file type private so release cannot
/// be forgotten on early returns.
#[derive(Debug)]
pub struct SyncLockGuard {
    stamp_path: PathBuf,
}

impl Drop for SyncLockGuard {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.stamp_path) {
            warn!(path = %self.stamp_path.display(), error = %err, "failed to release sync lock");
        }
    }
}
