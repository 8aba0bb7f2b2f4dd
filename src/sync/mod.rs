pub mod lock;
pub mod reconciler;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::files::FileStoreError;
use crate::formapi::FormApiError;
use crate::store::StoreError;

pub use lock::{SyncLock, SyncLockGuard};
pub use reconciler::{FormSyncReconciler, ReconcileReport};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("form provider error: {0}")]
    FormApi(#[from] FormApiError),

    #[error("file storage error: {0}")]
    Files(#[from] FileStoreError),

    #[error("another sync has been running since {since}")]
    AlreadyRunning { since: DateTime<Utc> },
}
