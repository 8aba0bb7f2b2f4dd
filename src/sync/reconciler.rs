use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};

use super::{SyncError, SyncLock};
use crate::files::SubmissionFiles;
use crate::formapi::FormApiClient;
use crate::store::{Submission, SubmissionStore};

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Pulls the provider's current submissions and makes local storage agree:
/// exactly one record per remote submission id, nothing else.
pub struct FormSyncReconciler {
    form_api: FormApiClient,
    store: Arc<dyn SubmissionStore>,
    files: SubmissionFiles,
    lock: SyncLock,
}

impl FormSyncReconciler {
    pub fn new(
        form_api: FormApiClient,
        store: Arc<dyn SubmissionStore>,
        files: SubmissionFiles,
        lock: SyncLock,
    ) -> Self {
        Self {
            form_api,
            store,
            files,
            lock,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<ReconcileReport, SyncError> {
        let _guard = self.lock.acquire()?;

        let remote = self.form_api.fetch_submissions().await?;
        let mut report = ReconcileReport::default();
        let mut seen: HashSet<String> = HashSet::with_capacity(remote.len());

        for entry in &remote {
            seen.insert(entry.id.clone());
            let payload = entry.to_payload();

            match self.store.find_by_submission_id(&entry.id).await? {
                Some(mut existing) => {
                    // Payload-derived fields are overwritten wholesale;
                    // workflow progress (reg_id, sections, status) survives.
                    existing.payload = payload;
                    existing.updated_at = Utc::now();
                    self.store.upsert(existing).await?;
                    report.updated += 1;
                }
                None => {
                    self.store
                        .upsert(Submission::new(entry.id.clone(), payload))
                        .await?;
                    report.created += 1;
                }
            }
        }

        // Records whose remote counterpart disappeared go away together with
        // their file directory.
        for record in self.store.all().await? {
            if seen.contains(&record.submission_id) {
                continue;
            }
            self.files.delete_all(&record.submission_id).await?;
            self.store.delete(&record.id).await?;
            report.deleted += 1;
        }

        info!(
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            "reconciliation pass complete"
        );
        Ok(report)
    }
}
