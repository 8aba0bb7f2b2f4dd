use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::{StoreError, Submission, SubmissionStore};

/// File-backed submission store: one JSON document per submission under a
/// data directory. Writes go through a temp file and rename so a crashed job
/// never leaves a half-written record behind.
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    data_dir: PathBuf,
}

impl FileSystemStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.data_dir.join(format!("{id}.json"))
    }

    async fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir).await?;
        Ok(())
    }

    async fn read_record(&self, path: &Path) -> Result<Submission, StoreError> {
        let bytes = fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl SubmissionStore for FileSystemStore {
    async fn get(&self, id: &str) -> Result<Submission, StoreError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.read_record(&path).await
    }

    async fn find_by_submission_id(
        &self,
        submission_id: &str,
    ) -> Result<Option<Submission>, StoreError> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .find(|record| record.submission_id == submission_id))
    }

    async fn all(&self) -> Result<Vec<Submission>, StoreError> {
        if !self.data_dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.data_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            records.push(self.read_record(&path).await?);
        }
        // Stable iteration order for batch jobs and tests.
        records.sort_by(|a, b| a.submission_id.cmp(&b.submission_id));
        Ok(records)
    }

    async fn upsert(&self, submission: Submission) -> Result<(), StoreError> {
        self.ensure_dir().await?;

        if let Some(existing) = self.find_by_submission_id(&submission.submission_id).await? {
            if existing.id != submission.id {
                return Err(StoreError::DuplicateSubmissionId(
                    submission.submission_id.clone(),
                ));
            }
        }

        let path = self.record_path(&submission.id);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&submission)?;
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;
        debug!(id = %submission.id, submission_id = %submission.submission_id, "persisted submission");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        fs::remove_file(path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SubmitStatus;

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemStore::new(dir.path());

        let submission = Submission::new("JF-1".to_string(), Vec::new());
        let id = submission.id.clone();
        store.upsert(submission).await.unwrap();

        let loaded = store.get(&id).await.unwrap();
        assert_eq!(loaded.submission_id, "JF-1");
        assert_eq!(loaded.status_submit, SubmitStatus::Active);
    }

    #[tokio::test]
    async fn duplicate_submission_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemStore::new(dir.path());

        store
            .upsert(Submission::new("JF-1".to_string(), Vec::new()))
            .await
            .unwrap();
        let err = store
            .upsert(Submission::new("JF-1".to_string(), Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSubmissionId(_)));
    }

    #[tokio::test]
    async fn delete_removes_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemStore::new(dir.path());

        let submission = Submission::new("JF-2".to_string(), Vec::new());
        let id = submission.id.clone();
        store.upsert(submission).await.unwrap();
        store.delete(&id).await.unwrap();

        assert!(matches!(
            store.get(&id).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
        assert!(store
            .find_by_submission_id("JF-2")
            .await
            .unwrap()
            .is_none());
    }
}
