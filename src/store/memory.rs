use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{StoreError, Submission, SubmissionStore};

/// In-memory store for tests and dry runs. No side effects.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<String, Submission>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Submission>) -> Self {
        let store = Self::new();
        {
            let mut map = store.records.lock().unwrap();
            for record in records {
                map.insert(record.id.clone(), record);
            }
        }
        store
    }
}

#[async_trait]
impl SubmissionStore for InMemoryStore {
    async fn get(&self, id: &str) -> Result<Submission, StoreError> {
        self.records
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn find_by_submission_id(
        &self,
        submission_id: &str,
    ) -> Result<Option<Submission>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|record| record.submission_id == submission_id)
            .cloned())
    }

    async fn all(&self) -> Result<Vec<Submission>, StoreError> {
        let mut records: Vec<Submission> =
            self.records.lock().unwrap().values().cloned().collect();
        records.sort_by(|a, b| a.submission_id.cmp(&b.submission_id));
        Ok(records)
    }

    async fn upsert(&self, submission: Submission) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        let duplicate = records
            .values()
            .any(|r| r.submission_id == submission.submission_id && r.id != submission.id);
        if duplicate {
            return Err(StoreError::DuplicateSubmissionId(
                submission.submission_id.clone(),
            ));
        }
        records.insert(submission.id.clone(), submission);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.records
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}
