use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::info;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file not found: {0}")]
    NotFound(String),
}

/// Local storage for files attached to form submissions.
///
/// Layout is one directory per external submission id:
/// `<root>/<submission_id>/<filename>`. Deleting a submission during
/// reconciliation removes the whole directory — there is no foreign key
/// doing this for us, the reconciler calls it explicitly.
#[derive(Debug, Clone)]
pub struct SubmissionFiles {
    root: PathBuf,
}

impl SubmissionFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn dir_for(&self, submission_id: &str) -> PathBuf {
        self.root.join(submission_id)
    }

    pub fn path_for(&self, submission_id: &str, filename: &str) -> PathBuf {
        self.dir_for(submission_id).join(filename)
    }

    pub fn exists(&self, submission_id: &str, filename: &str) -> bool {
        self.path_for(submission_id, filename).exists()
    }

    /// Read an attachment for upload. Missing files are a business failure
    /// the caller turns into a section note, not a crash.
    pub async fn read(
        &self,
        submission_id: &str,
        filename: &str,
    ) -> Result<Vec<u8>, FileStoreError> {
        let path = self.path_for(submission_id, filename);
        if !path.exists() {
            return Err(FileStoreError::NotFound(display_path(&path)));
        }
        Ok(fs::read(path).await?)
    }

    pub async fn write(
        &self,
        submission_id: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<(), FileStoreError> {
        let dir = self.dir_for(submission_id);
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join(filename), bytes).await?;
        Ok(())
    }

    /// Remove the whole directory for a submission, if present.
    pub async fn delete_all(&self, submission_id: &str) -> Result<(), FileStoreError> {
        let dir = self.dir_for(submission_id);
        if dir.exists() {
            fs::remove_dir_all(&dir).await?;
            info!(submission_id, "removed submission file directory");
        }
        Ok(())
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_read_delete_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let files = SubmissionFiles::new(dir.path());

        files.write("JF-9", "tim.xlsx", b"abc").await.unwrap();
        assert!(files.exists("JF-9", "tim.xlsx"));
        assert_eq!(files.read("JF-9", "tim.xlsx").await.unwrap(), b"abc");

        files.delete_all("JF-9").await.unwrap();
        assert!(!files.dir_for("JF-9").exists());
    }

    #[tokio::test]
    async fn missing_file_is_a_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let files = SubmissionFiles::new(dir.path());
        let err = files.read("JF-9", "nope.pdf").await.unwrap_err();
        assert!(matches!(err, FileStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_all_on_absent_dir_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let files = SubmissionFiles::new(dir.path());
        files.delete_all("never-existed").await.unwrap();
    }
}
