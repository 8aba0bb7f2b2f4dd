pub mod fs;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fields::AnswerField;

pub use fs::FileSystemStore;
pub use memory::InMemoryStore;

/// Errors raised by submission persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("submission not found: {0}")]
    NotFound(String),

    #[error("duplicate submission id: {0}")]
    DuplicateSubmissionId(String),
}

/// Status of one workflow section on the portal side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionStatus {
    New,
    Done,
    Failed,
    Incomplete,
}

/// Overall lifecycle of a submission's remote push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubmitStatus {
    Active,
    Incomplete,
    Sent,
    Failed,
    Error,
}

/// The six portal sections, in the fixed order they are pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    DataPengajuan,
    Komitmen,
    Bahan,
    Proses,
    Produk,
    PemantauanEvaluasi,
}

impl SectionKind {
    pub const ALL: [SectionKind; 6] = [
        SectionKind::DataPengajuan,
        SectionKind::Komitmen,
        SectionKind::Bahan,
        SectionKind::Proses,
        SectionKind::Produk,
        SectionKind::PemantauanEvaluasi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::DataPengajuan => "data_pengajuan",
            SectionKind::Komitmen => "komitmen_tanggung_jawab",
            SectionKind::Bahan => "bahan",
            SectionKind::Proses => "proses",
            SectionKind::Produk => "produk",
            SectionKind::PemantauanEvaluasi => "pemantauan_evaluasi",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SectionKind::DataPengajuan => "Data Pengajuan",
            SectionKind::Komitmen => "Komitmen dan Tanggung Jawab",
            SectionKind::Bahan => "Bahan",
            SectionKind::Proses => "Proses Produk Halal",
            SectionKind::Produk => "Produk",
            SectionKind::PemantauanEvaluasi => "Pemantauan dan Evaluasi",
        }
    }

    pub fn from_str_name(name: &str) -> Option<Self> {
        SectionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
    }
}

/// Which sections a submit run covers.
///
/// `Only` is used by the admin surface for targeted re-submission of a single
/// failed section; the default batch run covers all six.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionFilter {
    All,
    Only(SectionKind),
}

impl SectionFilter {
    pub fn includes(&self, kind: SectionKind) -> bool {
        match self {
            SectionFilter::All => true,
            SectionFilter::Only(only) => *only == kind,
        }
    }
}

/// Per-section progress record: derived status plus the human-readable notes
/// collected while pushing the section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionState {
    pub status: SectionStatus,
    pub notes: Vec<String>,
}

impl SectionState {
    pub fn new() -> Self {
        Self {
            status: SectionStatus::New,
            notes: Vec::new(),
        }
    }
}

impl Default for SectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// One local record per external form entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub submission_id: String,
    pub reg_id: Option<String>,
    pub pabrik_id: Option<String>,
    pub payload: Vec<AnswerField>,
    pub data_pengajuan: SectionState,
    pub komitmen_tanggung_jawab: SectionState,
    pub bahan: SectionState,
    pub proses: SectionState,
    pub produk: SectionState,
    pub pemantauan_evaluasi: SectionState,
    pub status_submit: SubmitStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(submission_id: String, payload: Vec<AnswerField>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            submission_id,
            reg_id: None,
            pabrik_id: None,
            payload,
            data_pengajuan: SectionState::new(),
            komitmen_tanggung_jawab: SectionState::new(),
            bahan: SectionState::new(),
            proses: SectionState::new(),
            produk: SectionState::new(),
            pemantauan_evaluasi: SectionState::new(),
            status_submit: SubmitStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn section(&self, kind: SectionKind) -> &SectionState {
        match kind {
            SectionKind::DataPengajuan => &self.data_pengajuan,
            SectionKind::Komitmen => &self.komitmen_tanggung_jawab,
            SectionKind::Bahan => &self.bahan,
            SectionKind::Proses => &self.proses,
            SectionKind::Produk => &self.produk,
            SectionKind::PemantauanEvaluasi => &self.pemantauan_evaluasi,
        }
    }

    pub fn section_mut(&mut self, kind: SectionKind) -> &mut SectionState {
        match kind {
            SectionKind::DataPengajuan => &mut self.data_pengajuan,
            SectionKind::Komitmen => &mut self.komitmen_tanggung_jawab,
            SectionKind::Bahan => &mut self.bahan,
            SectionKind::Proses => &mut self.proses,
            SectionKind::Produk => &mut self.produk,
            SectionKind::PemantauanEvaluasi => &mut self.pemantauan_evaluasi,
        }
    }

    /// Reset every section to a fresh state. Used when a registration is
    /// (re)created: previous per-section progress is stale for the new
    /// generation and must never read as done.
    pub fn reset_sections(&mut self) {
        for kind in SectionKind::ALL {
            *self.section_mut(kind) = SectionState::new();
        }
    }

    pub fn all_sections_done(&self) -> bool {
        SectionKind::ALL
            .into_iter()
            .all(|kind| self.section(kind).status == SectionStatus::Done)
    }

    /// Names of sections not yet done, for user-facing gate messages.
    pub fn incomplete_section_names(&self) -> Vec<&'static str> {
        SectionKind::ALL
            .into_iter()
            .filter(|kind| self.section(*kind).status != SectionStatus::Done)
            .map(|kind| kind.display_name())
            .collect()
    }
}

/// Persistence boundary for submissions.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Submission, StoreError>;

    async fn find_by_submission_id(
        &self,
        submission_id: &str,
    ) -> Result<Option<Submission>, StoreError>;

    async fn all(&self) -> Result<Vec<Submission>, StoreError>;

    /// Insert or replace a submission. `submission_id` stays unique: inserting
    /// a new record whose `submission_id` belongs to a different existing
    /// record is rejected.
    async fn upsert(&self, submission: Submission) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
