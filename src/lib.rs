// Halal Sync Library - FormAPI / CertPortal submission pipeline
// This exposes the core components for testing and integration

pub mod certportal;
pub mod config;
pub mod fields;
pub mod files;
pub mod formapi;
pub mod notify;
pub mod store;
pub mod submit;
pub mod sync;
pub mod telemetry;

// Re-export key types for easy access
pub use certportal::{ApiResult, CertPortalApi, CertPortalClient, MockCertPortal};
pub use config::{config, init_config, HalalSyncConfig};
pub use fields::{AnswerField, FieldKey, FieldMap};
pub use files::SubmissionFiles;
pub use formapi::{FormApiClient, FormApiError};
pub use notify::{LogNotifier, Notifier};
pub use store::{
    FileSystemStore, InMemoryStore, SectionFilter, SectionKind, SectionState, SectionStatus,
    Submission, SubmissionStore, SubmitStatus,
};
pub use submit::{
    BatchReport, DispatchOutcome, FinalDispatcher, SubmissionOrchestrator, SubmitOptions,
};
pub use sync::{FormSyncReconciler, ReconcileReport, SyncError, SyncLock};
pub use telemetry::{generate_correlation_id, init_telemetry};
