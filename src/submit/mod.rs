pub mod dispatch;
pub mod orchestrator;
pub mod outcome;
pub mod sections;
pub mod spreadsheet;

use thiserror::Error;

use crate::store::StoreError;

pub use dispatch::{DispatchOutcome, FinalDispatcher};
pub use orchestrator::{BatchReport, SubmissionOrchestrator, SubmitOptions};
pub use outcome::{SectionOutcome, StepEvent};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
