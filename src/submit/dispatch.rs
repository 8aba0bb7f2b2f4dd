use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::SubmitError;
use crate::certportal::CertPortalApi;
use crate::store::{SubmissionStore, SubmitStatus};

/// Result of a final-dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The portal accepted the final submission.
    Submitted,
    /// One or more sections are not done; nothing was sent. The names are
    /// surfaced verbatim to the operator.
    Blocked { incomplete: Vec<&'static str> },
    /// The portal rejected the final call.
    Rejected { status: u16, message: String },
}

/// The final gate: a registration goes to the portal's submit endpoint only
/// when every section reads done. Runs as its own small job, separate from
/// the section pipeline.
pub struct FinalDispatcher {
    store: Arc<dyn SubmissionStore>,
    portal: Arc<dyn CertPortalApi>,
}

impl FinalDispatcher {
    pub fn new(store: Arc<dyn SubmissionStore>, portal: Arc<dyn CertPortalApi>) -> Self {
        Self { store, portal }
    }

    pub async fn dispatch(&self, record_id: &str) -> Result<DispatchOutcome, SubmitError> {
        let mut record = self.store.get(record_id).await?;

        if !record.all_sections_done() {
            let incomplete = record.incomplete_section_names();
            warn!(record_id, ?incomplete, "final dispatch blocked");
            return Ok(DispatchOutcome::Blocked { incomplete });
        }

        let Some(reg_id) = record.reg_id.clone() else {
            // All sections done without a registration id cannot happen
            // through the pipeline; treat a hand-edited record as blocked.
            warn!(record_id, "record has no registration id, refusing final dispatch");
            return Ok(DispatchOutcome::Blocked {
                incomplete: Vec::new(),
            });
        };

        let result = self.portal.final_submit(&reg_id).await;
        if !result.success {
            warn!(
                record_id,
                reg_id = %reg_id,
                status = result.status,
                message = %result.message,
                "portal rejected final submission"
            );
            return Ok(DispatchOutcome::Rejected {
                status: result.status,
                message: result.message,
            });
        }

        info!(record_id, reg_id = %reg_id, "final submission accepted");
        record.status_submit = SubmitStatus::Sent;
        record.updated_at = Utc::now();
        self.store.upsert(record).await?;
        Ok(DispatchOutcome::Submitted)
    }
}
