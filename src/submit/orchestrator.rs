use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::sections::{section_processors, SectionContext};
use super::SubmitError;
use crate::certportal::{CertPortalApi, DraftPayload};
use crate::fields::{FieldKey, FieldMap};
use crate::files::SubmissionFiles;
use crate::notify::Notifier;
use crate::store::{SectionFilter, Submission, SubmissionStore, SubmitStatus};

/// One job invocation: which records, which sections, whose token.
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    pub record_ids: Vec<String>,
    pub user_id: Option<String>,
    pub filter: SectionFilter,
}

/// What a batch run did, for the caller's log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub errored: usize,
    pub halted_for_token: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BootstrapOutcome {
    /// The record has a usable registration id.
    Ready { is_new_registration: bool },
    /// Draft creation failed; the record carries `FAILED` and sections are
    /// skipped for this run.
    DraftFailed,
}

/// Drives one record at a time through the section pipeline.
///
/// Containment boundaries, outermost first: an unauthorized token kills the
/// whole batch (it cannot recover mid-run); any other record-level failure
/// marks that record `ERROR` and moves on; section-level failures are notes
/// inside the record and never escape.
pub struct SubmissionOrchestrator {
    store: Arc<dyn SubmissionStore>,
    portal: Arc<dyn CertPortalApi>,
    files: SubmissionFiles,
    notifier: Arc<dyn Notifier>,
}

impl SubmissionOrchestrator {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        portal: Arc<dyn CertPortalApi>,
        files: SubmissionFiles,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            portal,
            files,
            notifier,
        }
    }

    pub async fn run(&self, options: SubmitOptions) -> BatchReport {
        let mut report = BatchReport::default();
        let mut notified_users: HashSet<String> = HashSet::new();

        for record_id in &options.record_ids {
            // The profile fetch doubles as the token probe. A dead token is a
            // global condition: notify the owner once and stop the batch.
            let profile = self.portal.pelaku_usaha_profile().await;
            if profile.is_unauthorized() {
                warn!(
                    record_id = %record_id,
                    status = profile.status,
                    "portal token unauthorized, halting batch"
                );
                if let Some(user_id) = &options.user_id {
                    if notified_users.insert(user_id.clone()) {
                        self.notifier.notify_token_expired(user_id).await;
                    }
                }
                report.halted_for_token = true;
                break;
            }

            match self.process_record(record_id, options.filter).await {
                Ok(()) => report.processed += 1,
                Err(err) => {
                    error!(record_id = %record_id, error = %err, "record failed outside section handling");
                    report.errored += 1;
                    self.mark_errored(record_id).await;
                }
            }
        }

        info!(
            processed = report.processed,
            errored = report.errored,
            halted_for_token = report.halted_for_token,
            "submission batch finished"
        );
        report
    }

    /// Make sure the record has a live registration: a missing reg id, or one
    /// the portal no longer recognizes, gets a fresh draft. Section progress
    /// from the previous generation is stale either way and is reset — it
    /// must never read as done against the new registration.
    pub(crate) async fn bootstrap_registration(
        &self,
        record: &mut Submission,
        fields: &FieldMap,
    ) -> BootstrapOutcome {
        let needs_draft = match &record.reg_id {
            None => true,
            Some(reg_id) => {
                let detail = self.portal.registration_detail(reg_id).await;
                let stale = !detail.success || detail.data.is_none();
                if stale {
                    warn!(
                        record_id = %record.id,
                        reg_id = %reg_id,
                        "portal no longer recognizes registration"
                    );
                }
                stale
            }
        };
        if !needs_draft {
            return BootstrapOutcome::Ready {
                is_new_registration: false,
            };
        }

        let draft = DraftPayload {
            jenis_layanan: fields.get_or_default(FieldKey::ServiceType),
            nama_perusahaan: fields.get_or_default(FieldKey::CompanyName),
            tgl_daftar: fields.registration_date(),
        };
        let result = self.portal.submit_draft(&draft).await;
        let new_reg_id = result.success.then(|| result.data_str("id_reg")).flatten();

        match new_reg_id {
            Some(reg_id) => {
                info!(record_id = %record.id, reg_id = %reg_id, "registration draft created");
                record.reg_id = Some(reg_id);
                record.pabrik_id = None;
                record.reset_sections();
                record.status_submit = SubmitStatus::Incomplete;
                BootstrapOutcome::Ready {
                    is_new_registration: true,
                }
            }
            None => {
                warn!(
                    record_id = %record.id,
                    status = result.status,
                    message = %result.message,
                    "draft creation failed, skipping sections"
                );
                record.reg_id = None;
                record.status_submit = SubmitStatus::Failed;
                BootstrapOutcome::DraftFailed
            }
        }
    }

    async fn process_record(
        &self,
        record_id: &str,
        filter: SectionFilter,
    ) -> Result<(), SubmitError> {
        let mut record = self.store.get(record_id).await?;
        let fields = FieldMap::from_payload(&record.payload);

        let is_new_registration =
            match self.bootstrap_registration(&mut record, &fields).await {
                BootstrapOutcome::Ready {
                    is_new_registration,
                } => {
                    record.updated_at = Utc::now();
                    self.store.upsert(record.clone()).await?;
                    is_new_registration
                }
                BootstrapOutcome::DraftFailed => {
                    record.updated_at = Utc::now();
                    self.store.upsert(record).await?;
                    return Ok(());
                }
            };

        // Entry guard for the section pipeline.
        let Some(reg_id) = record.reg_id.clone() else {
            warn!(record_id, "no registration id available, nothing to push");
            return Ok(());
        };

        let mut ctx = SectionContext {
            reg_id,
            submission_id: record.submission_id.clone(),
            pabrik_id: record.pabrik_id.clone(),
            is_new_registration,
            fields: &fields,
        };

        for processor in section_processors() {
            if !filter.includes(processor.kind()) {
                continue;
            }
            let outcome = processor
                .process(&mut ctx, self.portal.as_ref(), &self.files)
                .await;

            // Single logging point for every step of every section.
            for event in &outcome.events {
                if event.ok {
                    debug!(
                        record_id,
                        reg_id = %ctx.reg_id,
                        section = outcome.kind.as_str(),
                        action = %event.action,
                        status = event.status,
                        "section step ok"
                    );
                } else {
                    warn!(
                        record_id,
                        reg_id = %ctx.reg_id,
                        section = outcome.kind.as_str(),
                        action = %event.action,
                        status = event.status,
                        detail = %event.detail,
                        "section step failed"
                    );
                }
            }

            let state = record.section_mut(outcome.kind);
            state.status = outcome.status;
            state.notes = outcome.notes;
        }

        record.pabrik_id = ctx.pabrik_id.clone();
        record.status_submit = if record.all_sections_done() {
            SubmitStatus::Sent
        } else {
            SubmitStatus::Failed
        };
        record.updated_at = Utc::now();
        self.store.upsert(record).await?;
        Ok(())
    }

    /// Best-effort: flag the record so the admin surface shows the blow-up,
    /// but never let the flagging itself take down the loop.
    async fn mark_errored(&self, record_id: &str) {
        match self.store.get(record_id).await {
            Ok(mut record) => {
                record.status_submit = SubmitStatus::Error;
                record.updated_at = Utc::now();
                if let Err(err) = self.store.upsert(record).await {
                    error!(record_id, error = %err, "failed to persist ERROR status");
                }
            }
            Err(err) => {
                error!(record_id, error = %err, "failed to load record for ERROR status")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certportal::{ApiResult, MockCertPortal};
    use crate::notify::LogNotifier;
    use crate::store::{InMemoryStore, SectionKind, SectionStatus};
    use serde_json::json;

    fn orchestrator_with(portal: Arc<MockCertPortal>) -> (SubmissionOrchestrator, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = SubmissionOrchestrator::new(
            Arc::new(InMemoryStore::new()),
            portal,
            SubmissionFiles::new(dir.path()),
            Arc::new(LogNotifier),
        );
        (orchestrator, dir)
    }

    #[tokio::test]
    async fn bootstrap_creates_draft_and_resets_state() {
        let portal = Arc::new(MockCertPortal::new());
        portal.stub(
            "submit_draft",
            ApiResult::ok(200, Some(json!({"id_reg": "REG-1"})), "OK"),
        );
        let (orchestrator, _dir) = orchestrator_with(portal);

        let mut record = Submission::new("JF-1".to_string(), Vec::new());
        let fields = FieldMap::from_payload(&record.payload);

        let outcome = orchestrator
            .bootstrap_registration(&mut record, &fields)
            .await;

        assert_eq!(
            outcome,
            BootstrapOutcome::Ready {
                is_new_registration: true
            }
        );
        assert_eq!(record.reg_id.as_deref(), Some("REG-1"));
        assert_eq!(record.status_submit, SubmitStatus::Incomplete);
        for kind in SectionKind::ALL {
            assert_eq!(record.section(kind).status, SectionStatus::New);
            assert!(record.section(kind).notes.is_empty());
        }
    }

    #[tokio::test]
    async fn bootstrap_keeps_a_recognized_registration() {
        let portal = Arc::new(MockCertPortal::new());
        portal.stub(
            "registration_detail",
            ApiResult::ok(200, Some(json!({"id_reg": "REG-7", "status": "DRAFT"})), "OK"),
        );
        let (orchestrator, _dir) = orchestrator_with(portal.clone());

        let mut record = Submission::new("JF-2".to_string(), Vec::new());
        record.reg_id = Some("REG-7".to_string());
        record.section_mut(SectionKind::Bahan).status = SectionStatus::Done;
        let fields = FieldMap::from_payload(&record.payload);

        let outcome = orchestrator
            .bootstrap_registration(&mut record, &fields)
            .await;

        assert_eq!(
            outcome,
            BootstrapOutcome::Ready {
                is_new_registration: false
            }
        );
        assert_eq!(record.reg_id.as_deref(), Some("REG-7"));
        // Existing progress survives when the registration is still live.
        assert_eq!(
            record.section(SectionKind::Bahan).status,
            SectionStatus::Done
        );
        assert_eq!(portal.call_count("submit_draft"), 0);
    }

    #[tokio::test]
    async fn invalidated_registration_is_redrafted_and_progress_discarded() {
        let portal = Arc::new(MockCertPortal::new());
        // Portal answers, but carries no data for this id anymore.
        portal.stub("registration_detail", ApiResult::ok(200, None, "OK"));
        portal.stub(
            "submit_draft",
            ApiResult::ok(200, Some(json!({"id_reg": "REG-NEW"})), "OK"),
        );
        let (orchestrator, _dir) = orchestrator_with(portal);

        let mut record = Submission::new("JF-3".to_string(), Vec::new());
        record.reg_id = Some("REG-GONE".to_string());
        record.pabrik_id = Some("PAB-9".to_string());
        record.section_mut(SectionKind::Produk).status = SectionStatus::Done;
        let fields = FieldMap::from_payload(&record.payload);

        let outcome = orchestrator
            .bootstrap_registration(&mut record, &fields)
            .await;

        assert_eq!(
            outcome,
            BootstrapOutcome::Ready {
                is_new_registration: true
            }
        );
        assert_eq!(record.reg_id.as_deref(), Some("REG-NEW"));
        assert_eq!(record.pabrik_id, None);
        assert_eq!(
            record.section(SectionKind::Produk).status,
            SectionStatus::New
        );
    }

    #[tokio::test]
    async fn failed_draft_marks_record_failed() {
        let portal = Arc::new(MockCertPortal::new());
        portal.stub(
            "submit_draft",
            ApiResult::failure(500, "portal down", None),
        );
        let (orchestrator, _dir) = orchestrator_with(portal);

        let mut record = Submission::new("JF-4".to_string(), Vec::new());
        let fields = FieldMap::from_payload(&record.payload);

        let outcome = orchestrator
            .bootstrap_registration(&mut record, &fields)
            .await;

        assert_eq!(outcome, BootstrapOutcome::DraftFailed);
        assert_eq!(record.reg_id, None);
        assert_eq!(record.status_submit, SubmitStatus::Failed);
    }
}
