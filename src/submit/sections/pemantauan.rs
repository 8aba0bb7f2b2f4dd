use async_trait::async_trait;

use crate::certportal::{CertPortalApi, SignaturePayload};
use crate::fields::FieldKey;
use crate::files::SubmissionFiles;
use crate::store::SectionKind;
use crate::submit::outcome::{SectionOutcome, SectionRun};

use super::{item_ids, upload_attachment, SectionContext, SectionProcessor};

/// Monitoring and evaluation: up to three supporting documents plus the two
/// signature images. The combined signature record is only added when both
/// signature uploads landed — a half-signed record is worse than none.
pub struct PemantauanEvaluasiSection;

const EVALUATION_DOCS: [(FieldKey, &str); 3] = [
    (FieldKey::EvaluationDocOne, "Dokumen Evaluasi 1"),
    (FieldKey::EvaluationDocTwo, "Dokumen Evaluasi 2"),
    (FieldKey::EvaluationDocThree, "Dokumen Evaluasi 3"),
];

#[async_trait]
impl SectionProcessor for PemantauanEvaluasiSection {
    fn kind(&self) -> SectionKind {
        SectionKind::PemantauanEvaluasi
    }

    async fn process(
        &self,
        ctx: &mut SectionContext<'_>,
        portal: &dyn CertPortalApi,
        files: &SubmissionFiles,
    ) -> SectionOutcome {
        let mut run = SectionRun::new(self.kind());

        if !ctx.is_new_registration {
            let listed = portal.list_evaluation_docs(&ctx.reg_id).await;
            run.record("memuat dokumen evaluasi terdaftar", &listed);
            for doc_id in item_ids(&listed) {
                let removed = portal.remove_evaluation_doc(&ctx.reg_id, &doc_id).await;
                run.record(&format!("menghapus dokumen evaluasi {doc_id}"), &removed);
            }

            let listed = portal.list_signatures(&ctx.reg_id).await;
            run.record("memuat tanda tangan terdaftar", &listed);
            for signature_id in item_ids(&listed) {
                let removed = portal.remove_signature(&ctx.reg_id, &signature_id).await;
                run.record(&format!("menghapus tanda tangan {signature_id}"), &removed);
            }
        }

        // Supporting documents are optional; absent slots are simply skipped.
        for (key, default_label) in EVALUATION_DOCS {
            let Some(filename) = ctx.fields.get(key) else {
                continue;
            };
            let filename = filename.to_string();
            let label = ctx
                .fields
                .label(key)
                .unwrap_or(default_label)
                .to_string();
            if let Some(file_url) = upload_attachment(
                &mut run,
                portal,
                files,
                &ctx.submission_id,
                "dokumen_evaluasi",
                &filename,
                "mengunggah dokumen evaluasi",
            )
            .await
            {
                let added = portal
                    .add_evaluation_doc(&ctx.reg_id, &file_url, &label)
                    .await;
                run.record("menambahkan dokumen evaluasi", &added);
            }
        }

        let supervisor_url = self
            .upload_signature(
                &mut run,
                ctx,
                portal,
                files,
                FieldKey::SupervisorSignature,
                "ttd_penyelia",
                "mengunggah tanda tangan penyelia",
            )
            .await;
        let owner_url = self
            .upload_signature(
                &mut run,
                ctx,
                portal,
                files,
                FieldKey::OwnerSignature,
                "ttd_pimpinan",
                "mengunggah tanda tangan pimpinan",
            )
            .await;

        if let (Some(supervisor_url), Some(owner_url)) = (supervisor_url, owner_url) {
            let supervisor_name = format!(
                "{} {}",
                ctx.fields.get_or_default(FieldKey::SupervisorFirstName),
                ctx.fields.get_or_default(FieldKey::SupervisorLastName)
            )
            .trim()
            .to_string();
            let signature = SignaturePayload {
                nama_penyelia: supervisor_name,
                ttd_penyelia_url: supervisor_url,
                ttd_pimpinan_url: owner_url,
            };
            let added = portal.add_signature(&ctx.reg_id, &signature).await;
            run.record("menambahkan tanda tangan", &added);
        }

        run.finish()
    }
}

impl PemantauanEvaluasiSection {
    #[allow(clippy::too_many_arguments)]
    async fn upload_signature(
        &self,
        run: &mut SectionRun,
        ctx: &SectionContext<'_>,
        portal: &dyn CertPortalApi,
        files: &SubmissionFiles,
        key: FieldKey,
        purpose: &str,
        action: &str,
    ) -> Option<String> {
        let Some(filename) = ctx.fields.get(key) else {
            run.note(format!("Gagal {action}: berkas tidak ditemukan pada isian formulir"));
            return None;
        };
        let filename = filename.to_string();
        upload_attachment(
            run,
            portal,
            files,
            &ctx.submission_id,
            purpose,
            &filename,
            action,
        )
        .await
    }
}
