use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

use crate::certportal::CertPortalApi;
use crate::fields::FieldKey;
use crate::files::SubmissionFiles;
use crate::store::SectionKind;
use crate::submit::outcome::{SectionOutcome, SectionRun};

use super::{item_ids, upload_attachment, SectionContext, SectionProcessor};

/// Production process: flow diagram and factory layout photo, each uploaded
/// and then registered under the form's field label.
pub struct ProsesSection;

/// Drop the trailing parenthetical format hint the form appends to upload
/// labels, e.g. `"Diagram Alur (PDF maks. 2MB)"`.
fn strip_format_hint(label: &str) -> String {
    static HINT: OnceLock<Regex> = OnceLock::new();
    let pattern = HINT.get_or_init(|| Regex::new(r"\s*\([^)]*\)\s*$").unwrap());
    pattern.replace(label.trim(), "").trim().to_string()
}

#[async_trait]
impl SectionProcessor for ProsesSection {
    fn kind(&self) -> SectionKind {
        SectionKind::Proses
    }

    async fn process(
        &self,
        ctx: &mut SectionContext<'_>,
        portal: &dyn CertPortalApi,
        files: &SubmissionFiles,
    ) -> SectionOutcome {
        let mut run = SectionRun::new(self.kind());

        if !ctx.is_new_registration {
            let listed = portal.list_flow_diagrams(&ctx.reg_id).await;
            run.record("memuat diagram alur terdaftar", &listed);
            for diagram_id in item_ids(&listed) {
                let removed = portal.remove_flow_diagram(&ctx.reg_id, &diagram_id).await;
                run.record(&format!("menghapus diagram alur {diagram_id}"), &removed);
            }

            let listed = portal.list_layouts(&ctx.reg_id).await;
            run.record("memuat denah terdaftar", &listed);
            for layout_id in item_ids(&listed) {
                let removed = portal.remove_layout(&ctx.reg_id, &layout_id).await;
                run.record(&format!("menghapus denah {layout_id}"), &removed);
            }
        }

        // Flow diagram.
        match ctx.fields.get(FieldKey::FlowDiagramFile) {
            None => run.note("Berkas diagram alur tidak ditemukan pada isian formulir"),
            Some(filename) => {
                let filename = filename.to_string();
                let label = strip_format_hint(
                    ctx.fields
                        .label(FieldKey::FlowDiagramFile)
                        .unwrap_or("Diagram Alur Proses"),
                );
                if let Some(file_url) = upload_attachment(
                    &mut run,
                    portal,
                    files,
                    &ctx.submission_id,
                    "diagram_alur",
                    &filename,
                    "mengunggah diagram alur",
                )
                .await
                {
                    let added = portal
                        .add_flow_diagram(&ctx.reg_id, &file_url, &label)
                        .await;
                    run.record("menambahkan diagram alur", &added);
                }
            }
        }

        // Factory layout photo.
        match ctx.fields.get(FieldKey::FactoryLayoutFile) {
            None => run.note("Berkas denah pabrik tidak ditemukan pada isian formulir"),
            Some(filename) => {
                let filename = filename.to_string();
                let label = strip_format_hint(
                    ctx.fields
                        .label(FieldKey::FactoryLayoutFile)
                        .unwrap_or("Denah Ruang Produksi"),
                );
                if let Some(file_url) = upload_attachment(
                    &mut run,
                    portal,
                    files,
                    &ctx.submission_id,
                    "denah_pabrik",
                    &filename,
                    "mengunggah denah pabrik",
                )
                .await
                {
                    let added = portal.add_layout(&ctx.reg_id, &file_url, &label).await;
                    run.record("menambahkan denah pabrik", &added);
                }
            }
        }

        run.finish()
    }
}
