use async_trait::async_trait;

use crate::certportal::CertPortalApi;
use crate::fields::FieldKey;
use crate::files::SubmissionFiles;
use crate::store::SectionKind;
use crate::submit::outcome::{SectionOutcome, SectionRun};
use crate::submit::spreadsheet;

use super::{item_ids, SectionContext, SectionProcessor};

/// Halal-team commitment: members come from the workbook uploaded with the
/// form, one add call each.
pub struct KomitmenSection;

#[async_trait]
impl SectionProcessor for KomitmenSection {
    fn kind(&self) -> SectionKind {
        SectionKind::Komitmen
    }

    async fn process(
        &self,
        ctx: &mut SectionContext<'_>,
        portal: &dyn CertPortalApi,
        files: &SubmissionFiles,
    ) -> SectionOutcome {
        let mut run = SectionRun::new(self.kind());

        if !ctx.is_new_registration {
            let listed = portal.list_team_members(&ctx.reg_id).await;
            run.record("memuat tim halal terdaftar", &listed);
            for member_id in item_ids(&listed) {
                let removed = portal.remove_team_member(&ctx.reg_id, &member_id).await;
                run.record(&format!("menghapus anggota tim {member_id}"), &removed);
            }
        }

        let Some(filename) = ctx.fields.get(FieldKey::TeamCommitmentSheet) else {
            run.note("Berkas tim halal tidak ditemukan pada isian formulir");
            return run.finish();
        };

        let path = files.path_for(&ctx.submission_id, filename);
        match spreadsheet::parse_team_workbook(&path) {
            Err(err) => run.note(format!("Gagal membaca berkas tim halal: {err}")),
            Ok(members) if members.is_empty() => {
                run.note("Berkas tim halal tidak memuat satu pun anggota")
            }
            Ok(members) => {
                run.local_ok(
                    "membaca berkas tim halal",
                    format!("{} anggota", members.len()),
                );
                for member in &members {
                    let added = portal.add_team_member(&ctx.reg_id, member).await;
                    run.record(&format!("menambahkan anggota tim {}", member.nama), &added);
                }
            }
        }

        run.finish()
    }
}
