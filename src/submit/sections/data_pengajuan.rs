use async_trait::async_trait;

use crate::certportal::{CertPortalApi, CertificatePayload, ResponsiblePersonPayload};
use crate::fields::FieldKey;
use crate::files::SubmissionFiles;
use crate::store::SectionKind;
use crate::submit::outcome::{SectionOutcome, SectionRun};

use super::{factory, lookup_by_name, SectionContext, SectionProcessor};

/// First section: certificate master data plus the responsible person.
///
/// Resolution order matters — the service-type code gates both the product
/// filter and the LPH list, and a missing factory is created here so later
/// sections can rely on `pabrik_id`.
pub struct DataPengajuanSection;

#[async_trait]
impl SectionProcessor for DataPengajuanSection {
    fn kind(&self) -> SectionKind {
        SectionKind::DataPengajuan
    }

    async fn process(
        &self,
        ctx: &mut SectionContext<'_>,
        portal: &dyn CertPortalApi,
        _files: &SubmissionFiles,
    ) -> SectionOutcome {
        let mut run = SectionRun::new(self.kind());

        let service_name = ctx.fields.get_or_default(FieldKey::ServiceType);
        let service_types = portal.service_types().await;
        run.record("memuat master jenis layanan", &service_types);
        let service_code = lookup_by_name(&service_types, &service_name, "code");
        if service_code.is_none() {
            run.note(format!(
                "Jenis layanan '{service_name}' tidak ditemukan pada master data"
            ));
        }

        let mut product_code = String::new();
        let mut lph_id = String::new();
        if let Some(code) = &service_code {
            let product_name = ctx.fields.get_or_default(FieldKey::ProductType);
            let filter = portal.product_filter(code).await;
            run.record("memuat filter produk", &filter);
            match lookup_by_name(&filter, &product_name, "code") {
                Some(resolved) => product_code = resolved,
                None => run.note(format!(
                    "Jenis produk '{product_name}' tidak ditemukan pada master data"
                )),
            }

            let lph_name = ctx.fields.get_or_default(FieldKey::LphName);
            let lph = portal.lph_list(code).await;
            run.record("memuat daftar LPH", &lph);
            match lookup_by_name(&lph, &lph_name, "id") {
                Some(resolved) => lph_id = resolved,
                None => run.note(format!("LPH '{lph_name}' tidak ditemukan pada master data")),
            }
        }

        if ctx.pabrik_id.is_none() {
            factory::ensure_factory(&mut run, ctx, portal).await;
        }

        // Two independent PUTs: one failing must not keep the other from
        // landing — both are idempotent overwrites.
        let certificate = CertificatePayload {
            jenis_layanan: service_code.unwrap_or_default(),
            jenis_produk: product_code,
            id_lph: lph_id,
            tgl_daftar: ctx.fields.registration_date(),
            nama_perusahaan: ctx.fields.get_or_default(FieldKey::CompanyName),
        };
        let put_certificate = portal.put_certificate(&ctx.reg_id, &certificate).await;
        run.record("mengirim data sertifikat", &put_certificate);

        let person = ResponsiblePersonPayload {
            nama: ctx.fields.get_or_default(FieldKey::ResponsibleName),
            jabatan: ctx.fields.get_or_default(FieldKey::ResponsibleTitle),
            email: ctx.fields.get_or_default(FieldKey::ResponsibleEmail),
            no_telp: ctx.fields.get_or_default(FieldKey::ResponsiblePhone),
        };
        let put_person = portal.put_responsible_person(&ctx.reg_id, &person).await;
        run.record("mengirim data penanggung jawab", &put_person);

        run.finish()
    }
}
