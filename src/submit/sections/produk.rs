use async_trait::async_trait;
use serde_json::Value;

use crate::certportal::CertPortalApi;
use crate::fields::FieldKey;
use crate::files::SubmissionFiles;
use crate::store::SectionKind;
use crate::submit::outcome::{SectionOutcome, SectionRun};

use super::{item_ids, value_to_string, SectionContext, SectionProcessor};

/// Product registration: bind the registration's product catalog to the
/// factory in one call.
///
/// The factory id is re-resolved here rather than trusted from earlier runs —
/// the portal can reshuffle factories between jobs, so the row is matched by
/// company-name equality against a fresh list.
pub struct ProdukSection;

#[async_trait]
impl SectionProcessor for ProdukSection {
    fn kind(&self) -> SectionKind {
        SectionKind::Produk
    }

    async fn process(
        &self,
        ctx: &mut SectionContext<'_>,
        portal: &dyn CertPortalApi,
        _files: &SubmissionFiles,
    ) -> SectionOutcome {
        let mut run = SectionRun::new(self.kind());

        let catalog = portal.product_catalog(&ctx.reg_id).await;
        run.record("memuat katalog produk", &catalog);
        let product_ids = item_ids(&catalog);
        if catalog.success && product_ids.is_empty() {
            run.note("Tidak ada produk terdaftar untuk registrasi ini");
        }

        let company = ctx.fields.get_or_default(FieldKey::CompanyName);
        let listed = portal.list_factories().await;
        run.record("memuat daftar pabrik", &listed);
        let factory_id = listed
            .data_items()
            .iter()
            .find(|item| {
                item.get("nama_pabrik").and_then(Value::as_str) == Some(company.as_str())
            })
            .and_then(|item| item.get("id").and_then(value_to_string));

        match factory_id {
            None => run.note(format!(
                "Gagal resolusi pabrik: tidak ada pabrik dengan nama '{company}'"
            )),
            Some(factory_id) => {
                ctx.pabrik_id = Some(factory_id.clone());
                if !product_ids.is_empty() {
                    let registered = portal
                        .register_factory_products(&factory_id, &product_ids)
                        .await;
                    run.record("mendaftarkan produk ke pabrik", &registered);
                }
            }
        }

        run.finish()
    }
}
