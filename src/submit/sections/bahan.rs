use async_trait::async_trait;

use crate::certportal::CertPortalApi;
use crate::fields::FieldKey;
use crate::files::SubmissionFiles;
use crate::store::SectionKind;
use crate::submit::outcome::{SectionOutcome, SectionRun};

use super::{item_ids, upload_attachment, SectionContext, SectionProcessor};

/// Ingredients and product list: two upload-then-bulk-insert flows.
///
/// The flows are independent — a broken ingredient workbook must not keep the
/// product list from landing, and vice versa. Only the ingredient insert
/// needs a factory id.
pub struct BahanSection;

#[async_trait]
impl SectionProcessor for BahanSection {
    fn kind(&self) -> SectionKind {
        SectionKind::Bahan
    }

    async fn process(
        &self,
        ctx: &mut SectionContext<'_>,
        portal: &dyn CertPortalApi,
        files: &SubmissionFiles,
    ) -> SectionOutcome {
        let mut run = SectionRun::new(self.kind());

        if !ctx.is_new_registration {
            let listed = portal.list_ingredients(&ctx.reg_id).await;
            run.record("memuat daftar bahan terdaftar", &listed);
            for ingredient_id in item_ids(&listed) {
                let removed = portal.remove_ingredient(&ctx.reg_id, &ingredient_id).await;
                run.record(&format!("menghapus bahan {ingredient_id}"), &removed);
            }

            let listed = portal.list_products(&ctx.reg_id).await;
            run.record("memuat daftar produk terdaftar", &listed);
            for product_id in item_ids(&listed) {
                let removed = portal.remove_product(&ctx.reg_id, &product_id).await;
                run.record(&format!("menghapus produk {product_id}"), &removed);
            }
        }

        // Ingredient flow: upload, then bulk insert against the factory.
        match ctx.fields.get(FieldKey::IngredientListFile) {
            None => run.note("Berkas daftar bahan tidak ditemukan pada isian formulir"),
            Some(filename) => {
                let filename = filename.to_string();
                if let Some(file_url) = upload_attachment(
                    &mut run,
                    portal,
                    files,
                    &ctx.submission_id,
                    "daftar_bahan",
                    &filename,
                    "mengunggah berkas daftar bahan",
                )
                .await
                {
                    match &ctx.pabrik_id {
                        // Hard prerequisite: without a factory there is
                        // nothing to bind the ingredients to.
                        None => run.note("Gagal menambahkan bahan: id pabrik belum tersedia"),
                        Some(factory_id) => {
                            let inserted = portal
                                .add_ingredients_bulk(&ctx.reg_id, factory_id, &file_url)
                                .await;
                            run.record_with_errors("menambahkan daftar bahan", &inserted);
                        }
                    }
                }
            }
        }

        // Product flow: no factory dependency.
        match ctx.fields.get(FieldKey::ProductListFile) {
            None => run.note("Berkas daftar produk tidak ditemukan pada isian formulir"),
            Some(filename) => {
                let filename = filename.to_string();
                if let Some(file_url) = upload_attachment(
                    &mut run,
                    portal,
                    files,
                    &ctx.submission_id,
                    "daftar_produk",
                    &filename,
                    "mengunggah berkas daftar produk",
                )
                .await
                {
                    let inserted = portal.add_products_bulk(&ctx.reg_id, &file_url).await;
                    run.record_with_errors("menambahkan daftar produk", &inserted);
                }
            }
        }

        run.finish()
    }
}
