pub mod bahan;
pub mod data_pengajuan;
pub mod factory;
pub mod komitmen;
pub mod pemantauan;
pub mod produk;
pub mod proses;

use async_trait::async_trait;
use serde_json::Value;

use crate::certportal::{ApiResult, CertPortalApi};
use crate::fields::FieldMap;
use crate::files::SubmissionFiles;
use crate::store::SectionKind;

use super::outcome::SectionOutcome;

pub use bahan::BahanSection;
pub use data_pengajuan::DataPengajuanSection;
pub use komitmen::KomitmenSection;
pub use pemantauan::PemantauanEvaluasiSection;
pub use produk::ProdukSection;
pub use proses::ProsesSection;

/// Per-record state a section run reads and may update.
///
/// `pabrik_id` is the one mutable piece: the factory helper sets it the first
/// time a factory is created or matched, and later sections read it back.
#[derive(Debug)]
pub struct SectionContext<'a> {
    pub reg_id: String,
    pub submission_id: String,
    pub pabrik_id: Option<String>,
    /// True when the registration draft was created in this run; skips the
    /// reset-before-resubmit pass since there is nothing remote to clear.
    pub is_new_registration: bool,
    pub fields: &'a FieldMap,
}

/// One of the six portal sections.
#[async_trait]
pub trait SectionProcessor: Send + Sync {
    fn kind(&self) -> SectionKind;

    async fn process(
        &self,
        ctx: &mut SectionContext<'_>,
        portal: &dyn CertPortalApi,
        files: &SubmissionFiles,
    ) -> SectionOutcome;
}

/// All six processors in the fixed submission order.
pub fn section_processors() -> Vec<Box<dyn SectionProcessor>> {
    vec![
        Box::new(DataPengajuanSection),
        Box::new(KomitmenSection),
        Box::new(BahanSection),
        Box::new(ProsesSection),
        Box::new(ProdukSection),
        Box::new(PemantauanEvaluasiSection),
    ]
}

/// Read a stored attachment and push it through the portal's upload endpoint,
/// returning the `file_url` token the follow-up add call needs. Every failure
/// mode lands in the run as a note; callers just branch on `None`.
pub(crate) async fn upload_attachment(
    run: &mut super::outcome::SectionRun,
    portal: &dyn CertPortalApi,
    files: &SubmissionFiles,
    submission_id: &str,
    purpose: &str,
    filename: &str,
    action: &str,
) -> Option<String> {
    let bytes = match files.read(submission_id, filename).await {
        Ok(bytes) => bytes,
        Err(err) => {
            run.note(format!("Gagal {action}: {err}"));
            return None;
        }
    };
    let uploaded = portal.upload_file(purpose, filename, bytes).await;
    if !run.record_with_errors(action, &uploaded) {
        return None;
    }
    match uploaded.data_str("file_url") {
        Some(url) => Some(url),
        None => {
            run.note(format!("Gagal {action}: file_url tidak ditemukan pada respons"));
            None
        }
    }
}

/// Ids of the rows in a list-shaped result.
pub(crate) fn item_ids(result: &ApiResult) -> Vec<String> {
    result
        .data_items()
        .iter()
        .filter_map(|item| item.get("id").and_then(value_to_string))
        .collect()
}

/// Find a master-data row by case-insensitive exact name and return one of
/// its columns as a string.
pub(crate) fn lookup_by_name(result: &ApiResult, name: &str, value_key: &str) -> Option<String> {
    result
        .data_items()
        .iter()
        .find(|item| {
            item.get("name")
                .and_then(Value::as_str)
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name))
        })
        .and_then(|item| item.get(value_key).and_then(value_to_string))
}

pub(crate) fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_by_name_is_case_insensitive_and_exact() {
        let result = ApiResult::ok(
            200,
            Some(json!([
                {"code": "31", "name": "DKI JAKARTA"},
                {"code": "32", "name": "JAWA BARAT"}
            ])),
            "OK",
        );
        assert_eq!(
            lookup_by_name(&result, "jawa barat", "code").as_deref(),
            Some("32")
        );
        assert_eq!(lookup_by_name(&result, "jawa", "code"), None);
    }

    #[test]
    fn item_ids_handles_numeric_and_string_ids() {
        let result = ApiResult::ok(
            200,
            Some(json!([{"id": 7, "nama": "a"}, {"id": "8", "nama": "b"}])),
            "OK",
        );
        assert_eq!(item_ids(&result), vec!["7", "8"]);
    }

    #[test]
    fn processors_cover_all_sections_in_order() {
        let kinds: Vec<SectionKind> = section_processors().iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, SectionKind::ALL.to_vec());
    }
}
