use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One answer captured from the form provider at sync time.
///
/// The payload snapshot on a submission is an ordered list of these; it is
/// immutable once written and re-created wholesale on every reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerField {
    pub field_name: String,
    pub label: String,
    pub field_type: String,
    pub value: String,
}

/// Closed set of form fields the submission pipeline understands.
///
/// Section processors read answers through this enum only — raw answer arrays
/// are never re-scanned by string name downstream of payload normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKey {
    CompanyName,
    ServiceType,
    ProductType,
    LphName,
    RegistrationDate,
    ResponsibleName,
    ResponsibleTitle,
    ResponsibleEmail,
    ResponsiblePhone,
    FactoryName,
    FactoryAddress,
    FactoryCity,
    FactoryProvince,
    FactoryStatus,
    TeamCommitmentSheet,
    IngredientListFile,
    ProductListFile,
    FlowDiagramFile,
    FactoryLayoutFile,
    EvaluationDocOne,
    EvaluationDocTwo,
    EvaluationDocThree,
    SupervisorSignature,
    OwnerSignature,
    SupervisorFirstName,
    SupervisorLastName,
}

impl FieldKey {
    /// Map an external form field name onto a known key.
    pub fn from_field_name(name: &str) -> Option<Self> {
        let key = match name {
            "nama_perusahaan" => FieldKey::CompanyName,
            "jenis_layanan" => FieldKey::ServiceType,
            "jenis_produk" => FieldKey::ProductType,
            "nama_lph" => FieldKey::LphName,
            "tgl_daftar" => FieldKey::RegistrationDate,
            "nama_penanggung_jawab" => FieldKey::ResponsibleName,
            "jabatan_penanggung_jawab" => FieldKey::ResponsibleTitle,
            "email_penanggung_jawab" => FieldKey::ResponsibleEmail,
            "telepon_penanggung_jawab" => FieldKey::ResponsiblePhone,
            "nama_pabrik" => FieldKey::FactoryName,
            "alamat_pabrik" => FieldKey::FactoryAddress,
            "kota_pabrik" => FieldKey::FactoryCity,
            "provinsi_pabrik" => FieldKey::FactoryProvince,
            "status_pabrik" => FieldKey::FactoryStatus,
            "berkas_tim_halal" => FieldKey::TeamCommitmentSheet,
            "berkas_daftar_bahan" => FieldKey::IngredientListFile,
            "berkas_daftar_produk" => FieldKey::ProductListFile,
            "berkas_diagram_alur" => FieldKey::FlowDiagramFile,
            "berkas_denah_pabrik" => FieldKey::FactoryLayoutFile,
            "berkas_evaluasi_1" => FieldKey::EvaluationDocOne,
            "berkas_evaluasi_2" => FieldKey::EvaluationDocTwo,
            "berkas_evaluasi_3" => FieldKey::EvaluationDocThree,
            "ttd_penyelia" => FieldKey::SupervisorSignature,
            "ttd_pimpinan" => FieldKey::OwnerSignature,
            "nama_depan_penyelia" => FieldKey::SupervisorFirstName,
            "nama_belakang_penyelia" => FieldKey::SupervisorLastName,
            _ => return None,
        };
        Some(key)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::CompanyName => "nama_perusahaan",
            FieldKey::ServiceType => "jenis_layanan",
            FieldKey::ProductType => "jenis_produk",
            FieldKey::LphName => "nama_lph",
            FieldKey::RegistrationDate => "tgl_daftar",
            FieldKey::ResponsibleName => "nama_penanggung_jawab",
            FieldKey::ResponsibleTitle => "jabatan_penanggung_jawab",
            FieldKey::ResponsibleEmail => "email_penanggung_jawab",
            FieldKey::ResponsiblePhone => "telepon_penanggung_jawab",
            FieldKey::FactoryName => "nama_pabrik",
            FieldKey::FactoryAddress => "alamat_pabrik",
            FieldKey::FactoryCity => "kota_pabrik",
            FieldKey::FactoryProvince => "provinsi_pabrik",
            FieldKey::FactoryStatus => "status_pabrik",
            FieldKey::TeamCommitmentSheet => "berkas_tim_halal",
            FieldKey::IngredientListFile => "berkas_daftar_bahan",
            FieldKey::ProductListFile => "berkas_daftar_produk",
            FieldKey::FlowDiagramFile => "berkas_diagram_alur",
            FieldKey::FactoryLayoutFile => "berkas_denah_pabrik",
            FieldKey::EvaluationDocOne => "berkas_evaluasi_1",
            FieldKey::EvaluationDocTwo => "berkas_evaluasi_2",
            FieldKey::EvaluationDocThree => "berkas_evaluasi_3",
            FieldKey::SupervisorSignature => "ttd_penyelia",
            FieldKey::OwnerSignature => "ttd_pimpinan",
            FieldKey::SupervisorFirstName => "nama_depan_penyelia",
            FieldKey::SupervisorLastName => "nama_belakang_penyelia",
        }
    }
}

/// Typed view over a submission payload, built once per job run.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    values: HashMap<FieldKey, String>,
    labels: HashMap<FieldKey, String>,
}

impl FieldMap {
    pub fn from_payload(payload: &[AnswerField]) -> Self {
        let mut values = HashMap::new();
        let mut labels = HashMap::new();
        for answer in payload {
            if let Some(key) = FieldKey::from_field_name(&answer.field_name) {
                // Later duplicates win, matching provider export order.
                values.insert(key, answer.value.clone());
                labels.insert(key, answer.label.clone());
            }
        }
        Self { values, labels }
    }

    /// The form's display label for a field, when the payload carried one.
    pub fn label(&self, key: FieldKey) -> Option<&str> {
        self.labels
            .get(&key)
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
    }

    /// Fetch a field value; blank answers count as absent.
    pub fn get(&self, key: FieldKey) -> Option<&str> {
        self.values
            .get(&key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn get_or_default(&self, key: FieldKey) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    /// Registration date normalized to `YYYY-MM-DD`.
    ///
    /// The form exports dates in a handful of regional formats; anything
    /// unparseable (or absent) falls back to the current date.
    pub fn registration_date(&self) -> String {
        let today = || Utc::now().date_naive().format("%Y-%m-%d").to_string();
        let Some(raw) = self.get(FieldKey::RegistrationDate) else {
            return today();
        };
        const FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%m-%d-%Y"];
        for format in FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
                return date.format("%Y-%m-%d").to_string();
            }
        }
        today()
    }
}
