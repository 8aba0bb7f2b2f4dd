use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every portal operation resolves to this shape, success or not.
///
/// Remote 4xx/5xx and transport failures are data, not `Err`: the section
/// processors turn them into notes and keep going. Only programmer errors
/// escape as panics, and the job boundary boxes even those.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResult {
    pub success: bool,
    pub status: u16,
    pub data: Option<Value>,
    pub message: String,
    /// Raw error body or validation-error list for failures.
    pub errors: Option<Value>,
}

/// Message fragments the portal uses for a dead bearer token. Matching any of
/// them (or a bare 401) is the global stop-the-batch signal, distinct from an
/// ordinary 4xx.
const UNAUTHORIZED_MARKERS: &[&str] = &["Expired token", "Signature has expired", "Unauthenticated"];

impl ApiResult {
    pub fn ok(status: u16, data: Option<Value>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            status,
            data,
            message: message.into(),
            errors: None,
        }
    }

    pub fn failure(status: u16, message: impl Into<String>, errors: Option<Value>) -> Self {
        Self {
            success: false,
            status,
            data: None,
            message: message.into(),
            errors,
        }
    }

    /// Fixed result for a missing credential. Returned before any network
    /// activity and never retried automatically.
    pub fn no_credential() -> Self {
        Self::failure(401, "portal credential is not configured", None)
    }

    /// A local exception boxed into the uniform shape.
    pub fn local_error(message: impl Into<String>) -> Self {
        Self::failure(500, message, None)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
            || UNAUTHORIZED_MARKERS
                .iter()
                .any(|marker| self.message.contains(marker))
    }

    /// String field out of `data`.
    pub fn data_str(&self, key: &str) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|data| data.get(key))
            .and_then(|value| match value {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
    }

    /// `data` as a list; list-shaped operations return their rows directly in
    /// `data`, everything else yields an empty vec.
    pub fn data_items(&self) -> Vec<Value> {
        match &self.data {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    /// Flatten the validation-error payload into displayable strings,
    /// verbatim. The portal sends either a bare list or a field → list map.
    pub fn error_strings(&self) -> Vec<String> {
        fn push_value(out: &mut Vec<String>, value: &Value) {
            match value {
                Value::String(s) => out.push(s.clone()),
                Value::Array(items) => items.iter().for_each(|item| push_value(out, item)),
                Value::Object(map) => map.values().for_each(|item| push_value(out, item)),
                Value::Null => {}
                other => out.push(other.to_string()),
            }
        }
        let mut out = Vec::new();
        if let Some(errors) = &self.errors {
            push_value(&mut out, errors);
        }
        out
    }
}

/// Body of the draft-creation call that opens a registration.
#[derive(Debug, Clone, Serialize)]
pub struct DraftPayload {
    pub jenis_layanan: String,
    pub nama_perusahaan: String,
    pub tgl_daftar: String,
}

/// Aggregated certificate fields, pushed with PUT semantics.
#[derive(Debug, Clone, Serialize)]
pub struct CertificatePayload {
    pub jenis_layanan: String,
    pub jenis_produk: String,
    pub id_lph: String,
    pub tgl_daftar: String,
    pub nama_perusahaan: String,
}

/// Responsible-person fields, pushed with PUT semantics.
#[derive(Debug, Clone, Serialize)]
pub struct ResponsiblePersonPayload {
    pub nama: String,
    pub jabatan: String,
    pub email: String,
    pub no_telp: String,
}

/// New-factory creation body. Codes are resolved from master data before the
/// call is made; the portal rejects raw names.
#[derive(Debug, Clone, Serialize)]
pub struct FactoryPayload {
    pub nama_pabrik: String,
    pub alamat: String,
    pub kode_kabupaten: String,
    pub kode_provinsi: String,
    pub status_pabrik: String,
}

/// One halal-team member parsed from the commitment workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamMember {
    pub nomor: String,
    pub nama: String,
    pub jabatan: String,
}

/// Combined signature record; only sent when both underlying uploads landed.
#[derive(Debug, Clone, Serialize)]
pub struct SignaturePayload {
    pub nama_penyelia: String,
    pub ttd_penyelia_url: String,
    pub ttd_pimpinan_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unauthorized_is_detected_by_status_and_message() {
        assert!(ApiResult::failure(401, "nope", None).is_unauthorized());
        assert!(ApiResult::failure(400, "Expired token", None).is_unauthorized());
        assert!(!ApiResult::failure(422, "Nama bahan kosong", None).is_unauthorized());
    }

    #[test]
    fn data_str_reads_strings_and_numbers() {
        let result = ApiResult::ok(
            200,
            Some(json!({"id_reg": "REG-1", "count": 3, "blank": ""})),
            "OK",
        );
        assert_eq!(result.data_str("id_reg").as_deref(), Some("REG-1"));
        assert_eq!(result.data_str("count").as_deref(), Some("3"));
        assert_eq!(result.data_str("blank"), None);
        assert_eq!(result.data_str("missing"), None);
    }

    #[test]
    fn error_strings_flatten_lists_and_maps() {
        let result = ApiResult::failure(
            422,
            "validation failed",
            Some(json!({"bahan": ["Nama bahan kosong", "Satuan tidak dikenal"]})),
        );
        let errors = result.error_strings();
        assert!(errors.contains(&"Nama bahan kosong".to_string()));
        assert!(errors.contains(&"Satuan tidak dikenal".to_string()));
    }

    #[test]
    fn list_shaped_data_yields_items() {
        let result = ApiResult::ok(200, Some(json!([{"id": 1}, {"id": 2}])), "OK");
        assert_eq!(result.data_items().len(), 2);
        assert!(ApiResult::ok(200, None, "OK").data_items().is_empty());
    }
}
