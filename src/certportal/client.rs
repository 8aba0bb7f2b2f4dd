use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use moka::future::Cache;
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::token;
use super::types::{
    ApiResult, CertificatePayload, DraftPayload, FactoryPayload, ResponsiblePersonPayload,
    SignaturePayload, TeamMember,
};

/// The portal surface the submission pipeline talks to.
///
/// One method per remote operation; every method resolves to a normalized
/// [`ApiResult`] and never errors for ordinary remote failure. Mockable for
/// the orchestrator and section tests.
#[async_trait]
pub trait CertPortalApi: Send + Sync {
    // Profile / registration
    async fn pelaku_usaha_profile(&self) -> ApiResult;
    async fn registration_detail(&self, reg_id: &str) -> ApiResult;
    async fn submit_draft(&self, draft: &DraftPayload) -> ApiResult;
    async fn put_certificate(&self, reg_id: &str, certificate: &CertificatePayload) -> ApiResult;
    async fn put_responsible_person(
        &self,
        reg_id: &str,
        person: &ResponsiblePersonPayload,
    ) -> ApiResult;

    // Files
    async fn upload_file(&self, purpose: &str, filename: &str, bytes: Vec<u8>) -> ApiResult;

    // Ingredients
    async fn list_ingredients(&self, reg_id: &str) -> ApiResult;
    async fn add_ingredients_bulk(
        &self,
        reg_id: &str,
        factory_id: &str,
        file_url: &str,
    ) -> ApiResult;
    async fn remove_ingredient(&self, reg_id: &str, ingredient_id: &str) -> ApiResult;

    // Products
    async fn list_products(&self, reg_id: &str) -> ApiResult;
    async fn add_products_bulk(&self, reg_id: &str, file_url: &str) -> ApiResult;
    async fn remove_product(&self, reg_id: &str, product_id: &str) -> ApiResult;
    async fn product_catalog(&self, reg_id: &str) -> ApiResult;
    async fn register_factory_products(
        &self,
        factory_id: &str,
        product_ids: &[String],
    ) -> ApiResult;

    // Layouts
    async fn list_layouts(&self, reg_id: &str) -> ApiResult;
    async fn add_layout(&self, reg_id: &str, file_url: &str, label: &str) -> ApiResult;
    async fn remove_layout(&self, reg_id: &str, layout_id: &str) -> ApiResult;

    // Flow diagrams
    async fn list_flow_diagrams(&self, reg_id: &str) -> ApiResult;
    async fn add_flow_diagram(&self, reg_id: &str, file_url: &str, label: &str) -> ApiResult;
    async fn remove_flow_diagram(&self, reg_id: &str, diagram_id: &str) -> ApiResult;

    // Halal team
    async fn list_team_members(&self, reg_id: &str) -> ApiResult;
    async fn add_team_member(&self, reg_id: &str, member: &TeamMember) -> ApiResult;
    async fn remove_team_member(&self, reg_id: &str, member_id: &str) -> ApiResult;

    // Evaluation documents
    async fn list_evaluation_docs(&self, reg_id: &str) -> ApiResult;
    async fn add_evaluation_doc(&self, reg_id: &str, file_url: &str, label: &str) -> ApiResult;
    async fn remove_evaluation_doc(&self, reg_id: &str, doc_id: &str) -> ApiResult;

    // Signatures
    async fn list_signatures(&self, reg_id: &str) -> ApiResult;
    async fn add_signature(&self, reg_id: &str, signature: &SignaturePayload) -> ApiResult;
    async fn remove_signature(&self, reg_id: &str, signature_id: &str) -> ApiResult;

    // Factories
    async fn list_factories(&self) -> ApiResult;
    async fn create_factory(&self, factory: &FactoryPayload) -> ApiResult;
    async fn remove_factory(&self, factory_id: &str) -> ApiResult;
    async fn attach_factory(&self, reg_id: &str, factory_id: &str) -> ApiResult;

    // Master data
    async fn provinces(&self) -> ApiResult;
    async fn districts(&self, province_code: &str) -> ApiResult;
    async fn service_types(&self) -> ApiResult;
    async fn factory_statuses(&self) -> ApiResult;
    async fn product_filter(&self, service_code: &str) -> ApiResult;
    async fn lph_list(&self, service_code: &str) -> ApiResult;

    // Final submission
    async fn final_submit(&self, reg_id: &str) -> ApiResult;
}

/// HTTP implementation against the certification portal.
///
/// The bearer header is formatted once at construction; an empty credential
/// short-circuits every call to a 401 result before any network activity.
/// Requests pass a rate limiter, master-data lookups are cached briefly.
pub struct CertPortalClient {
    http: reqwest::Client,
    base_url: String,
    bearer: String,
    raw_token: String,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    master_cache: Cache<String, ApiResult>,
}

impl CertPortalClient {
    pub fn new(base_url: &str, bearer_token: Option<&str>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let raw_token = bearer_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or_default()
            .to_string();
        let bearer = if raw_token.is_empty() {
            String::new()
        } else {
            token::format_bearer(&raw_token)
        };

        let quota = Quota::per_second(NonZeroU32::new(5).unwrap())
            .allow_burst(NonZeroU32::new(10).unwrap());
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        let master_cache = Cache::builder()
            .max_capacity(64)
            .time_to_live(Duration::from_secs(300))
            .build();

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer,
            raw_token,
            rate_limiter,
            master_cache,
        })
    }

    /// Whether the configured token decodes to a live `exp` claim.
    pub fn has_live_token(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        token::is_token_active(&self.raw_token, now)
    }

    async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> ApiResult {
        if self.bearer.is_empty() {
            return ApiResult::no_credential();
        }
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;

        let url = format!("{}{}", self.base_url, path);
        debug!(%url, method = %method, "portal request");

        let mut request = self
            .http
            .request(method, &url)
            .header(AUTHORIZATION, &self.bearer);
        if let Some(body) = body {
            request = request.json(&body);
        }

        match request.send().await {
            Ok(response) => Self::normalize(response).await,
            Err(err) => {
                warn!(path, error = %err, "portal request failed before a response arrived");
                ApiResult::local_error(format!("request to {path} failed: {err}"))
            }
        }
    }

    /// Collapse an HTTP response into the uniform result shape.
    async fn normalize(response: reqwest::Response) -> ApiResult {
        let status = response.status().as_u16();
        let success = (200..300).contains(&status);

        let body: Value = match response.text().await {
            Ok(text) if text.trim().is_empty() => Value::Null,
            Ok(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
            Err(err) => {
                return ApiResult::local_error(format!("failed reading portal response: {err}"))
            }
        };

        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                if success {
                    "OK".to_string()
                } else {
                    format!("HTTP {status}")
                }
            });

        if success {
            let data = body.get("data").cloned().filter(|v| !v.is_null());
            ApiResult::ok(status, data, message)
        } else {
            let errors = body
                .get("errors")
                .cloned()
                .filter(|v| !v.is_null())
                .or_else(|| (!body.is_null()).then(|| body.clone()));
            ApiResult::failure(status, message, errors)
        }
    }

    async fn cached_get(&self, cache_key: String, path: String) -> ApiResult {
        if let Some(hit) = self.master_cache.get(&cache_key).await {
            debug!(key = %cache_key, "master-data cache hit");
            return hit;
        }
        let result = self.execute(Method::GET, &path, None).await;
        if result.success {
            self.master_cache.insert(cache_key, result.clone()).await;
        }
        result
    }
}

#[async_trait]
impl CertPortalApi for CertPortalClient {
    async fn pelaku_usaha_profile(&self) -> ApiResult {
        self.execute(Method::GET, "/pelaku-usaha/profile", None).await
    }

    async fn registration_detail(&self, reg_id: &str) -> ApiResult {
        self.execute(Method::GET, &format!("/reg/{reg_id}/detail"), None)
            .await
    }

    async fn submit_draft(&self, draft: &DraftPayload) -> ApiResult {
        self.execute(
            Method::POST,
            "/reg/daftar",
            Some(serde_json::to_value(draft).unwrap_or(Value::Null)),
        )
        .await
    }

    async fn put_certificate(&self, reg_id: &str, certificate: &CertificatePayload) -> ApiResult {
        self.execute(
            Method::PUT,
            &format!("/reg/{reg_id}/sertifikat"),
            Some(serde_json::to_value(certificate).unwrap_or(Value::Null)),
        )
        .await
    }

    async fn put_responsible_person(
        &self,
        reg_id: &str,
        person: &ResponsiblePersonPayload,
    ) -> ApiResult {
        self.execute(
            Method::PUT,
            &format!("/reg/{reg_id}/penanggung-jawab"),
            Some(serde_json::to_value(person).unwrap_or(Value::Null)),
        )
        .await
    }

    async fn upload_file(&self, purpose: &str, filename: &str, bytes: Vec<u8>) -> ApiResult {
        if self.bearer.is_empty() {
            return ApiResult::no_credential();
        }
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .text("purpose", purpose.to_string())
            .part("file", part);

        let url = format!("{}/file/upload", self.base_url);
        match self
            .http
            .post(&url)
            .header(AUTHORIZATION, &self.bearer)
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => Self::normalize(response).await,
            Err(err) => {
                warn!(filename, error = %err, "file upload failed before a response arrived");
                ApiResult::local_error(format!("upload of {filename} failed: {err}"))
            }
        }
    }

    async fn list_ingredients(&self, reg_id: &str) -> ApiResult {
        self.execute(Method::GET, &format!("/reg/{reg_id}/bahan"), None)
            .await
    }

    async fn add_ingredients_bulk(
        &self,
        reg_id: &str,
        factory_id: &str,
        file_url: &str,
    ) -> ApiResult {
        self.execute(
            Method::POST,
            &format!("/reg/{reg_id}/bahan/bulk"),
            Some(json!({"file_url": file_url, "id_pabrik": factory_id})),
        )
        .await
    }

    async fn remove_ingredient(&self, reg_id: &str, ingredient_id: &str) -> ApiResult {
        self.execute(
            Method::DELETE,
            &format!("/reg/{reg_id}/bahan/{ingredient_id}"),
            None,
        )
        .await
    }

    async fn list_products(&self, reg_id: &str) -> ApiResult {
        self.execute(Method::GET, &format!("/reg/{reg_id}/produk"), None)
            .await
    }

    async fn add_products_bulk(&self, reg_id: &str, file_url: &str) -> ApiResult {
        self.execute(
            Method::POST,
            &format!("/reg/{reg_id}/produk/bulk"),
            Some(json!({"file_url": file_url})),
        )
        .await
    }

    async fn remove_product(&self, reg_id: &str, product_id: &str) -> ApiResult {
        self.execute(
            Method::DELETE,
            &format!("/reg/{reg_id}/produk/{product_id}"),
            None,
        )
        .await
    }

    async fn product_catalog(&self, reg_id: &str) -> ApiResult {
        self.execute(Method::GET, &format!("/reg/{reg_id}/produk/katalog"), None)
            .await
    }

    async fn register_factory_products(
        &self,
        factory_id: &str,
        product_ids: &[String],
    ) -> ApiResult {
        self.execute(
            Method::POST,
            &format!("/pabrik/{factory_id}/produk"),
            Some(json!({"id_produk": product_ids})),
        )
        .await
    }

    async fn list_layouts(&self, reg_id: &str) -> ApiResult {
        self.execute(Method::GET, &format!("/reg/{reg_id}/denah"), None)
            .await
    }

    async fn add_layout(&self, reg_id: &str, file_url: &str, label: &str) -> ApiResult {
        self.execute(
            Method::POST,
            &format!("/reg/{reg_id}/denah"),
            Some(json!({"file_url": file_url, "keterangan": label})),
        )
        .await
    }

    async fn remove_layout(&self, reg_id: &str, layout_id: &str) -> ApiResult {
        self.execute(
            Method::DELETE,
            &format!("/reg/{reg_id}/denah/{layout_id}"),
            None,
        )
        .await
    }

    async fn list_flow_diagrams(&self, reg_id: &str) -> ApiResult {
        self.execute(Method::GET, &format!("/reg/{reg_id}/diagram-alur"), None)
            .await
    }

    async fn add_flow_diagram(&self, reg_id: &str, file_url: &str, label: &str) -> ApiResult {
        self.execute(
            Method::POST,
            &format!("/reg/{reg_id}/diagram-alur"),
            Some(json!({"file_url": file_url, "keterangan": label})),
        )
        .await
    }

    async fn remove_flow_diagram(&self, reg_id: &str, diagram_id: &str) -> ApiResult {
        self.execute(
            Method::DELETE,
            &format!("/reg/{reg_id}/diagram-alur/{diagram_id}"),
            None,
        )
        .await
    }

    async fn list_team_members(&self, reg_id: &str) -> ApiResult {
        self.execute(Method::GET, &format!("/reg/{reg_id}/tim-halal"), None)
            .await
    }

    async fn add_team_member(&self, reg_id: &str, member: &TeamMember) -> ApiResult {
        self.execute(
            Method::POST,
            &format!("/reg/{reg_id}/tim-halal"),
            Some(serde_json::to_value(member).unwrap_or(Value::Null)),
        )
        .await
    }

    async fn remove_team_member(&self, reg_id: &str, member_id: &str) -> ApiResult {
        self.execute(
            Method::DELETE,
            &format!("/reg/{reg_id}/tim-halal/{member_id}"),
            None,
        )
        .await
    }

    async fn list_evaluation_docs(&self, reg_id: &str) -> ApiResult {
        self.execute(Method::GET, &format!("/reg/{reg_id}/dokumen-evaluasi"), None)
            .await
    }

    async fn add_evaluation_doc(&self, reg_id: &str, file_url: &str, label: &str) -> ApiResult {
        self.execute(
            Method::POST,
            &format!("/reg/{reg_id}/dokumen-evaluasi"),
            Some(json!({"file_url": file_url, "keterangan": label})),
        )
        .await
    }

    async fn remove_evaluation_doc(&self, reg_id: &str, doc_id: &str) -> ApiResult {
        self.execute(
            Method::DELETE,
            &format!("/reg/{reg_id}/dokumen-evaluasi/{doc_id}"),
            None,
        )
        .await
    }

    async fn list_signatures(&self, reg_id: &str) -> ApiResult {
        self.execute(Method::GET, &format!("/reg/{reg_id}/tanda-tangan"), None)
            .await
    }

    async fn add_signature(&self, reg_id: &str, signature: &SignaturePayload) -> ApiResult {
        self.execute(
            Method::POST,
            &format!("/reg/{reg_id}/tanda-tangan"),
            Some(serde_json::to_value(signature).unwrap_or(Value::Null)),
        )
        .await
    }

    async fn remove_signature(&self, reg_id: &str, signature_id: &str) -> ApiResult {
        self.execute(
            Method::DELETE,
            &format!("/reg/{reg_id}/tanda-tangan/{signature_id}"),
            None,
        )
        .await
    }

    async fn list_factories(&self) -> ApiResult {
        self.execute(Method::GET, "/pelaku-usaha/pabrik", None).await
    }

    async fn create_factory(&self, factory: &FactoryPayload) -> ApiResult {
        self.execute(
            Method::POST,
            "/pabrik",
            Some(serde_json::to_value(factory).unwrap_or(Value::Null)),
        )
        .await
    }

    async fn remove_factory(&self, factory_id: &str) -> ApiResult {
        self.execute(Method::DELETE, &format!("/pabrik/{factory_id}"), None)
            .await
    }

    async fn attach_factory(&self, reg_id: &str, factory_id: &str) -> ApiResult {
        self.execute(
            Method::POST,
            &format!("/reg/{reg_id}/pabrik/{factory_id}"),
            None,
        )
        .await
    }

    async fn provinces(&self) -> ApiResult {
        self.cached_get("provinsi".to_string(), "/master/provinsi".to_string())
            .await
    }

    async fn districts(&self, province_code: &str) -> ApiResult {
        self.cached_get(
            format!("kabupaten:{province_code}"),
            format!("/master/kabupaten?provinsi={province_code}"),
        )
        .await
    }

    async fn service_types(&self) -> ApiResult {
        self.cached_get(
            "jenis-layanan".to_string(),
            "/master/jenis-layanan".to_string(),
        )
        .await
    }

    async fn factory_statuses(&self) -> ApiResult {
        self.cached_get(
            "status-pabrik".to_string(),
            "/master/status-pabrik".to_string(),
        )
        .await
    }

    async fn product_filter(&self, service_code: &str) -> ApiResult {
        self.cached_get(
            format!("filter-produk:{service_code}"),
            format!("/master/filter-produk?layanan={service_code}"),
        )
        .await
    }

    async fn lph_list(&self, service_code: &str) -> ApiResult {
        self.cached_get(
            format!("lph:{service_code}"),
            format!("/master/lph?layanan={service_code}"),
        )
        .await
    }

    async fn final_submit(&self, reg_id: &str) -> ApiResult {
        self.execute(Method::POST, &format!("/reg/{reg_id}/kirim"), None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn missing_credential_short_circuits_without_network() {
        // No server running; a network attempt would produce a 500-shaped
        // transport failure, not the fixed 401.
        let client = CertPortalClient::new("http://127.0.0.1:1", None).unwrap();
        let result = client.pelaku_usaha_profile().await;
        assert!(!result.success);
        assert_eq!(result.status, 401);
    }

    #[tokio::test]
    async fn success_response_is_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pelaku-usaha/profile"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "Sukses",
                "data": {"nama_perusahaan": "PT A"}
            })))
            .mount(&server)
            .await;

        let client = CertPortalClient::new(&server.uri(), Some("tok")).unwrap();
        let result = client.pelaku_usaha_profile().await;
        assert!(result.success);
        assert_eq!(result.status, 200);
        assert_eq!(result.message, "Sukses");
        assert_eq!(result.data_str("nama_perusahaan").as_deref(), Some("PT A"));
    }

    #[tokio::test]
    async fn remote_failure_is_a_result_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/reg/REG-1/bahan/bulk"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "message": "Validasi gagal",
                "errors": ["Nama bahan kosong"]
            })))
            .mount(&server)
            .await;

        let client = CertPortalClient::new(&server.uri(), Some("tok")).unwrap();
        let result = client.add_ingredients_bulk("REG-1", "PAB-1", "https://f/x").await;
        assert!(!result.success);
        assert_eq!(result.status, 422);
        assert_eq!(result.message, "Validasi gagal");
        assert_eq!(result.error_strings(), vec!["Nama bahan kosong"]);
    }

    #[tokio::test]
    async fn transport_error_becomes_local_500() {
        // Nothing listens here; connection is refused immediately.
        let client = CertPortalClient::new("http://127.0.0.1:1", Some("tok")).unwrap();
        let result = client.final_submit("REG-1").await;
        assert!(!result.success);
        assert_eq!(result.status, 500);
    }

    #[tokio::test]
    async fn master_data_lookups_are_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/master/provinsi"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "OK",
                "data": [{"code": "32", "name": "JAWA BARAT"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CertPortalClient::new(&server.uri(), Some("tok")).unwrap();
        let first = client.provinces().await;
        let second = client.provinces().await;
        assert!(first.success);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn upload_sends_multipart_and_normalizes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/file/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "OK",
                "data": {"file_url": "https://files/abc"}
            })))
            .mount(&server)
            .await;

        let client = CertPortalClient::new(&server.uri(), Some("tok")).unwrap();
        let result = client
            .upload_file("diagram_alur", "alur.png", b"png-bytes".to_vec())
            .await;
        assert!(result.success);
        assert_eq!(result.data_str("file_url").as_deref(), Some("https://files/abc"));
    }
}
