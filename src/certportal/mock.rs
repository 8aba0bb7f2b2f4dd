//! Scripted portal double with a recorded call log.
//!
//! Orchestrator and section tests assert on call counts and ordering, so the
//! mock records every operation with its arguments. Responses come from
//! one-shot queues, persistent stubs, or a permissive default, in that order.

use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::CertPortalApi;
use super::types::{
    ApiResult, CertificatePayload, DraftPayload, FactoryPayload, ResponsiblePersonPayload,
    SignaturePayload, TeamMember,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: String,
    pub args: Vec<String>,
}

#[derive(Default)]
pub struct MockCertPortal {
    queued: Mutex<HashMap<String, VecDeque<ApiResult>>>,
    stubs: Mutex<HashMap<String, ApiResult>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockCertPortal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persistent canned response for an operation.
    pub fn stub(&self, operation: &str, result: ApiResult) {
        self.stubs
            .lock()
            .unwrap()
            .insert(operation.to_string(), result);
    }

    /// One-shot response; consumed before any stub is consulted.
    pub fn enqueue(&self, operation: &str, result: ApiResult) {
        self.queued
            .lock()
            .unwrap()
            .entry(operation.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    fn respond(&self, operation: &str, args: Vec<String>) -> ApiResult {
        self.calls.lock().unwrap().push(RecordedCall {
            operation: operation.to_string(),
            args,
        });

        if let Some(result) = self
            .queued
            .lock()
            .unwrap()
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
        {
            return result;
        }
        if let Some(result) = self.stubs.lock().unwrap().get(operation) {
            return result.clone();
        }
        Self::default_ok(operation)
    }

    /// Defaults keep un-stubbed flows moving: lists are empty, the draft call
    /// hands out a registration id, uploads hand out a file URL.
    fn default_ok(operation: &str) -> ApiResult {
        let data = if operation.starts_with("list_")
            || matches!(
                operation,
                "product_catalog"
                    | "provinces"
                    | "districts"
                    | "service_types"
                    | "factory_statuses"
                    | "product_filter"
                    | "lph_list"
            ) {
            json!([])
        } else if operation == "submit_draft" {
            json!({"id_reg": "REG-MOCK"})
        } else if operation == "upload_file" {
            json!({"file_url": "https://files.example/mock"})
        } else {
            json!({})
        };
        ApiResult::ok(200, Some(data), "OK")
    }
}

#[async_trait]
impl CertPortalApi for MockCertPortal {
    async fn pelaku_usaha_profile(&self) -> ApiResult {
        self.respond("pelaku_usaha_profile", vec![])
    }

    async fn registration_detail(&self, reg_id: &str) -> ApiResult {
        self.respond("registration_detail", vec![reg_id.to_string()])
    }

    async fn submit_draft(&self, draft: &DraftPayload) -> ApiResult {
        self.respond("submit_draft", vec![draft.nama_perusahaan.clone()])
    }

    async fn put_certificate(&self, reg_id: &str, certificate: &CertificatePayload) -> ApiResult {
        self.respond(
            "put_certificate",
            vec![reg_id.to_string(), certificate.jenis_produk.clone()],
        )
    }

    async fn put_responsible_person(
        &self,
        reg_id: &str,
        person: &ResponsiblePersonPayload,
    ) -> ApiResult {
        self.respond(
            "put_responsible_person",
            vec![reg_id.to_string(), person.nama.clone()],
        )
    }

    async fn upload_file(&self, purpose: &str, filename: &str, _bytes: Vec<u8>) -> ApiResult {
        self.respond(
            "upload_file",
            vec![purpose.to_string(), filename.to_string()],
        )
    }

    async fn list_ingredients(&self, reg_id: &str) -> ApiResult {
        self.respond("list_ingredients", vec![reg_id.to_string()])
    }

    async fn add_ingredients_bulk(
        &self,
        reg_id: &str,
        factory_id: &str,
        file_url: &str,
    ) -> ApiResult {
        self.respond(
            "add_ingredients_bulk",
            vec![reg_id.to_string(), factory_id.to_string(), file_url.to_string()],
        )
    }

    async fn remove_ingredient(&self, reg_id: &str, ingredient_id: &str) -> ApiResult {
        self.respond(
            "remove_ingredient",
            vec![reg_id.to_string(), ingredient_id.to_string()],
        )
    }

    async fn list_products(&self, reg_id: &str) -> ApiResult {
        self.respond("list_products", vec![reg_id.to_string()])
    }

    async fn add_products_bulk(&self, reg_id: &str, file_url: &str) -> ApiResult {
        self.respond(
            "add_products_bulk",
            vec![reg_id.to_string(), file_url.to_string()],
        )
    }

    async fn remove_product(&self, reg_id: &str, product_id: &str) -> ApiResult {
        self.respond(
            "remove_product",
            vec![reg_id.to_string(), product_id.to_string()],
        )
    }

    async fn product_catalog(&self, reg_id: &str) -> ApiResult {
        self.respond("product_catalog", vec![reg_id.to_string()])
    }

    async fn register_factory_products(
        &self,
        factory_id: &str,
        product_ids: &[String],
    ) -> ApiResult {
        let mut args = vec![factory_id.to_string()];
        args.extend(product_ids.iter().cloned());
        self.respond("register_factory_products", args)
    }

    async fn list_layouts(&self, reg_id: &str) -> ApiResult {
        self.respond("list_layouts", vec![reg_id.to_string()])
    }

    async fn add_layout(&self, reg_id: &str, file_url: &str, label: &str) -> ApiResult {
        self.respond(
            "add_layout",
            vec![reg_id.to_string(), file_url.to_string(), label.to_string()],
        )
    }

    async fn remove_layout(&self, reg_id: &str, layout_id: &str) -> ApiResult {
        self.respond(
            "remove_layout",
            vec![reg_id.to_string(), layout_id.to_string()],
        )
    }

    async fn list_flow_diagrams(&self, reg_id: &str) -> ApiResult {
        self.respond("list_flow_diagrams", vec![reg_id.to_string()])
    }

    async fn add_flow_diagram(&self, reg_id: &str, file_url: &str, label: &str) -> ApiResult {
        self.respond(
            "add_flow_diagram",
            vec![reg_id.to_string(), file_url.to_string(), label.to_string()],
        )
    }

    async fn remove_flow_diagram(&self, reg_id: &str, diagram_id: &str) -> ApiResult {
        self.respond(
            "remove_flow_diagram",
            vec![reg_id.to_string(), diagram_id.to_string()],
        )
    }

    async fn list_team_members(&self, reg_id: &str) -> ApiResult {
        self.respond("list_team_members", vec![reg_id.to_string()])
    }

    async fn add_team_member(&self, reg_id: &str, member: &TeamMember) -> ApiResult {
        self.respond(
            "add_team_member",
            vec![reg_id.to_string(), member.nama.clone()],
        )
    }

    async fn remove_team_member(&self, reg_id: &str, member_id: &str) -> ApiResult {
        self.respond(
            "remove_team_member",
            vec![reg_id.to_string(), member_id.to_string()],
        )
    }

    async fn list_evaluation_docs(&self, reg_id: &str) -> ApiResult {
        self.respond("list_evaluation_docs", vec![reg_id.to_string()])
    }

    async fn add_evaluation_doc(&self, reg_id: &str, file_url: &str, label: &str) -> ApiResult {
        self.respond(
            "add_evaluation_doc",
            vec![reg_id.to_string(), file_url.to_string(), label.to_string()],
        )
    }

    async fn remove_evaluation_doc(&self, reg_id: &str, doc_id: &str) -> ApiResult {
        self.respond(
            "remove_evaluation_doc",
            vec![reg_id.to_string(), doc_id.to_string()],
        )
    }

    async fn list_signatures(&self, reg_id: &str) -> ApiResult {
        self.respond("list_signatures", vec![reg_id.to_string()])
    }

    async fn add_signature(&self, reg_id: &str, signature: &SignaturePayload) -> ApiResult {
        self.respond(
            "add_signature",
            vec![reg_id.to_string(), signature.nama_penyelia.clone()],
        )
    }

    async fn remove_signature(&self, reg_id: &str, signature_id: &str) -> ApiResult {
        self.respond(
            "remove_signature",
            vec![reg_id.to_string(), signature_id.to_string()],
        )
    }

    async fn list_factories(&self) -> ApiResult {
        self.respond("list_factories", vec![])
    }

    async fn create_factory(&self, factory: &FactoryPayload) -> ApiResult {
        self.respond("create_factory", vec![factory.nama_pabrik.clone()])
    }

    async fn remove_factory(&self, factory_id: &str) -> ApiResult {
        self.respond("remove_factory", vec![factory_id.to_string()])
    }

    async fn attach_factory(&self, reg_id: &str, factory_id: &str) -> ApiResult {
        self.respond(
            "attach_factory",
            vec![reg_id.to_string(), factory_id.to_string()],
        )
    }

    async fn provinces(&self) -> ApiResult {
        self.respond("provinces", vec![])
    }

    async fn districts(&self, province_code: &str) -> ApiResult {
        self.respond("districts", vec![province_code.to_string()])
    }

    async fn service_types(&self) -> ApiResult {
        self.respond("service_types", vec![])
    }

    async fn factory_statuses(&self) -> ApiResult {
        self.respond("factory_statuses", vec![])
    }

    async fn product_filter(&self, service_code: &str) -> ApiResult {
        self.respond("product_filter", vec![service_code.to_string()])
    }

    async fn lph_list(&self, service_code: &str) -> ApiResult {
        self.respond("lph_list", vec![service_code.to_string()])
    }

    async fn final_submit(&self, reg_id: &str) -> ApiResult {
        self.respond("final_submit", vec![reg_id.to_string()])
    }
}
