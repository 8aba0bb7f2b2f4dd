//! Factory resolution inside the DataPengajuan section: master-data code
//! lookups, the missing-fields failure message, and create-then-attach.

use serde_json::json;
use std::sync::Arc;

use halal_sync::certportal::{ApiResult, MockCertPortal};
use halal_sync::store::{SectionKind, SectionStatus};
use halal_sync::{
    AnswerField, InMemoryStore, LogNotifier, SectionFilter, Submission, SubmissionFiles,
    SubmissionOrchestrator, SubmissionStore, SubmitOptions,
};

fn answer(name: &str, value: &str) -> AnswerField {
    AnswerField {
        field_name: name.to_string(),
        label: name.to_string(),
        field_type: "control_textbox".to_string(),
        value: value.to_string(),
    }
}

fn factory_payload() -> Vec<AnswerField> {
    vec![
        answer("nama_perusahaan", "PT Pangan Sejahtera"),
        answer("jenis_layanan", "Reguler"),
        answer("jenis_produk", "Makanan Olahan"),
        answer("nama_lph", "LPH Utama"),
        answer("nama_pabrik", "Pabrik Cikarang"),
        answer("alamat_pabrik", "Jl. Industri 12"),
        answer("kota_pabrik", "Bekasi"),
        answer("provinsi_pabrik", "Jawa Barat"),
        answer("status_pabrik", "Milik Sendiri"),
    ]
}

fn stub_masters(portal: &MockCertPortal) {
    portal.stub(
        "service_types",
        ApiResult::ok(200, Some(json!([{"code": "REG", "name": "Reguler"}])), "OK"),
    );
    portal.stub(
        "product_filter",
        ApiResult::ok(
            200,
            Some(json!([{"code": "P01", "name": "Makanan Olahan"}])),
            "OK",
        ),
    );
    portal.stub(
        "lph_list",
        ApiResult::ok(200, Some(json!([{"id": "L01", "name": "LPH Utama"}])), "OK"),
    );
    portal.stub(
        "provinces",
        ApiResult::ok(200, Some(json!([{"code": "32", "name": "JAWA BARAT"}])), "OK"),
    );
    portal.stub(
        "factory_statuses",
        ApiResult::ok(200, Some(json!([{"code": "MS", "name": "Milik Sendiri"}])), "OK"),
    );
}

struct Fixture {
    store: Arc<InMemoryStore>,
    portal: Arc<MockCertPortal>,
    files: SubmissionFiles,
    _dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self {
            store: Arc::new(InMemoryStore::new()),
            portal: Arc::new(MockCertPortal::new()),
            files: SubmissionFiles::new(dir.path()),
            _dir: dir,
        }
    }

    async fn run_data_pengajuan(&self, record: Submission) -> Submission {
        let id = record.id.clone();
        self.store.upsert(record).await.unwrap();

        let orchestrator = SubmissionOrchestrator::new(
            self.store.clone(),
            self.portal.clone(),
            self.files.clone(),
            Arc::new(LogNotifier),
        );
        orchestrator
            .run(SubmitOptions {
                record_ids: vec![id.clone()],
                user_id: None,
                filter: SectionFilter::Only(SectionKind::DataPengajuan),
            })
            .await;

        self.store.get(&id).await.unwrap()
    }

    fn live_record(&self) -> Submission {
        self.portal.stub(
            "registration_detail",
            ApiResult::ok(200, Some(json!({"id_reg": "REG-1"})), "OK"),
        );
        let mut record = Submission::new("JF-1".to_string(), factory_payload());
        record.reg_id = Some("REG-1".to_string());
        record
    }
}

#[tokio::test]
async fn unknown_city_fails_factory_creation_naming_the_field() {
    let fixture = Fixture::new();
    stub_masters(&fixture.portal);
    // District table has no row for Bekasi.
    fixture.portal.stub(
        "districts",
        ApiResult::ok(200, Some(json!([{"code": "3204", "name": "BANDUNG"}])), "OK"),
    );

    let record = fixture.run_data_pengajuan(fixture.live_record()).await;

    assert_eq!(record.pabrik_id, None);
    let section = record.section(SectionKind::DataPengajuan);
    assert_eq!(section.status, SectionStatus::Failed);
    let factory_note = section
        .notes
        .iter()
        .find(|note| note.contains("Gagal membuat pabrik"))
        .expect("factory failure note present");
    assert!(factory_note.contains("city"));
    assert!(!factory_note.contains("province"));
    assert_eq!(fixture.portal.call_count("create_factory"), 0);
}

#[tokio::test]
async fn factory_is_created_looked_up_and_attached() {
    let fixture = Fixture::new();
    stub_masters(&fixture.portal);
    fixture.portal.stub(
        "districts",
        ApiResult::ok(200, Some(json!([{"code": "3216", "name": "BEKASI"}])), "OK"),
    );
    // First list: factory does not exist yet. Second list, after creation:
    // the new row shows up and its id is bound to the registration.
    fixture
        .portal
        .enqueue("list_factories", ApiResult::ok(200, Some(json!([])), "OK"));
    fixture.portal.enqueue(
        "list_factories",
        ApiResult::ok(
            200,
            Some(json!([{"id": "PAB-9", "nama_pabrik": "Pabrik Cikarang"}])),
            "OK",
        ),
    );

    let record = fixture.run_data_pengajuan(fixture.live_record()).await;

    assert_eq!(fixture.portal.call_count("create_factory"), 1);
    assert_eq!(fixture.portal.call_count("attach_factory"), 1);
    assert_eq!(record.pabrik_id.as_deref(), Some("PAB-9"));
    let section = record.section(SectionKind::DataPengajuan);
    assert_eq!(section.status, SectionStatus::Done);
}

#[tokio::test]
async fn existing_factory_is_reused_not_duplicated() {
    let fixture = Fixture::new();
    stub_masters(&fixture.portal);
    fixture.portal.stub(
        "districts",
        ApiResult::ok(200, Some(json!([{"code": "3216", "name": "BEKASI"}])), "OK"),
    );
    fixture.portal.stub(
        "list_factories",
        ApiResult::ok(
            200,
            Some(json!([{"id": "PAB-1", "nama_pabrik": "Pabrik Cikarang"}])),
            "OK",
        ),
    );

    let record = fixture.run_data_pengajuan(fixture.live_record()).await;

    assert_eq!(fixture.portal.call_count("create_factory"), 0);
    assert_eq!(fixture.portal.call_count("attach_factory"), 1);
    assert_eq!(record.pabrik_id.as_deref(), Some("PAB-1"));
}

#[tokio::test]
async fn certificate_and_responsible_person_are_put_independently() {
    let fixture = Fixture::new();
    stub_masters(&fixture.portal);
    fixture.portal.stub(
        "districts",
        ApiResult::ok(200, Some(json!([{"code": "3216", "name": "BEKASI"}])), "OK"),
    );
    fixture.portal.stub(
        "list_factories",
        ApiResult::ok(
            200,
            Some(json!([{"id": "PAB-1", "nama_pabrik": "Pabrik Cikarang"}])),
            "OK",
        ),
    );
    // Certificate PUT fails; the responsible-person PUT must still go out.
    fixture.portal.stub(
        "put_certificate",
        ApiResult::failure(422, "tgl_daftar tidak valid", None),
    );

    let record = fixture.run_data_pengajuan(fixture.live_record()).await;

    assert_eq!(fixture.portal.call_count("put_certificate"), 1);
    assert_eq!(fixture.portal.call_count("put_responsible_person"), 1);
    let section = record.section(SectionKind::DataPengajuan);
    assert_eq!(section.status, SectionStatus::Failed);
    assert!(section
        .notes
        .iter()
        .any(|note| note.contains("tgl_daftar tidak valid")));
}
