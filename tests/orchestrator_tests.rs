//! Batch behavior of the submission orchestrator: token-expiry isolation,
//! per-record error containment, and the SENT/FAILED status gate.

use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};

use halal_sync::certportal::{ApiResult, MockCertPortal};
use halal_sync::store::{SectionKind, SectionStatus};
use halal_sync::{
    AnswerField, InMemoryStore, Notifier, SectionFilter, Submission, SubmissionFiles,
    SubmissionOrchestrator, SubmissionStore, SubmitOptions, SubmitStatus,
};

struct RecordingNotifier {
    notified: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn new() -> Self {
        Self {
            notified: Mutex::new(Vec::new()),
        }
    }

    fn notifications(&self) -> Vec<String> {
        self.notified.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_token_expired(&self, user_id: &str) {
        self.notified.lock().unwrap().push(user_id.to_string());
    }
}

fn answer(name: &str, value: &str) -> AnswerField {
    AnswerField {
        field_name: name.to_string(),
        label: name.to_string(),
        field_type: "control_textbox".to_string(),
        value: value.to_string(),
    }
}

struct Fixture {
    store: Arc<InMemoryStore>,
    portal: Arc<MockCertPortal>,
    notifier: Arc<RecordingNotifier>,
    files: SubmissionFiles,
    _dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self {
            store: Arc::new(InMemoryStore::new()),
            portal: Arc::new(MockCertPortal::new()),
            notifier: Arc::new(RecordingNotifier::new()),
            files: SubmissionFiles::new(dir.path()),
            _dir: dir,
        }
    }

    fn orchestrator(&self) -> SubmissionOrchestrator {
        SubmissionOrchestrator::new(
            self.store.clone(),
            self.portal.clone(),
            self.files.clone(),
            self.notifier.clone(),
        )
    }

    /// A record whose registration the portal still recognizes.
    async fn seed_live_record(&self, payload: Vec<AnswerField>) -> String {
        let mut record = Submission::new("JF-100".to_string(), payload);
        record.reg_id = Some("REG-100".to_string());
        let id = record.id.clone();
        self.store.upsert(record).await.unwrap();
        self.portal.stub(
            "registration_detail",
            ApiResult::ok(200, Some(json!({"id_reg": "REG-100", "status": "DRAFT"})), "OK"),
        );
        id
    }
}

#[tokio::test]
async fn unauthorized_token_halts_batch_with_one_notification() {
    let fixture = Fixture::new();
    fixture.portal.stub(
        "pelaku_usaha_profile",
        ApiResult::failure(401, "Expired token", None),
    );

    let first = Submission::new("JF-1".to_string(), Vec::new());
    let second = Submission::new("JF-2".to_string(), Vec::new());
    let ids = vec![first.id.clone(), second.id.clone()];
    fixture.store.upsert(first).await.unwrap();
    fixture.store.upsert(second).await.unwrap();

    let report = fixture
        .orchestrator()
        .run(SubmitOptions {
            record_ids: ids.clone(),
            user_id: Some("user-7".to_string()),
            filter: SectionFilter::All,
        })
        .await;

    assert!(report.halted_for_token);
    assert_eq!(report.processed, 0);
    // One notification for the owning user, not one per record.
    assert_eq!(fixture.notifier.notifications(), vec!["user-7"]);
    // No record was touched: no draft was ever attempted.
    assert_eq!(fixture.portal.call_count("submit_draft"), 0);
    for id in &ids {
        let record = fixture.store.get(id).await.unwrap();
        assert_eq!(record.status_submit, SubmitStatus::Active);
    }
}

#[tokio::test]
async fn record_level_failure_is_contained_and_batch_continues() {
    let fixture = Fixture::new();
    let live_id = fixture.seed_live_record(Vec::new()).await;

    let report = fixture
        .orchestrator()
        .run(SubmitOptions {
            record_ids: vec!["no-such-record".to_string(), live_id.clone()],
            user_id: None,
            filter: SectionFilter::Only(SectionKind::Produk),
        })
        .await;

    assert_eq!(report.errored, 1);
    assert_eq!(report.processed, 1);
    assert!(!report.halted_for_token);

    // The healthy record was still driven through its section.
    let record = fixture.store.get(&live_id).await.unwrap();
    assert_ne!(record.section(SectionKind::Produk).status, SectionStatus::New);
}

#[tokio::test]
async fn targeted_rerun_of_last_failed_section_promotes_to_sent() {
    let fixture = Fixture::new();

    let payload = vec![
        answer("berkas_daftar_bahan", "bahan.xlsx"),
        answer("berkas_daftar_produk", "produk.xlsx"),
    ];
    let mut record = Submission::new("JF-100".to_string(), payload);
    record.reg_id = Some("REG-100".to_string());
    record.pabrik_id = Some("PAB-1".to_string());
    for kind in SectionKind::ALL {
        record.section_mut(kind).status = SectionStatus::Done;
    }
    record.section_mut(SectionKind::Bahan).status = SectionStatus::Failed;
    record
        .section_mut(SectionKind::Bahan)
        .notes
        .push("Gagal menambahkan daftar bahan: Validasi gagal (Status: 422)".to_string());
    let id = record.id.clone();
    fixture.store.upsert(record).await.unwrap();

    fixture.portal.stub(
        "registration_detail",
        ApiResult::ok(200, Some(json!({"id_reg": "REG-100"})), "OK"),
    );
    fixture
        .files
        .write("JF-100", "bahan.xlsx", b"workbook")
        .await
        .unwrap();
    fixture
        .files
        .write("JF-100", "produk.xlsx", b"workbook")
        .await
        .unwrap();

    let report = fixture
        .orchestrator()
        .run(SubmitOptions {
            record_ids: vec![id.clone()],
            user_id: None,
            filter: SectionFilter::Only(SectionKind::Bahan),
        })
        .await;

    assert_eq!(report.processed, 1);
    let record = fixture.store.get(&id).await.unwrap();
    assert_eq!(record.section(SectionKind::Bahan).status, SectionStatus::Done);
    assert!(record.section(SectionKind::Bahan).notes.is_empty());
    assert_eq!(record.status_submit, SubmitStatus::Sent);
}

#[tokio::test]
async fn bahan_validation_errors_surface_verbatim_in_notes() {
    let fixture = Fixture::new();
    let payload = vec![
        answer("berkas_daftar_bahan", "bahan.xlsx"),
        answer("berkas_daftar_produk", "produk.xlsx"),
    ];
    let id = fixture.seed_live_record(payload).await;

    let mut record = fixture.store.get(&id).await.unwrap();
    record.pabrik_id = Some("PAB-1".to_string());
    fixture.store.upsert(record).await.unwrap();

    fixture
        .files
        .write("JF-100", "bahan.xlsx", b"workbook")
        .await
        .unwrap();
    fixture
        .files
        .write("JF-100", "produk.xlsx", b"workbook")
        .await
        .unwrap();

    // First upload in the section is the ingredient workbook.
    fixture.portal.enqueue(
        "upload_file",
        ApiResult::failure(
            422,
            "Validasi gagal",
            Some(json!(["Nama bahan kosong"])),
        ),
    );

    fixture
        .orchestrator()
        .run(SubmitOptions {
            record_ids: vec![id.clone()],
            user_id: None,
            filter: SectionFilter::Only(SectionKind::Bahan),
        })
        .await;

    let record = fixture.store.get(&id).await.unwrap();
    let bahan = record.section(SectionKind::Bahan);
    assert_eq!(bahan.status, SectionStatus::Failed);
    assert!(bahan
        .notes
        .iter()
        .any(|note| note.contains("Nama bahan kosong")));
    assert_eq!(record.status_submit, SubmitStatus::Failed);
}

#[tokio::test]
async fn missing_team_workbook_fails_only_that_section() {
    let fixture = Fixture::new();
    let id = fixture.seed_live_record(Vec::new()).await;

    fixture
        .orchestrator()
        .run(SubmitOptions {
            record_ids: vec![id.clone()],
            user_id: None,
            filter: SectionFilter::Only(SectionKind::Komitmen),
        })
        .await;

    let record = fixture.store.get(&id).await.unwrap();
    let komitmen = record.section(SectionKind::Komitmen);
    assert_eq!(komitmen.status, SectionStatus::Failed);
    assert!(komitmen
        .notes
        .iter()
        .any(|note| note.contains("Berkas tim halal")));
    // Other sections keep their state.
    assert_eq!(record.section(SectionKind::Bahan).status, SectionStatus::New);
}
