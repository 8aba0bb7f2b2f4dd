//! The final-submit gate: the portal's final endpoint is called iff all six
//! sections read done, and a blocked dispatch enumerates the laggards by
//! name.

use serde_json::json;
use std::sync::Arc;

use halal_sync::certportal::{ApiResult, MockCertPortal};
use halal_sync::store::{SectionKind, SectionStatus};
use halal_sync::{
    DispatchOutcome, FinalDispatcher, InMemoryStore, Submission, SubmissionStore, SubmitStatus,
};

async fn seed(store: &InMemoryStore, mut record: Submission) -> String {
    let id = record.id.clone();
    record.reg_id = Some("REG-1".to_string());
    store.upsert(record).await.unwrap();
    id
}

fn all_done() -> Submission {
    let mut record = Submission::new("JF-1".to_string(), Vec::new());
    for kind in SectionKind::ALL {
        record.section_mut(kind).status = SectionStatus::Done;
    }
    record
}

#[tokio::test]
async fn all_sections_done_dispatches_final_submit() {
    let store = Arc::new(InMemoryStore::new());
    let portal = Arc::new(MockCertPortal::new());
    let id = seed(&store, all_done()).await;

    let dispatcher = FinalDispatcher::new(store.clone(), portal.clone());
    let outcome = dispatcher.dispatch(&id).await.unwrap();

    assert_eq!(outcome, DispatchOutcome::Submitted);
    assert_eq!(portal.call_count("final_submit"), 1);
    let record = store.get(&id).await.unwrap();
    assert_eq!(record.status_submit, SubmitStatus::Sent);
}

#[tokio::test]
async fn one_failed_section_blocks_dispatch_and_names_it() {
    let store = Arc::new(InMemoryStore::new());
    let portal = Arc::new(MockCertPortal::new());

    let mut record = all_done();
    record.section_mut(SectionKind::Bahan).status = SectionStatus::Failed;
    let id = seed(&store, record).await;

    let dispatcher = FinalDispatcher::new(store.clone(), portal.clone());
    let outcome = dispatcher.dispatch(&id).await.unwrap();

    assert_eq!(
        outcome,
        DispatchOutcome::Blocked {
            incomplete: vec!["Bahan"]
        }
    );
    // The remote call never happened.
    assert_eq!(portal.call_count("final_submit"), 0);
}

#[tokio::test]
async fn untouched_record_reports_every_section() {
    let store = Arc::new(InMemoryStore::new());
    let portal = Arc::new(MockCertPortal::new());
    let id = seed(&store, Submission::new("JF-2".to_string(), Vec::new())).await;

    let dispatcher = FinalDispatcher::new(store.clone(), portal.clone());
    let outcome = dispatcher.dispatch(&id).await.unwrap();

    match outcome {
        DispatchOutcome::Blocked { incomplete } => assert_eq!(incomplete.len(), 6),
        other => panic!("expected blocked, got {other:?}"),
    }
    assert_eq!(portal.call_count("final_submit"), 0);
}

#[tokio::test]
async fn portal_rejection_is_reported_not_swallowed() {
    let store = Arc::new(InMemoryStore::new());
    let portal = Arc::new(MockCertPortal::new());
    portal.stub(
        "final_submit",
        ApiResult::failure(409, "Registrasi sudah dikirim", Some(json!({}))),
    );
    let id = seed(&store, all_done()).await;

    let dispatcher = FinalDispatcher::new(store, portal.clone());
    let outcome = dispatcher.dispatch(&id).await.unwrap();

    assert_eq!(
        outcome,
        DispatchOutcome::Rejected {
            status: 409,
            message: "Registrasi sudah dikirim".to_string()
        }
    );
}
