//! Integration tests for the two-phase secure retrieval flow.
//!
//! Run with:
//!   cargo test --test test_retrieval

use std::sync::Arc;

use tempfile::TempDir;

use clearance::audit::AuditLog;
use clearance::policy::{Role, Sensitivity, permitted_labels};
use clearance::retrieval::{RetrievalConfig, SearchOutcome, SecureRetriever};
use clearance::store::{ChunkMeta, DocStore};

// ── helpers ──────────────────────────────────────────────────────────────────

fn setup() -> (TempDir, Arc<DocStore>, Arc<AuditLog>, SecureRetriever) {
    let tmp = TempDir::new().expect("tempdir");
    let store = Arc::new(DocStore::open(&tmp.path().join("index")).expect("open store"));
    let audit = Arc::new(AuditLog::open(&tmp.path().join("audit")).expect("open audit"));
    let retriever = SecureRetriever::new(store.clone(), audit.clone(), RetrievalConfig::default());
    (tmp, store, audit, retriever)
}

fn add_chunk(store: &DocStore, id: &str, text: &str, source: &str, sensitivity: Sensitivity) {
    store
        .add(
            &[text.to_string()],
            &[ChunkMeta { source: source.to_string(), sensitivity }],
            &[id.to_string()],
        )
        .expect("add chunk");
}

// ── filter round-trip ─────────────────────────────────────────────────────────

#[test]
fn high_chunk_visible_to_admin_filter_never_to_junior_filter() {
    let (_tmp, store, _audit, _r) = setup();
    add_chunk(&store, "h1", "acquisition target shortlist", "mna.pdf", Sensitivity::High);

    let admin = store
        .query("acquisition shortlist", 3, Some(permitted_labels(Role::Admin)))
        .expect("admin query");
    assert_eq!(admin.matches.len(), 1);

    // Best semantic match or not, the junior filter never returns it.
    let junior = store
        .query("acquisition shortlist", 3, Some(permitted_labels(Role::Junior)))
        .expect("junior query");
    assert!(junior.is_empty());
}

// ── blocked data is denied, not hidden ────────────────────────────────────────

#[test]
fn lone_high_chunk_denies_junior_with_audit_event() {
    let (_tmp, store, audit, retriever) = setup();
    add_chunk(&store, "h1", "severance agreement for departing executive", "legal.pdf", Sensitivity::High);

    let outcome = retriever
        .search("jo", Role::Junior, "severance agreement")
        .expect("search");
    assert!(matches!(outcome, SearchOutcome::Denied));

    let events = audit.list().expect("list");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, "DENIED_SECURITY");
    assert_eq!(events[0].action, "Search");
    assert_eq!(events[0].role, "Junior Auditor");
    // The log records the question, never retrieved text.
    assert_eq!(events[0].detail, "severance agreement");
}

// ── empty store is no-data, not denial ────────────────────────────────────────

#[test]
fn empty_store_is_no_data_for_every_role() {
    let (_tmp, _store, audit, retriever) = setup();

    for (actor, role) in [("jo", Role::Junior), ("max", Role::Manager), ("ada", Role::Admin)] {
        let outcome = retriever
            .search(actor, role, "anything at all")
            .expect("search");
        assert!(matches!(outcome, SearchOutcome::NoData), "role {:?}", role);
    }

    let events = audit.list().expect("list");
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.outcome == "No Data"));
}

// ── permitted match succeeds with content ─────────────────────────────────────

#[test]
fn junior_retrieves_permitted_low_chunk() {
    let (_tmp, store, audit, retriever) = setup();
    add_chunk(&store, "l1", "the travel policy allows economy class flights", "policy.txt", Sensitivity::Low);

    let outcome = retriever
        .search("jo", Role::Junior, "travel policy flights")
        .expect("search");
    let result = match outcome {
        SearchOutcome::Success(result) => result,
        other => panic!("expected success, got {other:?}"),
    };
    assert_eq!(result.matches[0].text, "the travel policy allows economy class flights");
    assert_eq!(result.sources(), vec!["policy.txt"]);

    assert_eq!(audit.list().expect("list")[0].outcome, "Allowed");
}

// ── mixed store: filter picks the permitted match ─────────────────────────────

#[test]
fn manager_sees_medium_but_not_high() {
    let (_tmp, store, _audit, retriever) = setup();
    add_chunk(&store, "m1", "budget forecast for next quarter", "forecast.txt", Sensitivity::Medium);
    add_chunk(&store, "h1", "board-only budget contingency plan", "board.pdf", Sensitivity::High);

    let outcome = retriever
        .search("max", Role::Manager, "budget")
        .expect("search");
    let result = match outcome {
        SearchOutcome::Success(result) => result,
        other => panic!("expected success, got {other:?}"),
    };
    assert!(result.matches.iter().all(|m| m.sensitivity <= Sensitivity::Medium));
    assert!(result.matches.iter().any(|m| m.id == "m1"));
    assert!(!result.matches.iter().any(|m| m.id == "h1"));
}

// ── audit trail accumulates across searches ───────────────────────────────────

#[test]
fn sequential_searches_accumulate_newest_first() {
    let (_tmp, store, audit, retriever) = setup();
    add_chunk(&store, "l1", "expense policy details", "policy.txt", Sensitivity::Low);

    retriever.search("jo", Role::Junior, "expense policy").expect("first");
    retriever.search("jo", Role::Junior, "missing topic entirely").expect("second");

    let events = audit.list().expect("list");
    assert_eq!(events.len(), 2);
    for pair in events.windows(2) {
        assert!(pair[0].timestamp >= pair[1].timestamp);
    }
    let outcomes: Vec<&str> = events.iter().map(|e| e.outcome.as_str()).collect();
    assert!(outcomes.contains(&"Allowed"));
    assert!(outcomes.contains(&"No Data"));
}
