//! Reattach mode end-to-end against the mock backend.

#![cfg(feature = "mock")]

use docreattach::backends::mock::{self, MockBackend, MockCall};
use docreattach::filter::ListFilter;
use docreattach::item::ARCHIVED_STATE;
use docreattach::outcome::{FailureKind, SkipReason};
use docreattach::prompt::ScriptedPrompter;
use docreattach::{reattach, Options, ReattachError};
use tempfile::TempDir;

const TAG: &str = "linked docs reattached";

/// A vault with one statement linked from two items.
async fn shared_document_vault() -> MockBackend {
    let backend = MockBackend::new();
    backend
        .insert_document("doc1", "statement.pdf - Bank", "statement.pdf", b"12345")
        .await;

    let mut bank = mock::item("itm1", "Bank", "LOGIN");
    bank.fields.push(mock::reference("ref1", "doc1"));
    backend.insert(bank).await;

    let mut card = mock::item("itm2", "Card", "CREDIT_CARD");
    card.fields.push(mock::reference("ref9", "doc1"));
    backend.insert(card).await;

    backend
}

fn options(dir: &TempDir) -> Options {
    Options {
        report_dir: dir.path().to_path_buf(),
        ..Default::default()
    }
}

fn downloads(calls: &[MockCall]) -> usize {
    calls
        .iter()
        .filter(|c| matches!(c, MockCall::Download { .. }))
        .count()
}

fn deletes(calls: &[MockCall]) -> usize {
    calls
        .iter()
        .filter(|c| matches!(c, MockCall::Delete { .. }))
        .count()
}

#[tokio::test]
async fn test_shared_document_attached_to_both_items() {
    let mut backend = shared_document_vault().await;
    let dir = tempfile::tempdir().unwrap();

    let outcome = reattach::run(&mut backend, &mut ScriptedPrompter::default(), &options(&dir))
        .await
        .unwrap();

    assert_eq!(outcome.ledger.reattached.len(), 2);
    assert_eq!(outcome.ledger.reattached_document_count(), 1);
    assert_eq!(outcome.ledger.failed_count(), 0);

    for id in ["itm1", "itm2"] {
        let item = backend.item(id).await.unwrap();
        assert_eq!(item.files.len(), 1);
        assert_eq!(item.files[0].name, "statement.pdf");
        assert_eq!(item.files[0].size, 5);
        assert_eq!(item.references().count(), 0);
        assert_eq!(item.tags, vec![TAG]);
    }

    let document = backend.item("doc1").await.unwrap();
    assert_eq!(document.state.as_deref(), Some(ARCHIVED_STATE));
    assert_eq!(document.tags, vec![format!("{} deleted", TAG)]);

    let calls = backend.calls().await;
    assert_eq!(downloads(&calls), 1);
    assert_eq!(deletes(&calls), 1);

    let report = std::fs::read_to_string(outcome.report.unwrap()).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(
        lines,
        vec![
            "item,document,item link,status",
            "Bank,statement.pdf,,reattached",
            "Card,statement.pdf,,reattached",
        ]
    );
}

#[tokio::test]
async fn test_dry_run_leaves_vault_untouched() {
    let mut backend = shared_document_vault().await;
    let before: Vec<_> = snapshot(&backend).await;
    let dir = tempfile::tempdir().unwrap();
    let options = Options {
        dry_run: true,
        ..options(&dir)
    };

    let outcome = reattach::run(&mut backend, &mut ScriptedPrompter::default(), &options)
        .await
        .unwrap();

    assert_eq!(outcome.ledger.reattached.len(), 2);
    assert!(outcome.report.is_some());
    assert_eq!(snapshot(&backend).await, before);

    let calls = backend.calls().await;
    assert_eq!(deletes(&calls), 0);
    assert!(calls.iter().all(|c| match c {
        MockCall::Attach { dry_run, .. }
        | MockCall::SetTags { dry_run, .. }
        | MockCall::DeleteField { dry_run, .. } => *dry_run,
        MockCall::Download { .. } => true,
        MockCall::Delete { .. } => false,
    }));
}

async fn snapshot(backend: &MockBackend) -> Vec<docreattach::ItemDetail> {
    let mut items = Vec::new();
    for id in ["doc1", "itm1", "itm2"] {
        items.push(backend.item(id).await.unwrap());
    }
    items
}

#[tokio::test]
async fn test_cancel_makes_no_changes() {
    let mut backend = shared_document_vault().await;
    let dir = tempfile::tempdir().unwrap();
    let options = Options {
        confirm_before_modifying: true,
        ..options(&dir)
    };
    let mut prompter = ScriptedPrompter::new(["n"]);

    let outcome = reattach::run(&mut backend, &mut prompter, &options)
        .await
        .unwrap();

    assert!(outcome.ledger.cancelled);
    assert!(outcome.report.is_none());
    assert!(backend.calls().await.is_empty());
    assert_eq!(
        prompter.asked,
        vec!["Shall I continue and reattach all documents?"]
    );
}

#[tokio::test]
async fn test_attach_failure_keeps_document() {
    let mut backend = shared_document_vault().await;
    backend.attach_error = Some(ReattachError::CommandFailed("disk full".to_string()));
    let dir = tempfile::tempdir().unwrap();

    let outcome = reattach::run(&mut backend, &mut ScriptedPrompter::default(), &options(&dir))
        .await
        .unwrap();

    assert!(outcome.ledger.reattached.is_empty());
    assert_eq!(outcome.ledger.failed[&FailureKind::Reattach].len(), 2);
    assert_eq!(deletes(&backend.calls().await), 0);

    let document = backend.item("doc1").await.unwrap();
    assert!(document.state.is_none());
    assert_eq!(backend.item("itm1").await.unwrap().references().count(), 1);

    let report = std::fs::read_to_string(outcome.report.unwrap()).unwrap();
    assert!(report.contains("error: failed to reattach document: "));
}

#[tokio::test]
async fn test_one_failed_attach_keeps_shared_document() {
    let mut backend = shared_document_vault().await;
    backend.failing_attach_ids.insert("itm2".to_string());
    let dir = tempfile::tempdir().unwrap();

    let outcome = reattach::run(&mut backend, &mut ScriptedPrompter::default(), &options(&dir))
        .await
        .unwrap();

    let ledger = &outcome.ledger;
    assert_eq!(ledger.reattached.len(), 1);
    assert_eq!(ledger.reattached[0].item.id, "itm1");
    assert_eq!(ledger.failed[&FailureKind::Reattach].len(), 1);
    assert_eq!(ledger.failed[&FailureKind::Reattach][0].item, "Card");

    let bank = backend.item("itm1").await.unwrap();
    assert_eq!(bank.files.len(), 1);
    assert_eq!(bank.references().count(), 0);

    let card = backend.item("itm2").await.unwrap();
    assert!(card.files.is_empty());
    assert_eq!(card.references().count(), 1);

    let document = backend.item("doc1").await.unwrap();
    assert!(document.state.is_none());
    assert!(document.tags.is_empty());
    assert_eq!(deletes(&backend.calls().await), 0);
}

#[tokio::test]
async fn test_failed_unlink_keeps_shared_document() {
    let mut backend = shared_document_vault().await;
    backend.failing_unlink_ids.insert("itm2".to_string());
    let dir = tempfile::tempdir().unwrap();

    let outcome = reattach::run(&mut backend, &mut ScriptedPrompter::default(), &options(&dir))
        .await
        .unwrap();

    let ledger = &outcome.ledger;
    assert_eq!(ledger.reattached.len(), 1);
    assert_eq!(ledger.reattached[0].item.id, "itm1");
    assert_eq!(ledger.failed[&FailureKind::Reattach].len(), 1);

    // Card got its copy but still links the document
    let card = backend.item("itm2").await.unwrap();
    assert_eq!(card.files.len(), 1);
    assert_eq!(card.references().count(), 1);
    assert_eq!(backend.item("itm1").await.unwrap().files.len(), 1);

    assert!(backend.item("doc1").await.unwrap().state.is_none());
    assert_eq!(deletes(&backend.calls().await), 0);
}

#[tokio::test]
async fn test_tag_failure_does_not_block_deletion() {
    let mut backend = shared_document_vault().await;
    backend.tag_error = Some(ReattachError::CommandFailed("tag rejected".to_string()));
    let dir = tempfile::tempdir().unwrap();

    let outcome = reattach::run(&mut backend, &mut ScriptedPrompter::default(), &options(&dir))
        .await
        .unwrap();

    assert_eq!(outcome.ledger.reattached.len(), 2);
    assert_eq!(outcome.ledger.failed[&FailureKind::TagItem].len(), 2);
    assert_eq!(outcome.ledger.failed[&FailureKind::TagDocument].len(), 1);
    assert_eq!(deletes(&backend.calls().await), 1);
}

#[tokio::test]
async fn test_delete_docs_removes_document() {
    let mut backend = shared_document_vault().await;
    let dir = tempfile::tempdir().unwrap();
    let options = Options {
        archive_docs: false,
        ..options(&dir)
    };

    reattach::run(&mut backend, &mut ScriptedPrompter::default(), &options)
        .await
        .unwrap();

    assert!(backend.item("doc1").await.is_none());
}

#[tokio::test]
async fn test_filtered_and_unusable_documents_are_skipped() {
    let mut backend = shared_document_vault().await;

    let mut two_files = mock::item("doc2", "pair - Safe", "DOCUMENT");
    two_files.files.push(mock::file("a.pdf", 1));
    two_files.files.push(mock::file("b.pdf", 2));
    backend.insert(two_files).await;
    let mut safe = mock::item("itm3", "Safe", "SECURE_NOTE");
    safe.fields.push(mock::reference("ref1", "doc2"));
    backend.insert(safe).await;

    let dir = tempfile::tempdir().unwrap();
    let mut options = options(&dir);
    options.filters.items = ListFilter::new(vec![], vec!["card".to_string()]);

    let outcome = reattach::run(&mut backend, &mut ScriptedPrompter::default(), &options)
        .await
        .unwrap();

    let ledger = &outcome.ledger;
    assert_eq!(ledger.reattached.len(), 1);
    assert_eq!(ledger.reattached[0].item.title, "Bank");
    assert_eq!(ledger.skipped[&SkipReason::ItemBlacklisted].len(), 1);
    assert_eq!(ledger.skipped[&SkipReason::MoreThanOneFile].len(), 1);

    // Card was never touched
    let card = backend.item("itm2").await.unwrap();
    assert_eq!(card.references().count(), 1);
    assert!(card.files.is_empty());
}
