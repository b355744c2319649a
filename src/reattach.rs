//! Reference-driven reattach mode.
//!
//! Items that link to a standalone document get the document's file
//! attached directly; the link is removed and the document retired.

use crate::backend::ListQuery;
use crate::config::Options;
use crate::execute::Executor;
use crate::item::{Field, ItemDetail, ItemSummary};
use crate::matcher::strip_item_suffix;
use crate::outcome::{
    DocumentRef, Failure, FailureKind, ItemRef, Ledger, Plan, Reattachment, ReferenceField,
    SkipReason, Skipped,
};
use crate::prompt::Prompter;
use crate::report::{self, RunOutcome, RunKind};
use crate::validation::sanitize_attachment_name;
use crate::{Backend, Result};

/// Runs reattach mode.
///
/// Listing the vault is the only step whose failure aborts the run; every
/// other failure ends up in the returned ledger.
///
/// # Example
///
/// ```
/// use docreattach::backends::mock::{self, MockBackend};
/// use docreattach::prompt::ScriptedPrompter;
/// use docreattach::{reattach, Options};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> docreattach::Result<()> {
///     let mut backend = MockBackend::new();
///     backend.insert_document("doc1", "scan.pdf - Bank", "scan.pdf", b"%PDF").await;
///     let mut bank = mock::item("itm1", "Bank", "LOGIN");
///     bank.fields.push(mock::reference("ref1", "doc1"));
///     backend.insert(bank).await;
///
///     let reports = tempfile::tempdir()?;
///     let options = Options {
///         report_dir: reports.path().to_path_buf(),
///         ..Default::default()
///     };
///     let outcome = reattach::run(&mut backend, &mut ScriptedPrompter::default(), &options).await?;
///     assert_eq!(outcome.ledger.reattached.len(), 1);
///     Ok(())
/// }
/// ```
pub async fn run(
    backend: &mut dyn Backend,
    prompter: &mut dyn Prompter,
    options: &Options,
) -> Result<RunOutcome> {
    let mut ledger = Ledger::default();

    let plan = {
        let mut planner = Planner {
            backend: &*backend,
            prompter: &mut *prompter,
            options,
        };
        planner.plan(&mut ledger).await?
    };

    if plan.reattachments.is_empty() {
        println!("No documents to reattach.");
        report::print_summary(&ledger, RunKind::Reattach, options);
        return Ok(RunOutcome {
            ledger,
            report: None,
        });
    }

    if options.dry_run {
        println!("DRY RUN: No changes will be made.");
    }

    if options.confirm_before_modifying {
        report::print_reattach_plan(&plan);
        if !prompter.confirm("Shall I continue and reattach all documents?", true)? {
            println!("Cancelling. No changes made.");
            ledger.cancelled = true;
            return Ok(RunOutcome {
                ledger,
                report: None,
            });
        }
    }

    let groups = plan.reattachments_by_document();
    tracing::info!(
        documents = groups.len(),
        reattachments = plan.reattachments.len(),
        "Step 2 of 2: reattaching documents"
    );

    let mut executor = Executor::new(backend, options);
    for (document, group) in &groups {
        executor.reattach_document(document, group, &mut ledger).await;
    }

    report::print_summary(&ledger, RunKind::Reattach, options);
    let path = report::write_report(&ledger, RunKind::Reattach, &options.report_dir)?;
    Ok(RunOutcome {
        ledger,
        report: Some(path),
    })
}

/// Read-only phase: decides which documents to reattach to which items.
struct Planner<'a> {
    backend: &'a dyn Backend,
    prompter: &'a mut dyn Prompter,
    options: &'a Options,
}

impl Planner<'_> {
    async fn plan(&mut self, ledger: &mut Ledger) -> Result<Plan> {
        let listing = self.backend.list_items(&ListQuery::active()).await?;
        if self.options.verbose {
            report::print_inventory(&listing);
        }

        let mut candidates: Vec<&ItemSummary> = Vec::new();
        for summary in listing.iter().filter(|i| !i.category.is_document()) {
            match self.options.filters.screen_item(&summary.title, &summary.tags) {
                Some(reason) => ledger.skip(
                    reason,
                    Skipped {
                        item: summary.title.clone(),
                        ..Default::default()
                    },
                ),
                None => candidates.push(summary),
            }
        }

        if let Some(max) = self.options.max_items {
            if candidates.len() > max {
                tracing::info!(max, total = candidates.len(), "limiting number of items checked");
                candidates.truncate(max);
            }
        }

        tracing::info!(
            items = candidates.len(),
            "Step 1 of 2 (no changes being made): checking items for linked documents"
        );

        let mut plan = Plan::default();
        for summary in candidates {
            self.check_item(summary, &mut plan, ledger).await?;
        }
        Ok(plan)
    }

    async fn check_item(
        &mut self,
        summary: &ItemSummary,
        plan: &mut Plan,
        ledger: &mut Ledger,
    ) -> Result<()> {
        let item = match self.backend.get_item(&summary.id).await {
            Ok(item) => item,
            Err(e) => {
                ledger.fail(
                    FailureKind::GetItem,
                    Failure {
                        item: summary.title.clone(),
                        error: e.to_string(),
                        ..Default::default()
                    },
                );
                return Ok(());
            }
        };

        let references: Vec<&Field> = item.references().collect();
        if references.is_empty() {
            return Ok(());
        }

        let item_link = if self.options.generate_share_links {
            match self.backend.share_link(&item.id, &item.vault.id).await {
                Ok(link) => link,
                Err(e) => {
                    ledger.fail(
                        FailureKind::ItemLink,
                        Failure {
                            item: item.title.clone(),
                            error: e.to_string(),
                            ..Default::default()
                        },
                    );
                    return Ok(());
                }
            }
        } else {
            String::new()
        };

        tracing::debug!(item = %item.title, references = references.len(), "processing item");
        for field in references {
            self.check_reference(&item, field, &item_link, plan, ledger)
                .await?;
        }
        Ok(())
    }

    /// Decides what to do with one reference field.
    ///
    /// Only a failing prompt is returned as an error.
    async fn check_reference(
        &mut self,
        item: &ItemDetail,
        field: &Field,
        item_link: &str,
        plan: &mut Plan,
        ledger: &mut Ledger,
    ) -> Result<()> {
        let skipped = |document: &str| Skipped {
            item: item.title.clone(),
            document: document.to_string(),
            item_link: item_link.to_string(),
        };

        let target = field.value.as_deref().unwrap_or_default();
        let document = match self.backend.get_item(target).await {
            Ok(document) => document,
            Err(e) => {
                let label = field.label.as_deref().unwrap_or(target);
                ledger.fail(
                    FailureKind::CheckDocument,
                    Failure {
                        item: item.title.clone(),
                        document: label.to_string(),
                        item_link: item_link.to_string(),
                        error: e.to_string(),
                    },
                );
                return Ok(());
            }
        };

        if let Some(reason) = self.options.filters.screen_document(&document.title) {
            ledger.skip(reason, skipped(&document.title));
            return Ok(());
        }

        if !document.category.is_document() {
            ledger.skip(SkipReason::NotADocument, skipped(&document.title));
            return Ok(());
        }

        let display_name = sanitize_attachment_name(&strip_item_suffix(&document.title, &item.title));
        let files = document.attached_files();
        let file = match files.as_slice() {
            [file] => *file,
            [] => {
                ledger.skip(SkipReason::NoFiles, skipped(&display_name));
                return Ok(());
            }
            _ => {
                ledger.skip(SkipReason::MoreThanOneFile, skipped(&display_name));
                return Ok(());
            }
        };

        if self.options.supervise {
            println!("-- Processing: {}", display_name);
            if !item_link.is_empty() {
                println!("---- {}", item_link);
            }
            let question = format!(
                "---- Shall I continue and reattach '{}' to '{}'?",
                display_name, item.title
            );
            if !self.prompter.confirm(&question, true)? {
                ledger.skip(SkipReason::UserSkipped, skipped(&display_name));
                return Ok(());
            }
        }

        tracing::debug!(document = %display_name, item = %item.title, "planning reattachment");
        plan.reattachments.push(Reattachment {
            document: DocumentRef {
                id: document.id.clone(),
                vault_id: document.vault.id.clone(),
                title: document.title.clone(),
                tags: document.tags.clone(),
            },
            item: ItemRef {
                id: item.id.clone(),
                vault_id: item.vault.id.clone(),
                title: item.title.clone(),
                tags: item.tags.clone(),
            },
            display_name,
            label: sanitize_attachment_name(&file.name),
            reference: Some(ReferenceField {
                section: field.section_label().map(str::to_string),
                field_id: field.id.clone(),
            }),
            item_link: item_link.to_string(),
            fuzzy: false,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::{self, MockBackend};
    use crate::prompt::ScriptedPrompter;

    async fn vault() -> MockBackend {
        let backend = MockBackend::new();
        backend
            .insert_document("doc1", "statement.pdf - Bank", "statement.pdf", b"12345")
            .await;
        let mut bank = mock::item("itm1", "Bank", "LOGIN");
        bank.fields.push(mock::reference("ref1", "doc1"));
        backend.insert(bank).await;
        backend
    }

    fn options(dir: &tempfile::TempDir) -> Options {
        Options {
            report_dir: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_plan_only_touches_nothing() {
        let backend = vault().await;
        let dir = tempfile::tempdir().unwrap();
        let options = options(&dir);
        let mut prompter = ScriptedPrompter::default();
        let mut ledger = Ledger::default();

        let plan = Planner {
            backend: &backend,
            prompter: &mut prompter,
            options: &options,
        }
        .plan(&mut ledger)
        .await
        .unwrap();

        assert_eq!(plan.reattachments.len(), 1);
        let r = &plan.reattachments[0];
        assert_eq!(r.display_name, "statement.pdf");
        assert_eq!(r.label, "statement.pdf");
        assert_eq!(
            r.reference,
            Some(ReferenceField {
                section: Some("Related Items".to_string()),
                field_id: "ref1".to_string(),
            })
        );
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_reference_to_non_document_is_skipped() {
        let backend = MockBackend::new();
        backend.insert(mock::item("other", "Email", "LOGIN")).await;
        let mut bank = mock::item("itm1", "Bank", "LOGIN");
        bank.fields.push(mock::reference("ref1", "other"));
        backend.insert(bank).await;

        let dir = tempfile::tempdir().unwrap();
        let options = options(&dir);
        let mut prompter = ScriptedPrompter::default();
        let mut ledger = Ledger::default();
        let plan = Planner {
            backend: &backend,
            prompter: &mut prompter,
            options: &options,
        }
        .plan(&mut ledger)
        .await
        .unwrap();

        assert!(plan.reattachments.is_empty());
        assert_eq!(ledger.skipped[&SkipReason::NotADocument].len(), 1);
    }

    #[tokio::test]
    async fn test_supervised_decline_skips_document() {
        let backend = vault().await;
        let dir = tempfile::tempdir().unwrap();
        let options = Options {
            supervise: true,
            ..options(&dir)
        }
        .normalized();
        let mut prompter = ScriptedPrompter::new(["n"]);
        let mut ledger = Ledger::default();

        let plan = Planner {
            backend: &backend,
            prompter: &mut prompter,
            options: &options,
        }
        .plan(&mut ledger)
        .await
        .unwrap();

        assert!(plan.reattachments.is_empty());
        assert_eq!(ledger.skipped[&SkipReason::UserSkipped].len(), 1);
        assert_eq!(
            prompter.asked,
            vec!["---- Shall I continue and reattach 'statement.pdf' to 'Bank'?"]
        );
    }

    #[tokio::test]
    async fn test_max_items_caps_checked_items() {
        let backend = vault().await;
        let mut second = mock::item("itm2", "Card", "CREDIT_CARD");
        second.fields.push(mock::reference("ref1", "doc1"));
        backend.insert(second).await;

        let dir = tempfile::tempdir().unwrap();
        let options = Options {
            max_items: Some(1),
            ..options(&dir)
        };
        let mut prompter = ScriptedPrompter::default();
        let mut ledger = Ledger::default();
        let plan = Planner {
            backend: &backend,
            prompter: &mut prompter,
            options: &options,
        }
        .plan(&mut ledger)
        .await
        .unwrap();

        assert_eq!(plan.reattachments.len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_to_do_writes_no_report() {
        let mut backend = MockBackend::new();
        backend.insert(mock::item("itm1", "Bank", "LOGIN")).await;
        let dir = tempfile::tempdir().unwrap();
        let options = options(&dir);

        let outcome = run(&mut backend, &mut ScriptedPrompter::default(), &options)
            .await
            .unwrap();

        assert!(outcome.report.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_listing_failure_aborts() {
        let mut backend = MockBackend::new();
        backend.list_error = Some(crate::ReattachError::NotAuthenticated);
        let dir = tempfile::tempdir().unwrap();

        let result = run(&mut backend, &mut ScriptedPrompter::default(), &options(&dir)).await;
        assert!(result.is_err());
    }
}
