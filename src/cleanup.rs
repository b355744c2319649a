//! Cleanup of documents orphaned by the 1Password 7 upgrade.
//!
//! The upgrade split attachments into standalone documents titled
//! `<file> - <item title>`. Documents shaped like that are matched back to
//! their item by title: they are reattached, or removed when the item
//! already holds the file.

use crate::backend::ListQuery;
use crate::config::Options;
use crate::execute::Executor;
use crate::item::{ItemDetail, ItemSummary};
use crate::matcher::{already_attached, strip_item_suffix, upgrade_item_name, AttachedMatch};
use crate::outcome::{
    DocumentRef, Failure, FailureKind, ItemRef, Ledger, Plan, Reattachment, Removal,
    RemovalReason, SkipReason, Skipped,
};
use crate::prompt::Prompter;
use crate::report::{self, RunKind, RunOutcome};
use crate::validation::sanitize_attachment_name;
use crate::{Backend, Result};

/// Runs cleanup mode.
///
/// Only listing failures abort; everything else is recorded in the ledger.
pub async fn run(
    backend: &mut dyn Backend,
    prompter: &mut dyn Prompter,
    options: &Options,
) -> Result<RunOutcome> {
    let mut ledger = Ledger::default();
    let mut plan = build_plan(&*backend, options, &mut ledger).await?;

    if options.confirm_before_modifying {
        report::print_cleanup_plan(&plan);
        if !plan.is_empty()
            && !prompter.confirm(
                "Shall I continue and reattach and/or remove all documents found?",
                true,
            )?
        {
            println!("Cancelling. No changes made.");
            ledger.cancelled = true;
            return Ok(RunOutcome {
                ledger,
                report: None,
            });
        }
    }

    if !plan.pending.is_empty() {
        report::print_pending(&plan);
        let pending = std::mem::take(&mut plan.pending);
        if prompter.confirm("Shall I remove the pending documents also?", false)? {
            plan.removals.extend(pending);
        } else {
            for removal in pending {
                ledger.skip(SkipReason::NoMatchingItems, skipped(&removal.document.title));
            }
        }
    }

    if options.dry_run {
        println!("DRY RUN: No changes will be made.");
    }

    let mut executor = Executor::new(backend, options);

    let groups = plan.reattachments_by_document();
    tracing::info!(documents = groups.len(), "Step 2 of 3: reattaching documents");
    for (document, group) in &groups {
        executor.reattach_document(document, group, &mut ledger).await;
    }

    tracing::info!(documents = plan.removals.len(), "Step 3 of 3: removing documents");
    for removal in &plan.removals {
        tracing::debug!(document = %removal.document.title, reason = %removal.reason, "removing document");
        executor.remove_document(removal, &mut ledger).await;
    }

    report::print_summary(&ledger, RunKind::Cleanup, options);
    let path = report::write_report(&ledger, RunKind::Cleanup, &options.report_dir)?;
    Ok(RunOutcome {
        ledger,
        report: Some(path),
    })
}

fn skipped(document: &str) -> Skipped {
    Skipped {
        document: document.to_string(),
        ..Default::default()
    }
}

fn document_ref(document: &ItemDetail) -> DocumentRef {
    DocumentRef {
        id: document.id.clone(),
        vault_id: document.vault.id.clone(),
        title: document.title.clone(),
        tags: document.tags.clone(),
    }
}

/// Read-only phase of cleanup mode.
async fn build_plan(backend: &dyn Backend, options: &Options, ledger: &mut Ledger) -> Result<Plan> {
    let documents: Vec<ItemSummary> = backend
        .list_items(&ListQuery::active())
        .await?
        .into_iter()
        .filter(|i| i.category.is_document())
        .collect();

    let query = ListQuery::with_archive().with_tags(options.filters.tags.whitelist.clone());
    let candidates: Vec<ItemSummary> = backend
        .list_items(&query)
        .await?
        .into_iter()
        .filter(|i| !i.category.is_document())
        .collect();

    let filters = options.filters.for_documents();
    let mut screened = Vec::new();
    for document in &documents {
        match filters.screen_item(&document.title, &document.tags) {
            Some(reason) => ledger.skip(reason, skipped(&document.title)),
            None => screened.push(document),
        }
    }

    tracing::info!(
        documents = screened.len(),
        candidates = candidates.len(),
        "Step 1 of 3 (no changes being made): checking documents"
    );

    let mut plan = Plan::default();
    for summary in screened {
        check_document(backend, options, summary, &candidates, &mut plan, ledger).await;
    }
    Ok(plan)
}

async fn check_document(
    backend: &dyn Backend,
    options: &Options,
    summary: &ItemSummary,
    candidates: &[ItemSummary],
    plan: &mut Plan,
    ledger: &mut Ledger,
) {
    let document = match backend.get_item(&summary.id).await {
        Ok(document) => document,
        Err(e) => {
            ledger.fail(
                FailureKind::GetDocument,
                Failure {
                    item: summary.title.clone(),
                    document: summary.title.clone(),
                    error: e.to_string(),
                    ..Default::default()
                },
            );
            return;
        }
    };

    let removal = |reason: RemovalReason, referenced_by: Option<&str>| Removal {
        document: document_ref(&document),
        reason,
        referenced_by: referenced_by.map(str::to_string),
    };

    let files = document.attached_files();
    let Some(file) = files.first() else {
        plan.removals.push(removal(RemovalReason::NoFiles, None));
        return;
    };
    let size = file.size;

    let Some(item_name) = upgrade_item_name(&document.title) else {
        ledger.skip(SkipReason::NotUpgradeNamed, skipped(&document.title));
        return;
    };

    let matching: Vec<&ItemSummary> = candidates
        .iter()
        .filter(|c| c.title.trim() == item_name)
        .collect();
    tracing::debug!(document = %document.title, item = item_name, matches = matching.len(), "checking document");

    let fetch_failed = |ledger: &mut Ledger, candidate: &str, e: crate::ReattachError| {
        ledger.fail(
            FailureKind::GetItem,
            Failure {
                item: candidate.to_string(),
                document: document.title.clone(),
                error: e.to_string(),
                ..Default::default()
            },
        );
    };

    for candidate in matching.iter().filter(|c| c.is_archived()) {
        match backend.get_item(&candidate.id).await {
            Ok(item) if item.references_item(&document.id) => {
                plan.removals.push(removal(
                    RemovalReason::ReferencedByArchivedItem,
                    Some(item.title.as_str()),
                ));
                return;
            }
            Ok(_) => {}
            Err(e) => fetch_failed(ledger, &candidate.title, e),
        }
    }

    for candidate in matching.iter().filter(|c| !c.is_archived()) {
        let item = match backend.get_item(&candidate.id).await {
            Ok(item) => item,
            Err(e) => {
                fetch_failed(ledger, &candidate.title, e);
                continue;
            }
        };

        let item_files = item.attached_files();
        if item_files.is_empty() {
            continue;
        }

        match already_attached(&document.title, size, &item.title, &item_files) {
            Some(AttachedMatch::Size) => {
                plan.removals
                    .push(removal(RemovalReason::AlreadyAttachedSize, Some(item.title.as_str())));
            }
            Some(AttachedMatch::Name) => {
                plan.removals
                    .push(removal(RemovalReason::AlreadyAttachedName, Some(item.title.as_str())));
            }
            None => {
                let item_link = item_link(backend, options, &item, ledger, &document.title).await;
                let name = sanitize_attachment_name(&strip_item_suffix(&document.title, &item.title));
                tracing::debug!(document = %document.title, item = %item.title, "planning fuzzy reattachment");
                plan.reattachments.push(Reattachment {
                    document: document_ref(&document),
                    item: ItemRef {
                        id: item.id.clone(),
                        vault_id: item.vault.id.clone(),
                        title: item.title.clone(),
                        tags: item.tags.clone(),
                    },
                    display_name: name.clone(),
                    label: name,
                    reference: None,
                    item_link,
                    fuzzy: true,
                });
            }
        }
        return;
    }

    if options.confirm_before_modifying {
        plan.pending.push(removal(RemovalReason::NoMatchingItems, None));
    } else {
        ledger.skip(SkipReason::NoMatchingItems, skipped(&document.title));
    }
}

/// Share link of `item` when links are requested; a failure is recorded and
/// leaves the link empty.
async fn item_link(
    backend: &dyn Backend,
    options: &Options,
    item: &ItemDetail,
    ledger: &mut Ledger,
    document: &str,
) -> String {
    if !options.generate_share_links {
        return String::new();
    }
    match backend.share_link(&item.id, &item.vault.id).await {
        Ok(link) => link,
        Err(e) => {
            ledger.fail(
                FailureKind::ItemLink,
                Failure {
                    item: item.title.clone(),
                    document: document.to_string(),
                    error: e.to_string(),
                    ..Default::default()
                },
            );
            String::new()
        }
    }
}
