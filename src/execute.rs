//! Applies planned reattachments and removals to the vault.
//!
//! Every step is best effort: a failure is recorded in the ledger and the
//! run moves on. A document is only deleted once all of its reattachments
//! went through.

use crate::config::Options;
use crate::outcome::{DocumentRef, Failure, FailureKind, Ledger, Reattachment, Removal};
use crate::validation::temp_file_name;
use crate::{Backend, ReattachError};
use std::collections::HashMap;
use std::path::Path;

/// Executes plan entries against a backend.
pub(crate) struct Executor<'a> {
    backend: &'a mut dyn Backend,
    options: &'a Options,
    /// Tags of every item touched so far, as last written.
    item_tags: HashMap<String, Vec<String>>,
}

fn failure(item: &str, document: &str, link: &str, err: &ReattachError) -> Failure {
    Failure {
        item: item.to_string(),
        document: document.to_string(),
        item_link: link.to_string(),
        error: err.to_string(),
    }
}

impl<'a> Executor<'a> {
    pub(crate) fn new(backend: &'a mut dyn Backend, options: &'a Options) -> Self {
        Self {
            backend,
            options,
            item_tags: HashMap::new(),
        }
    }

    /// Copies one document onto every item in `group`, then retires it.
    pub(crate) async fn reattach_document(
        &mut self,
        document: &DocumentRef,
        group: &[&Reattachment],
        ledger: &mut Ledger,
    ) {
        let Some(first) = group.first() else {
            return;
        };

        let fail_all = |ledger: &mut Ledger, err: &ReattachError| {
            for r in group {
                ledger.fail(
                    FailureKind::Reattach,
                    failure(&r.item.title, &r.display_name, &r.item_link, err),
                );
            }
        };

        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                fail_all(ledger, &ReattachError::Io(e));
                return;
            }
        };
        let path = dir.path().join(temp_file_name(&first.label));

        tracing::debug!(document = %document.title, path = %path.display(), "copying file to temp dir");
        if let Err(e) = self
            .backend
            .download_document(&document.id, &document.vault_id, &path)
            .await
        {
            fail_all(ledger, &e);
            return;
        }

        let mut all_attached = true;
        for r in group {
            if self.attach(r, &path, ledger).await {
                ledger.reattached.push((*r).clone());
            } else {
                all_attached = false;
            }
        }

        if !all_attached {
            tracing::warn!(document = %document.title, "not all reattachments succeeded, keeping document");
            return;
        }

        let item_titles: Vec<&str> = group.iter().map(|r| r.item.title.as_str()).collect();
        self.retire(document, &item_titles.join(", "), &first.display_name, ledger)
            .await;
    }

    /// Attaches the downloaded file to one item. Returns false on a failure
    /// that must keep the document around.
    async fn attach(&mut self, r: &Reattachment, path: &Path, ledger: &mut Ledger) -> bool {
        let dry_run = self.options.dry_run;
        tracing::debug!(document = %r.display_name, item = %r.item.title, "attaching file to item");

        if let Err(e) = self
            .backend
            .attach_file(&r.item.id, &r.item.vault_id, &r.label, path, dry_run)
            .await
        {
            ledger.fail(
                FailureKind::Reattach,
                failure(&r.item.title, &r.display_name, &r.item_link, &e),
            );
            return false;
        }

        if !self.options.reattach_tag.is_empty() {
            let tag = if r.fuzzy {
                self.options.fuzzy_tag()
            } else {
                self.options.reattach_tag.clone()
            };
            if let Err(e) = self.add_item_tag(r, tag).await {
                ledger.fail(
                    FailureKind::TagItem,
                    failure(&r.item.title, &r.display_name, &r.item_link, &e),
                );
            }
        }

        if let Some(ref reference) = r.reference {
            tracing::debug!(item = %r.item.title, field = %reference.field_id, "deleting document reference");
            if let Err(e) = self
                .backend
                .delete_field(
                    &r.item.id,
                    &r.item.vault_id,
                    reference.section.as_deref(),
                    &reference.field_id,
                    dry_run,
                )
                .await
            {
                ledger.fail(
                    FailureKind::Reattach,
                    failure(&r.item.title, &r.display_name, &r.item_link, &e),
                );
                return false;
            }
        }

        true
    }

    async fn add_item_tag(&mut self, r: &Reattachment, tag: String) -> crate::Result<()> {
        let mut tags = self
            .item_tags
            .get(&r.item.id)
            .cloned()
            .unwrap_or_else(|| r.item.tags.clone());

        if tags.contains(&tag) {
            return Ok(());
        }
        tags.push(tag);

        tracing::debug!(item = %r.item.title, ?tags, "adding reattached tag to item");
        self.backend
            .set_tags(&r.item.id, &r.item.vault_id, &tags, self.options.dry_run)
            .await?;
        self.item_tags.insert(r.item.id.clone(), tags);
        Ok(())
    }

    /// Deletes a document that is no longer needed.
    pub(crate) async fn remove_document(&mut self, removal: &Removal, ledger: &mut Ledger) {
        let item = removal
            .referenced_by
            .as_deref()
            .unwrap_or(&removal.document.title);
        if self
            .retire(&removal.document, item, &removal.document.title, ledger)
            .await
        {
            ledger.removed.push(removal.clone());
        }
    }

    /// Tags a document as deleted, then deletes or archives it.
    ///
    /// A failed tag is recorded but does not stop the deletion. Nothing is
    /// deleted in a dry run.
    async fn retire(
        &mut self,
        document: &DocumentRef,
        item: &str,
        display_name: &str,
        ledger: &mut Ledger,
    ) -> bool {
        let dry_run = self.options.dry_run;
        let deleted_tag = self.options.deleted_tag();

        if !document.tags.contains(&deleted_tag) {
            let mut tags = document.tags.clone();
            tags.push(deleted_tag);
            tracing::debug!(document = %document.title, "tagging document before deleting");
            if let Err(e) = self
                .backend
                .set_tags(&document.id, &document.vault_id, &tags, dry_run)
                .await
            {
                ledger.fail(FailureKind::TagDocument, failure(item, display_name, "", &e));
            }
        }

        if dry_run {
            tracing::debug!(document = %document.title, "dry run, not deleting document");
            return true;
        }

        tracing::debug!(
            document = %document.title,
            archive = self.options.archive_docs,
            "deleting document"
        );
        match self
            .backend
            .delete_item(&document.id, &document.vault_id, self.options.archive_docs)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                ledger.fail(FailureKind::DeleteDocument, failure(item, display_name, "", &e));
                false
            }
        }
    }
}
