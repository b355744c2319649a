//! What a run decided and what actually happened.
//!
//! Engines first build a [`Plan`] without touching the vault, then execute
//! it and record the results in a [`Ledger`]. The report is written from the
//! ledger.

use std::collections::{BTreeMap, HashSet};

/// Why a document or item was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipReason {
    ItemBlacklisted,
    ItemNotWhitelisted,
    ItemTagBlacklisted,
    ItemTagNotWhitelisted,
    DocBlacklisted,
    DocNotWhitelisted,
    NotADocument,
    UserSkipped,
    MoreThanOneFile,
    NoFiles,
    NotUpgradeNamed,
    NoMatchingItems,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ItemBlacklisted => "item blacklisted",
            Self::ItemNotWhitelisted => "item not on whitelist",
            Self::ItemTagBlacklisted => "item tag blacklisted",
            Self::ItemTagNotWhitelisted => "item tag not on whitelist",
            Self::DocBlacklisted => "doc blacklisted",
            Self::DocNotWhitelisted => "doc not on whitelist",
            Self::NotADocument => "not a document",
            Self::UserSkipped => "user skipped",
            Self::MoreThanOneFile => "more than one file",
            Self::NoFiles => "document has no files",
            Self::NotUpgradeNamed => "not named like document from 1P v7 upgrade",
            Self::NoMatchingItems => "no matching items",
        };
        f.write_str(s)
    }
}

/// Why a document is going to be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RemovalReason {
    NoFiles,
    ReferencedByArchivedItem,
    AlreadyAttachedSize,
    AlreadyAttachedName,
    NoMatchingItems,
}

impl std::fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoFiles => "no files",
            Self::ReferencedByArchivedItem => "referenced by archived item",
            Self::AlreadyAttachedSize => "already attached to item (size match)",
            Self::AlreadyAttachedName => "already attached to item (name match)",
            Self::NoMatchingItems => "no matching items",
        };
        f.write_str(s)
    }
}

/// Which step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FailureKind {
    GetItem,
    GetDocument,
    ItemLink,
    CheckDocument,
    Reattach,
    TagItem,
    TagDocument,
    DeleteDocument,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::GetItem => "failed to get item",
            Self::GetDocument => "failed to get doc",
            Self::ItemLink => "failed to get item link",
            Self::CheckDocument => "failed to check document",
            Self::Reattach => "failed to reattach document",
            Self::TagItem => "failed to add reattached tag to item",
            Self::TagDocument => "failed to tag document before removal",
            Self::DeleteDocument => "failed to delete document",
        };
        f.write_str(s)
    }
}

/// The document side of a reattachment or removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: String,
    pub vault_id: String,
    pub title: String,
    pub tags: Vec<String>,
}

/// The item receiving a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    pub id: String,
    pub vault_id: String,
    pub title: String,
    pub tags: Vec<String>,
}

/// Location of the reference field to delete once the file is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceField {
    pub section: Option<String>,
    pub field_id: String,
}

/// A document to copy onto an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reattachment {
    pub document: DocumentRef,
    pub item: ItemRef,
    /// Name shown to the user and in the report
    pub display_name: String,
    /// Attachment field label, unescaped
    pub label: String,
    /// Reference field to remove; `None` for name-matched documents
    pub reference: Option<ReferenceField>,
    pub item_link: String,
    /// Matched by title rather than by an explicit reference
    pub fuzzy: bool,
}

/// A document to delete or archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub document: DocumentRef,
    pub reason: RemovalReason,
    /// Title of the item that justified the removal
    pub referenced_by: Option<String>,
}

/// Something left alone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Skipped {
    pub item: String,
    pub document: String,
    pub item_link: String,
}

/// Something that went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Failure {
    pub item: String,
    pub document: String,
    pub item_link: String,
    pub error: String,
}

/// Changes decided during the read-only phase.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub reattachments: Vec<Reattachment>,
    pub removals: Vec<Removal>,
    /// Removals that need explicit approval
    pub pending: Vec<Removal>,
}

impl Plan {
    /// Returns true if nothing would change without approving pending removals.
    pub fn is_empty(&self) -> bool {
        self.reattachments.is_empty() && self.removals.is_empty()
    }

    /// Number of distinct items that would receive documents.
    pub fn item_count(&self) -> usize {
        self.reattachments
            .iter()
            .map(|r| r.item.id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Reattachments grouped per document, in first-seen order.
    pub fn reattachments_by_document(&self) -> Vec<(&DocumentRef, Vec<&Reattachment>)> {
        let mut groups: Vec<(&DocumentRef, Vec<&Reattachment>)> = Vec::new();
        for r in &self.reattachments {
            match groups.iter_mut().find(|(doc, _)| doc.id == r.document.id) {
                Some((_, group)) => group.push(r),
                None => groups.push((&r.document, vec![r])),
            }
        }
        groups
    }

    /// Removals grouped by reason.
    pub fn removals_by_reason(removals: &[Removal]) -> BTreeMap<RemovalReason, Vec<&Removal>> {
        let mut groups: BTreeMap<RemovalReason, Vec<&Removal>> = BTreeMap::new();
        for r in removals {
            groups.entry(r.reason).or_default().push(r);
        }
        groups
    }
}

/// Results of a run.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub reattached: Vec<Reattachment>,
    pub removed: Vec<Removal>,
    pub skipped: BTreeMap<SkipReason, Vec<Skipped>>,
    pub failed: BTreeMap<FailureKind, Vec<Failure>>,
    /// The user declined to continue; nothing was modified.
    pub cancelled: bool,
}

impl Ledger {
    /// Records a skip.
    pub fn skip(&mut self, reason: SkipReason, entry: Skipped) {
        self.skipped.entry(reason).or_default().push(entry);
    }

    /// Records a failure.
    pub fn fail(&mut self, kind: FailureKind, entry: Failure) {
        tracing::warn!(
            kind = %kind,
            item = %entry.item,
            document = %entry.document,
            error = %entry.error,
            "step failed"
        );
        self.failed.entry(kind).or_default().push(entry);
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.values().map(Vec::len).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.values().map(Vec::len).sum()
    }

    /// Number of distinct documents reattached.
    pub fn reattached_document_count(&self) -> usize {
        self.reattached
            .iter()
            .map(|r| r.document.id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Number of distinct items that received documents.
    pub fn reattached_item_count(&self) -> usize {
        self.reattached
            .iter()
            .map(|r| r.item.id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}
