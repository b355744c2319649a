//! Backend trait definition for vault access.
//!
//! This module defines the [`Backend`] trait covering exactly the vault
//! operations the migration needs: listing and reading items, fetching a
//! document's file, editing attachments, tags and fields, and deleting.

use crate::item::{ItemDetail, ItemSummary};
use crate::Result;
use async_trait::async_trait;
use std::path::Path;

/// Parameters of an item listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Include archived items.
    pub include_archive: bool,
    /// Only items carrying at least one of these tags; empty for all.
    pub tags: Vec<String>,
}

impl ListQuery {
    /// Lists active items only.
    pub fn active() -> Self {
        Self::default()
    }

    /// Lists active and archived items.
    pub fn with_archive() -> Self {
        Self {
            include_archive: true,
            tags: Vec::new(),
        }
    }

    /// Restricts the listing to items with any of `tags`.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Backend represents the vault the migration runs against.
///
/// Mutating operations take `dry_run`; a backend must validate the request
/// but leave the vault untouched when it is set. Deletion has no dry-run
/// form, callers skip it instead.
///
/// # Implementations
///
/// - **CLI-based**: 1Password (`op`)
/// - **Testing**: Mock backend with error injection
///
/// # Example
///
/// ```no_run
/// use docreattach::{Backend, Config, BackendType, ListQuery};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> docreattach::Result<()> {
///     docreattach::init();
///     let config = Config::new(BackendType::OnePassword);
///     let mut backend = docreattach::factory::new_backend(config)?;
///
///     backend.init().await?;
///     let items = backend.list_items(&ListQuery::active()).await?;
///     println!("{} items", items.len());
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait Backend: Send + Sync {
    /// Returns the backend name (e.g., "onepassword", "mock").
    fn name(&self) -> &str;

    /// Initializes the backend.
    ///
    /// # Errors
    ///
    /// Returns [`ReattachError::BackendNotInstalled`](crate::ReattachError::BackendNotInstalled)
    /// if the CLI tool is not available.
    async fn init(&mut self) -> Result<()>;

    /// Lists items across all vaults.
    async fn list_items(&self, query: &ListQuery) -> Result<Vec<ItemSummary>>;

    /// Retrieves a complete item by id.
    ///
    /// # Errors
    ///
    /// - [`ReattachError::NotFound`](crate::ReattachError::NotFound):
    ///   Item does not exist
    async fn get_item(&self, id: &str) -> Result<ItemDetail>;

    /// Returns a link that opens the item in the apps.
    async fn share_link(&self, id: &str, vault_id: &str) -> Result<String>;

    /// Writes the file of a document item to `out_file`.
    async fn download_document(&self, id: &str, vault_id: &str, out_file: &Path) -> Result<()>;

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Attaches `file` to an item under the field label `label`.
    async fn attach_file(
        &mut self,
        item_id: &str,
        vault_id: &str,
        label: &str,
        file: &Path,
        dry_run: bool,
    ) -> Result<()>;

    /// Replaces an item's tags.
    async fn set_tags(
        &mut self,
        item_id: &str,
        vault_id: &str,
        tags: &[String],
        dry_run: bool,
    ) -> Result<()>;

    /// Deletes a field, optionally inside a labelled section.
    async fn delete_field(
        &mut self,
        item_id: &str,
        vault_id: &str,
        section: Option<&str>,
        field_id: &str,
        dry_run: bool,
    ) -> Result<()>;

    /// Deletes an item, moving it to the archive when `archive` is set.
    async fn delete_item(&mut self, id: &str, vault_id: &str, archive: bool) -> Result<()>;
}
