//! Mock backend for testing.
//!
//! This backend keeps a small vault in memory, records every mutating call
//! and supports error injection, so the migration engines can be exercised
//! without a real 1Password account.

use crate::backend::ListQuery;
use crate::item::{
    Category, Field, FileAttachment, ItemDetail, ItemSummary, SectionRef, VaultRef,
    ARCHIVED_STATE, REFERENCE_FIELD_TYPE,
};
use crate::validation::unescape_field_label;
use crate::*;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Vault id used by the fixture helpers.
pub const MOCK_VAULT_ID: &str = "mockvault";

/// A call made against the mock, dry runs included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Download {
        id: String,
    },
    Attach {
        item_id: String,
        label: String,
        dry_run: bool,
    },
    SetTags {
        item_id: String,
        tags: Vec<String>,
        dry_run: bool,
    },
    DeleteField {
        item_id: String,
        section: Option<String>,
        field_id: String,
        dry_run: bool,
    },
    Delete {
        id: String,
        archive: bool,
    },
}

/// Mock backend for testing.
///
/// # Example
///
/// ```
/// use docreattach::backends::mock::{self, MockBackend};
/// use docreattach::{Backend, ReattachError};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> docreattach::Result<()> {
///     let mut backend = MockBackend::new();
///     backend.init().await?;
///
///     backend.insert(mock::item("itm1", "Bank", "LOGIN")).await;
///
///     // Test error conditions
///     backend.get_error = Some(ReattachError::NotAuthenticated);
///     assert!(backend.get_item("itm1").await.is_err());
///
///     Ok(())
/// }
/// ```
pub struct MockBackend {
    items: Arc<RwLock<Vec<ItemDetail>>>,
    contents: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    calls: Arc<RwLock<Vec<MockCall>>>,

    /// Error to return from `list_items()`
    pub list_error: Option<ReattachError>,
    /// Error to return from `get_item()`
    pub get_error: Option<ReattachError>,
    /// Error to return from `download_document()`
    pub download_error: Option<ReattachError>,
    /// Error to return from `attach_file()`
    pub attach_error: Option<ReattachError>,
    /// Error to return from `set_tags()`
    pub tag_error: Option<ReattachError>,
    /// Error to return from `delete_item()`
    pub delete_error: Option<ReattachError>,
    /// Item ids for which `get_item()` fails
    pub failing_ids: HashSet<String>,
    /// Item ids for which `attach_file()` fails
    pub failing_attach_ids: HashSet<String>,
    /// Item ids for which `delete_field()` fails
    pub failing_unlink_ids: HashSet<String>,
}

impl MockBackend {
    /// Creates a new mock backend with an empty vault.
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
            contents: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            list_error: None,
            get_error: None,
            download_error: None,
            attach_error: None,
            tag_error: None,
            delete_error: None,
            failing_ids: HashSet::new(),
            failing_attach_ids: HashSet::new(),
            failing_unlink_ids: HashSet::new(),
        }
    }

    /// Adds or replaces an item.
    pub async fn insert(&self, item: ItemDetail) {
        let mut items = self.items.write().await;
        match items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    /// Adds a document item holding one file with `content`.
    pub async fn insert_document(&self, id: &str, title: &str, file_name: &str, content: &[u8]) {
        let mut doc = item(id, title, "DOCUMENT");
        doc.files.push(file(file_name, content.len() as u64));
        self.insert(doc).await;
        self.contents
            .write()
            .await
            .insert(id.to_string(), content.to_vec());
    }

    /// Returns the current state of an item.
    pub async fn item(&self, id: &str) -> Option<ItemDetail> {
        let items = self.items.read().await;
        items.iter().find(|i| i.id == id).cloned()
    }

    /// Returns every call made so far.
    pub async fn calls(&self) -> Vec<MockCall> {
        self.calls.read().await.clone()
    }

    async fn record(&self, call: MockCall) {
        self.calls.write().await.push(call);
    }

    fn injected(err: &Option<ReattachError>) -> Result<()> {
        match err {
            Some(err) => Err(ReattachError::Other(anyhow::anyhow!("{}", err))),
            None => Ok(()),
        }
    }

    fn failing(ids: &HashSet<String>, id: &str) -> Result<()> {
        if ids.contains(id) {
            return Err(ReattachError::CommandFailed(format!("op failed for {}", id)));
        }
        Ok(())
    }

    async fn modify<F>(&self, id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut ItemDetail),
    {
        let mut items = self.items.write().await;
        let item = items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| ReattachError::NotFound(id.to_string()))?;
        f(item);
        Ok(())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds an item fixture in the mock vault.
pub fn item(id: &str, title: &str, category: &str) -> ItemDetail {
    ItemDetail {
        id: id.to_string(),
        title: title.to_string(),
        category: Category::from(category.to_string()),
        vault: VaultRef {
            id: MOCK_VAULT_ID.to_string(),
            name: "Private".to_string(),
        },
        tags: Vec::new(),
        state: None,
        fields: Vec::new(),
        files: Vec::new(),
    }
}

/// Builds a reference field pointing at `target_id`.
pub fn reference(field_id: &str, target_id: &str) -> Field {
    Field {
        id: field_id.to_string(),
        field_type: REFERENCE_FIELD_TYPE.to_string(),
        label: Some(field_id.to_string()),
        value: Some(target_id.to_string()),
        section: Some(SectionRef {
            id: "linked items".to_string(),
            label: Some("Related Items".to_string()),
        }),
    }
}

/// Builds a file attachment fixture.
pub fn file(name: &str, size: u64) -> FileAttachment {
    FileAttachment {
        id: uuid::Uuid::new_v4().simple().to_string(),
        name: name.to_string(),
        size,
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn init(&mut self) -> Result<()> {
        Ok(())
    }

    async fn list_items(&self, query: &ListQuery) -> Result<Vec<ItemSummary>> {
        Self::injected(&self.list_error)?;

        let items = self.items.read().await;
        Ok(items
            .iter()
            .filter(|i| query.include_archive || !i.is_archived())
            .filter(|i| query.tags.is_empty() || i.tags.iter().any(|t| query.tags.contains(t)))
            .map(ItemDetail::summary)
            .collect())
    }

    async fn get_item(&self, id: &str) -> Result<ItemDetail> {
        Self::injected(&self.get_error)?;
        Self::failing(&self.failing_ids, id)?;

        self.item(id)
            .await
            .ok_or_else(|| ReattachError::NotFound(id.to_string()))
    }

    async fn share_link(&self, id: &str, vault_id: &str) -> Result<String> {
        Ok(format!("mock://vaults/{}/items/{}", vault_id, id))
    }

    async fn download_document(&self, id: &str, _vault_id: &str, out_file: &Path) -> Result<()> {
        self.record(MockCall::Download { id: id.to_string() }).await;
        Self::injected(&self.download_error)?;

        let content = self
            .contents
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ReattachError::NotFound(format!("{} has no file", id)))?;

        tokio::fs::write(out_file, content).await?;
        Ok(())
    }

    async fn attach_file(
        &mut self,
        item_id: &str,
        _vault_id: &str,
        label: &str,
        file: &Path,
        dry_run: bool,
    ) -> Result<()> {
        self.record(MockCall::Attach {
            item_id: item_id.to_string(),
            label: label.to_string(),
            dry_run,
        })
        .await;
        Self::injected(&self.attach_error)?;
        Self::failing(&self.failing_attach_ids, item_id)?;

        let size = tokio::fs::metadata(file).await?.len();
        if dry_run {
            return Ok(());
        }

        let name = unescape_field_label(label);
        self.modify(item_id, |item| {
            item.files.push(FileAttachment {
                id: uuid::Uuid::new_v4().simple().to_string(),
                name,
                size,
            })
        })
        .await
    }

    async fn set_tags(
        &mut self,
        item_id: &str,
        _vault_id: &str,
        tags: &[String],
        dry_run: bool,
    ) -> Result<()> {
        self.record(MockCall::SetTags {
            item_id: item_id.to_string(),
            tags: tags.to_vec(),
            dry_run,
        })
        .await;
        Self::injected(&self.tag_error)?;

        if dry_run {
            return Ok(());
        }
        let tags = tags.to_vec();
        self.modify(item_id, |item| item.tags = tags).await
    }

    async fn delete_field(
        &mut self,
        item_id: &str,
        _vault_id: &str,
        section: Option<&str>,
        field_id: &str,
        dry_run: bool,
    ) -> Result<()> {
        self.record(MockCall::DeleteField {
            item_id: item_id.to_string(),
            section: section.map(str::to_string),
            field_id: field_id.to_string(),
            dry_run,
        })
        .await;
        Self::failing(&self.failing_unlink_ids, item_id)?;

        if dry_run {
            return Ok(());
        }
        self.modify(item_id, |item| item.fields.retain(|f| f.id != field_id))
            .await
    }

    async fn delete_item(&mut self, id: &str, _vault_id: &str, archive: bool) -> Result<()> {
        self.record(MockCall::Delete {
            id: id.to_string(),
            archive,
        })
        .await;
        Self::injected(&self.delete_error)?;

        if archive {
            return self
                .modify(id, |item| item.state = Some(ARCHIVED_STATE.to_string()))
                .await;
        }

        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|i| i.id != id);
        if items.len() == before {
            return Err(ReattachError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

/// Registers the mock backend with the factory.
pub fn register() {
    crate::factory::register_backend("mock", |_cfg| Ok(Box::new(MockBackend::new())));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_respects_archive_and_tags() {
        let backend = MockBackend::new();
        let mut archived = item("a", "Archived", "LOGIN");
        archived.state = Some(ARCHIVED_STATE.to_string());
        let mut tagged = item("t", "Tagged", "LOGIN");
        tagged.tags = vec!["work".to_string()];
        backend.insert(archived).await;
        backend.insert(tagged).await;
        backend.insert(item("p", "Plain", "LOGIN")).await;

        let active = backend.list_items(&ListQuery::active()).await.unwrap();
        assert_eq!(active.len(), 2);

        let all = backend.list_items(&ListQuery::with_archive()).await.unwrap();
        assert_eq!(all.len(), 3);

        let work = backend
            .list_items(&ListQuery::with_archive().with_tags(vec!["work".to_string()]))
            .await
            .unwrap();
        assert_eq!(work.len(), 1);
        assert_eq!(work[0].id, "t");
    }

    #[tokio::test]
    async fn test_download_and_attach() {
        let mut backend = MockBackend::new();
        backend.insert(item("itm", "Bank", "LOGIN")).await;
        backend
            .insert_document("doc", "scan.pdf - Bank", "scan.pdf", b"12345")
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        backend
            .download_document("doc", MOCK_VAULT_ID, &path)
            .await
            .unwrap();

        backend
            .attach_file("itm", MOCK_VAULT_ID, "scan.pdf", &path, true)
            .await
            .unwrap();
        assert!(backend.item("itm").await.unwrap().files.is_empty());

        backend
            .attach_file("itm", MOCK_VAULT_ID, "scan.pdf", &path, false)
            .await
            .unwrap();
        let files = backend.item("itm").await.unwrap().files;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "scan.pdf");
        assert_eq!(files[0].size, 5);

        assert_eq!(backend.calls().await.len(), 3);
    }

    #[tokio::test]
    async fn test_delete_archive_and_remove() {
        let mut backend = MockBackend::new();
        backend.insert(item("a", "A", "DOCUMENT")).await;
        backend.insert(item("b", "B", "DOCUMENT")).await;

        backend.delete_item("a", MOCK_VAULT_ID, true).await.unwrap();
        assert!(backend.item("a").await.unwrap().is_archived());

        backend.delete_item("b", MOCK_VAULT_ID, false).await.unwrap();
        assert!(backend.item("b").await.is_none());

        let result = backend.delete_item("b", MOCK_VAULT_ID, false).await;
        assert!(matches!(result, Err(ReattachError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_field() {
        let mut backend = MockBackend::new();
        let mut login = item("itm", "Bank", "LOGIN");
        login.fields.push(reference("ref1", "doc"));
        backend.insert(login).await;

        backend
            .delete_field("itm", MOCK_VAULT_ID, Some("Related Items"), "ref1", false)
            .await
            .unwrap();
        assert!(backend.item("itm").await.unwrap().fields.is_empty());
    }

    #[tokio::test]
    async fn test_error_injection() {
        let mut backend = MockBackend::new();
        backend.insert(item("itm", "Bank", "LOGIN")).await;
        backend.failing_ids.insert("itm".to_string());
        assert!(backend.get_item("itm").await.is_err());

        backend.failing_ids.clear();
        backend.get_error = Some(ReattachError::NotAuthenticated);
        assert!(backend.get_item("itm").await.is_err());

        backend.tag_error = Some(ReattachError::NotAuthenticated);
        assert!(backend
            .set_tags("itm", MOCK_VAULT_ID, &["x".to_string()], false)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_per_item_edit_failures() {
        let mut backend = MockBackend::new();
        let mut login = item("itm", "Bank", "LOGIN");
        login.fields.push(reference("ref1", "doc"));
        backend.insert(login).await;
        backend.insert(item("other", "Card", "LOGIN")).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        std::fs::write(&path, b"123").unwrap();

        backend.failing_attach_ids.insert("itm".to_string());
        assert!(backend
            .attach_file("itm", MOCK_VAULT_ID, "scan.pdf", &path, false)
            .await
            .is_err());
        backend
            .attach_file("other", MOCK_VAULT_ID, "scan.pdf", &path, false)
            .await
            .unwrap();

        backend.failing_unlink_ids.insert("itm".to_string());
        assert!(backend
            .delete_field("itm", MOCK_VAULT_ID, Some("Related Items"), "ref1", false)
            .await
            .is_err());

        let itm = backend.item("itm").await.unwrap();
        assert!(itm.files.is_empty());
        assert_eq!(itm.fields.len(), 1);
        assert_eq!(backend.item("other").await.unwrap().files.len(), 1);
        // Failed calls are still recorded
        assert_eq!(backend.calls().await.len(), 3);
    }
}
