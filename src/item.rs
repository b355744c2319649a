//! Item data structures as reported by `op --format=json`.

use serde::{Deserialize, Serialize};

/// Field type used by 1Password for links to other items.
pub const REFERENCE_FIELD_TYPE: &str = "REFERENCE";

/// State value of an archived item.
pub const ARCHIVED_STATE: &str = "ARCHIVED";

/// Item category.
///
/// Only documents are treated specially; every other category is kept by
/// name so the inventory can report it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// Standalone single-file item
    Document,
    /// Any other category (LOGIN, SECURE_NOTE, ...)
    Other(String),
}

impl Category {
    /// Returns true for document items.
    pub fn is_document(&self) -> bool {
        matches!(self, Self::Document)
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        if value == "DOCUMENT" {
            Self::Document
        } else {
            Self::Other(value)
        }
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Document => write!(f, "DOCUMENT"),
            Self::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Vault an item lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRef {
    /// Vault id
    pub id: String,
    /// Vault name
    #[serde(default)]
    pub name: String,
}

/// An entry of `op item list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSummary {
    /// Unique identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// Item category
    pub category: Category,

    /// Owning vault
    pub vault: VaultRef,

    /// Tags, empty when the item has none
    #[serde(default)]
    pub tags: Vec<String>,

    /// `ARCHIVED` for archived items, absent otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl ItemSummary {
    /// Returns true if the item sits in the archive.
    pub fn is_archived(&self) -> bool {
        self.state.as_deref() == Some(ARCHIVED_STATE)
    }
}

/// Section a field belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRef {
    /// Section id
    #[serde(default)]
    pub id: String,
    /// Section label shown in the apps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A field of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field id
    pub id: String,

    /// Field type (`STRING`, `CONCEALED`, `REFERENCE`, ...)
    #[serde(rename = "type", default)]
    pub field_type: String,

    /// Field label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Field value; the target item id for references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Section the field lives in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<SectionRef>,
}

impl Field {
    /// Returns true if the field links to another item.
    pub fn is_reference(&self) -> bool {
        self.field_type == REFERENCE_FIELD_TYPE
    }

    /// Label of the section holding this field, if any.
    pub fn section_label(&self) -> Option<&str> {
        self.section
            .as_ref()
            .and_then(|s| s.label.as_deref())
            .filter(|l| !l.is_empty())
    }
}

/// A file attached to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    /// File id; empty for placeholder entries
    #[serde(default)]
    pub id: String,
    /// File name
    pub name: String,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
}

/// The full item as returned by `op item get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDetail {
    /// Unique identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// Item category
    pub category: Category,

    /// Owning vault
    pub vault: VaultRef,

    /// Tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// `ARCHIVED` for archived items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Fields, including references to other items
    #[serde(default)]
    pub fields: Vec<Field>,

    /// Attached files
    #[serde(default)]
    pub files: Vec<FileAttachment>,
}

impl ItemDetail {
    /// Fields that link to other items.
    pub fn references(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_reference())
    }

    /// Returns true if any reference field points at `item_id`.
    pub fn references_item(&self, item_id: &str) -> bool {
        self.references()
            .any(|f| f.value.as_deref() == Some(item_id))
    }

    /// Attached files, ignoring entries without an id.
    pub fn attached_files(&self) -> Vec<&FileAttachment> {
        self.files.iter().filter(|f| !f.id.is_empty()).collect()
    }

    /// Returns true if the item sits in the archive.
    pub fn is_archived(&self) -> bool {
        self.state.as_deref() == Some(ARCHIVED_STATE)
    }

    /// List view of this item.
    pub fn summary(&self) -> ItemSummary {
        ItemSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            category: self.category.clone(),
            vault: self.vault.clone(),
            tags: self.tags.clone(),
            state: self.state.clone(),
        }
    }
}
