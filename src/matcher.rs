//! Heuristics for documents split off items by the 1Password 7 upgrade.
//!
//! The upgrade turned every attachment into a standalone document titled
//! `<file name> - <item title>` and linked it back with a reference field.
//! When the link is gone the title is the only remaining clue.

use crate::item::FileAttachment;

/// Separator between the file name and the item title.
const UPGRADE_SEPARATOR: &str = " - ";

/// Longest trailing segment still treated as a file extension.
const MAX_EXTENSION_CHARS: usize = 4;

/// Why a document is considered already attached to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachedMatch {
    /// An attachment has exactly the document's size.
    Size,
    /// An attachment carries the document's file name.
    Name,
}

/// Returns the title of the item a document was split from.
///
/// `None` when the title has no ` - ` separator or when the text after the
/// last separator ends in something shaped like a file extension, which
/// means the separator belonged to the file name.
///
/// ```
/// use docreattach::matcher::upgrade_item_name;
///
/// assert_eq!(upgrade_item_name("passport.pdf - Travel"), Some("Travel"));
/// assert_eq!(upgrade_item_name("passport.pdf"), None);
/// assert_eq!(upgrade_item_name("Travel - passport.pdf"), None);
/// ```
pub fn upgrade_item_name(doc_title: &str) -> Option<&str> {
    let (_, last) = doc_title.rsplit_once(UPGRADE_SEPARATOR)?;
    if looks_like_file_name(last) {
        return None;
    }
    Some(last.trim())
}

fn looks_like_file_name(s: &str) -> bool {
    match s.rsplit_once('.') {
        Some((_, ext)) => {
            let len = ext.chars().count();
            len > 0 && len <= MAX_EXTENSION_CHARS
        }
        None => false,
    }
}

/// Removes every `" - <item title>"` from a document title.
pub fn strip_item_suffix(doc_title: &str, item_title: &str) -> String {
    doc_title.replace(&format!("{}{}", UPGRADE_SEPARATOR, item_title), "")
}

/// Checks whether an item already carries the document's file.
///
/// Size equality is checked first, then the file name recovered from the
/// document title.
pub fn already_attached(
    doc_title: &str,
    doc_size: u64,
    item_title: &str,
    item_files: &[&FileAttachment],
) -> Option<AttachedMatch> {
    if item_files.iter().any(|f| f.size == doc_size) {
        return Some(AttachedMatch::Size);
    }

    let file_name = strip_item_suffix(doc_title, item_title);
    if item_files.iter().any(|f| f.name == file_name) {
        return Some(AttachedMatch::Name);
    }

    None
}
