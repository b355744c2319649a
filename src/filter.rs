//! Whitelist/blacklist predicates over titles and tags.

use crate::outcome::SkipReason;

/// How filter entries are compared with a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Case-insensitive substring match (titles).
    Substring,
    /// Case-sensitive equality (tags).
    Exact,
}

/// Result of checking a value against a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Passes both lists.
    Allowed,
    /// A whitelist exists and the value is not on it.
    NotWhitelisted,
    /// The value is on the blacklist.
    Blacklisted,
}

impl Verdict {
    /// Returns true if the value may be processed.
    pub fn is_allowed(self) -> bool {
        self == Self::Allowed
    }
}

/// Checks `value` against a whitelist and a blacklist.
///
/// An empty whitelist allows everything; an empty blacklist blocks nothing.
/// The blacklist wins when both lists reject the value.
///
/// ```
/// use docreattach::filter::{check, MatchMode, Verdict};
///
/// let white = vec!["bank".to_string()];
/// let black = vec!["old".to_string()];
/// assert_eq!(check("My Bank", &white, &black, MatchMode::Substring), Verdict::Allowed);
/// assert_eq!(check("Old Bank", &white, &black, MatchMode::Substring), Verdict::Blacklisted);
/// assert_eq!(check("Email", &white, &black, MatchMode::Substring), Verdict::NotWhitelisted);
/// ```
pub fn check(value: &str, whitelist: &[String], blacklist: &[String], mode: MatchMode) -> Verdict {
    let matches = |entry: &String| match mode {
        MatchMode::Exact => entry == value,
        MatchMode::Substring => value.to_lowercase().contains(&entry.to_lowercase()),
    };

    if blacklist.iter().any(matches) {
        return Verdict::Blacklisted;
    }

    if !whitelist.is_empty() && !whitelist.iter().any(matches) {
        return Verdict::NotWhitelisted;
    }

    Verdict::Allowed
}

/// A whitelist paired with a blacklist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Entries of which one must match
    pub whitelist: Vec<String>,
    /// Entries of which none may match
    pub blacklist: Vec<String>,
}

impl ListFilter {
    /// Creates a filter from both lists.
    pub fn new(whitelist: Vec<String>, blacklist: Vec<String>) -> Self {
        Self {
            whitelist,
            blacklist,
        }
    }

    /// Returns true if neither list has entries.
    pub fn is_empty(&self) -> bool {
        self.whitelist.is_empty() && self.blacklist.is_empty()
    }

    /// Checks a title (case-insensitive substring match).
    pub fn check_title(&self, title: &str) -> Verdict {
        check(title, &self.whitelist, &self.blacklist, MatchMode::Substring)
    }

    /// Checks a set of tags (exact match).
    ///
    /// Blacklisted if any tag is blacklisted; not whitelisted if a whitelist
    /// exists and none of the tags is on it.
    pub fn check_tags(&self, tags: &[String]) -> Verdict {
        if tags.iter().any(|t| self.blacklist.contains(t)) {
            return Verdict::Blacklisted;
        }
        if !self.whitelist.is_empty() && !tags.iter().any(|t| self.whitelist.contains(t)) {
            return Verdict::NotWhitelisted;
        }
        Verdict::Allowed
    }

    /// Union of two filters.
    pub fn merged(&self, other: &ListFilter) -> ListFilter {
        let mut merged = self.clone();
        merged.whitelist.extend(other.whitelist.iter().cloned());
        merged.blacklist.extend(other.blacklist.iter().cloned());
        merged
    }
}

/// All filters of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    /// Applied to item titles
    pub items: ListFilter,
    /// Applied to document titles
    pub documents: ListFilter,
    /// Applied to item tags
    pub tags: ListFilter,
}

impl Filters {
    /// Screens an item by title, then by tags.
    ///
    /// Returns the reason the item must be skipped, if any.
    pub fn screen_item(&self, title: &str, tags: &[String]) -> Option<SkipReason> {
        match self.items.check_title(title) {
            Verdict::Blacklisted => return Some(SkipReason::ItemBlacklisted),
            Verdict::NotWhitelisted => return Some(SkipReason::ItemNotWhitelisted),
            Verdict::Allowed => {}
        }

        match self.tags.check_tags(tags) {
            Verdict::Blacklisted => Some(SkipReason::ItemTagBlacklisted),
            Verdict::NotWhitelisted => Some(SkipReason::ItemTagNotWhitelisted),
            Verdict::Allowed => None,
        }
    }

    /// Screens a referenced document by title.
    pub fn screen_document(&self, title: &str) -> Option<SkipReason> {
        match self.documents.check_title(title) {
            Verdict::Blacklisted => Some(SkipReason::DocBlacklisted),
            Verdict::NotWhitelisted => Some(SkipReason::DocNotWhitelisted),
            Verdict::Allowed => None,
        }
    }

    /// Filters used when documents themselves are the unit of work.
    ///
    /// Item and document title lists are merged and applied to the
    /// document title. Only the tag blacklist carries over: upgrade
    /// documents rarely have tags, and the tag whitelist selects the
    /// candidate items instead.
    pub fn for_documents(&self) -> Filters {
        Filters {
            items: self.items.merged(&self.documents),
            documents: ListFilter::default(),
            tags: ListFilter::new(Vec::new(), self.tags.blacklist.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_lists_allow_everything() {
        assert_eq!(check("anything", &[], &[], MatchMode::Substring), Verdict::Allowed);
        assert_eq!(check("", &[], &[], MatchMode::Exact), Verdict::Allowed);
    }

    #[test]
    fn test_substring_is_case_insensitive() {
        let white = strings(&["PASSPORT"]);
        assert!(check("scan of passport", &white, &[], MatchMode::Substring).is_allowed());
        assert_eq!(
            check("visa", &white, &[], MatchMode::Substring),
            Verdict::NotWhitelisted
        );
    }

    #[test]
    fn test_exact_is_case_sensitive() {
        let white = strings(&["Finance"]);
        assert!(check("Finance", &white, &[], MatchMode::Exact).is_allowed());
        assert_eq!(
            check("finance", &white, &[], MatchMode::Exact),
            Verdict::NotWhitelisted
        );
        assert_eq!(
            check("Fin", &white, &[], MatchMode::Exact),
            Verdict::NotWhitelisted
        );
    }

    #[test]
    fn test_blacklist_wins() {
        let white = strings(&["bank"]);
        let black = strings(&["bank"]);
        assert_eq!(
            check("bank", &white, &black, MatchMode::Substring),
            Verdict::Blacklisted
        );
    }

    #[test]
    fn test_tag_checks() {
        let filter = ListFilter::new(strings(&["work"]), strings(&["private"]));
        assert!(filter.check_tags(&strings(&["work", "misc"])).is_allowed());
        assert_eq!(
            filter.check_tags(&strings(&["work", "private"])),
            Verdict::Blacklisted
        );
        assert_eq!(filter.check_tags(&[]), Verdict::NotWhitelisted);

        let blacklist_only = ListFilter::new(vec![], strings(&["private"]));
        assert!(blacklist_only.check_tags(&[]).is_allowed());
    }

    #[test]
    fn test_screen_item_reasons() {
        let filters = Filters {
            items: ListFilter::new(strings(&["bank"]), strings(&["old"])),
            documents: ListFilter::default(),
            tags: ListFilter::new(vec![], strings(&["skip"])),
        };

        assert_eq!(filters.screen_item("My Bank", &[]), None);
        assert_eq!(
            filters.screen_item("Old Bank", &[]),
            Some(SkipReason::ItemBlacklisted)
        );
        assert_eq!(
            filters.screen_item("Email", &[]),
            Some(SkipReason::ItemNotWhitelisted)
        );
        assert_eq!(
            filters.screen_item("My Bank", &strings(&["skip"])),
            Some(SkipReason::ItemTagBlacklisted)
        );
    }

    #[test]
    fn test_screen_document() {
        let filters = Filters {
            documents: ListFilter::new(strings(&[".pdf"]), strings(&["draft"])),
            ..Default::default()
        };
        assert_eq!(filters.screen_document("scan.pdf - Bank"), None);
        assert_eq!(
            filters.screen_document("draft.pdf - Bank"),
            Some(SkipReason::DocBlacklisted)
        );
        assert_eq!(
            filters.screen_document("scan.png - Bank"),
            Some(SkipReason::DocNotWhitelisted)
        );
    }

    #[test]
    fn test_for_documents_merges_title_lists() {
        let filters = Filters {
            items: ListFilter::new(strings(&["bank"]), vec![]),
            documents: ListFilter::new(strings(&["passport"]), strings(&["draft"])),
            tags: ListFilter::new(strings(&["t"]), strings(&["private"])),
        };
        let merged = filters.for_documents();
        assert_eq!(merged.items.whitelist, strings(&["bank", "passport"]));
        assert_eq!(merged.items.blacklist, strings(&["draft"]));
        assert!(merged.documents.is_empty());
        assert!(merged.tags.whitelist.is_empty());
        assert_eq!(merged.tags.blacklist, strings(&["private"]));
    }

    #[test]
    fn test_untagged_document_passes_tag_whitelist() {
        let filters = Filters {
            tags: ListFilter::new(strings(&["work"]), strings(&["private"])),
            ..Default::default()
        }
        .for_documents();
        assert_eq!(filters.screen_item("scan.pdf - Bank", &[]), None);
        assert_eq!(
            filters.screen_item("scan.pdf - Bank", &strings(&["private"])),
            Some(SkipReason::ItemTagBlacklisted)
        );
    }
}
