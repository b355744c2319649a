//! Configuration types for backend initialization and migration runs.

use crate::filter::Filters;
use crate::validation::clean_tag;
use std::collections::HashMap;
use std::path::PathBuf;

/// Default tag added to items that received a reattached document.
pub const DEFAULT_REATTACH_TAG: &str = "linked docs reattached";

/// Default path of the 1Password CLI; resolved through `PATH`.
pub const DEFAULT_OP_PATH: &str = "op";

/// Backend type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    /// 1Password CLI backend (requires `op` command)
    OnePassword,
    /// In-memory backend for tests and rehearsals
    Mock,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OnePassword => write!(f, "onepassword"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

/// Configuration for creating a backend.
///
/// ```
/// use docreattach::{Config, BackendType};
///
/// let config = Config::new(BackendType::OnePassword)
///     .with_op_path("/opt/homebrew/bin/op")
///     .with_option("account", "my.1password.com");
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend type
    pub backend: BackendType,

    /// Path or name of the `op` binary
    pub op_path: String,

    /// Backend-specific options
    pub options: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendType::OnePassword,
            op_path: DEFAULT_OP_PATH.to_string(),
            options: HashMap::new(),
        }
    }
}

impl Config {
    /// Creates a new configuration for the specified backend.
    pub fn new(backend: BackendType) -> Self {
        Self {
            backend,
            ..Default::default()
        }
    }

    /// Sets the path of the `op` binary.
    pub fn with_op_path(mut self, path: impl Into<String>) -> Self {
        self.op_path = path.into();
        self
    }

    /// Adds a backend-specific option.
    ///
    /// **1Password:**
    /// - `account`: account shorthand, sign-in address or id passed as `--account`
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Gets a backend-specific option value.
    pub fn get_option(&self, key: &str) -> Option<&String> {
        self.options.get(key)
    }
}

/// Options controlling a reattach or cleanup run.
#[derive(Debug, Clone)]
pub struct Options {
    /// Pass `--dry-run` to edits and never delete anything.
    pub dry_run: bool,
    /// Archive documents instead of deleting them permanently.
    pub archive_docs: bool,
    /// Ask before every document and print everything.
    pub supervise: bool,
    /// Ask once before starting to modify the vault.
    pub confirm_before_modifying: bool,
    /// Print per-document progress and detailed summaries.
    pub verbose: bool,
    /// Fetch share links for items that reference documents; they appear
    /// in supervise prompts and the report.
    pub generate_share_links: bool,
    /// Tag added to items that received documents; empty disables item tagging.
    pub reattach_tag: String,
    /// Title and tag filters.
    pub filters: Filters,
    /// Directory the CSV report is written to.
    pub report_dir: PathBuf,
    /// Stop after checking this many items (reattach mode).
    pub max_items: Option<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dry_run: false,
            archive_docs: true,
            supervise: false,
            confirm_before_modifying: false,
            verbose: false,
            generate_share_links: false,
            reattach_tag: DEFAULT_REATTACH_TAG.to_string(),
            filters: Filters::default(),
            report_dir: PathBuf::from("."),
            max_items: None,
        }
    }
}

impl Options {
    /// Applies the implications between flags.
    ///
    /// Supervising turns on verbose output, share links and the
    /// confirmation gate. The reattach tag loses any quotes.
    pub fn normalized(mut self) -> Self {
        if self.supervise {
            self.verbose = true;
            self.generate_share_links = true;
            self.confirm_before_modifying = true;
        }
        self.reattach_tag = clean_tag(&self.reattach_tag);
        self
    }

    /// Tag put on documents right before they are deleted.
    pub fn deleted_tag(&self) -> String {
        format!("{} deleted", self.reattach_tag).trim().to_string()
    }

    /// Tag put on items that received a document by name matching.
    pub fn fuzzy_tag(&self) -> String {
        format!("{} fuzzy", self.reattach_tag).trim().to_string()
    }
}
