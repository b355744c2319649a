//! Docreattach - Move 1Password documents back onto the items that use them.
//!
//! Older 1Password versions stored files as standalone document items that
//! other items linked to, and the 1Password 7 upgrade split attachments
//! into documents titled `<file> - <item title>`. This crate reverses both:
//!
//! - **Reattach mode** follows reference fields: the linked document's file
//!   is attached to every referencing item, the reference is removed and the
//!   document archived or deleted.
//! - **Cleanup mode** matches upgrade-named documents to items by title,
//!   reattaching them or removing them when the item already holds the file.
//!
//! All vault access goes through the `op` CLI behind the [`Backend`] trait;
//! an in-memory mock backend is available for tests and rehearsals.
//!
//! # Features
//!
//! - **Dry runs**: edits are passed `--dry-run`, nothing is deleted
//! - **Filters**: item, document and tag whitelists and blacklists
//! - **Confirmation gates**: per document when supervising, or once per run
//! - **Report**: every reattachment, removal, skip and failure as CSV
//!
//! # Quick Start
//!
//! ```no_run
//! use docreattach::prompt::StdinPrompter;
//! use docreattach::{factory, reattach, BackendType, Config, Options};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> docreattach::Result<()> {
//!     docreattach::init();
//!
//!     let mut backend = factory::new_backend(Config::new(BackendType::OnePassword))?;
//!     backend.init().await?;
//!
//!     let options = Options {
//!         dry_run: true,
//!         ..Default::default()
//!     };
//!     let outcome = reattach::run(backend.as_mut(), &mut StdinPrompter, &options).await?;
//!     println!("{} documents reattached", outcome.ledger.reattached_document_count());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! | Feature | Default | Notes |
//! |---------|---------|-------|
//! | `mock` | yes | In-memory backend with error injection |

pub mod backend;
pub mod backends;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod error;
mod execute;
pub mod factory;
pub mod filter;
pub mod item;
pub mod matcher;
pub mod outcome;
pub mod prompt;
pub mod reattach;
pub mod report;
pub mod validation;

pub use backend::{Backend, ListQuery};
pub use config::{BackendType, Config, Options};
pub use error::{ReattachError, Result};
pub use item::{Category, ItemDetail, ItemSummary};
pub use outcome::Ledger;
pub use prompt::Prompter;
pub use report::RunOutcome;

use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the library.
///
/// This registers all compiled backends with the factory. It is idempotent
/// and must run before [`factory::new_backend`].
pub fn init() {
    INIT.call_once(backends::register_all);
}
