//! 1Password CLI backend.
//!
//! This backend drives 1Password through the `op` command-line tool
//! (version 2). It requires the CLI to be installed and signed in, either
//! through the desktop app integration or an `OP_SESSION_*` variable.
//!
//! # Configuration
//!
//! - `op_path`: path to the `op` binary (default: `op` from `PATH`)
//! - `account`: account passed as `--account` (default: `op` picks one)
//!
//! # Example
//!
//! ```
//! use docreattach::{Config, BackendType};
//!
//! let config = Config::new(BackendType::OnePassword)
//!     .with_op_path("/opt/homebrew/bin/op")
//!     .with_option("account", "my.1password.com");
//! ```

mod backend;

pub use backend::OnePasswordBackend;

use crate::factory;

/// Registers the 1Password backend with the factory.
pub fn register() {
    factory::register_backend("onepassword", |config| {
        Ok(Box::new(OnePasswordBackend::new(config)))
    });
}
