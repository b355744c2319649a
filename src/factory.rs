//! Backend factory and registration system.

use crate::{Backend, Config, ReattachError, Result};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

/// Factory function type for creating backends.
pub type BackendFactory = fn(Config) -> Result<Box<dyn Backend>>;

static BACKEND_REGISTRY: OnceLock<RwLock<HashMap<String, BackendFactory>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<String, BackendFactory>> {
    BACKEND_REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers a backend factory function under a name.
pub fn register_backend(backend_type: &str, factory: BackendFactory) {
    let mut reg = registry().write().unwrap_or_else(|e| e.into_inner());
    reg.insert(backend_type.to_string(), factory);
}

/// Creates a new backend from configuration.
///
/// # Errors
///
/// Returns an error if the backend type is not registered (missing feature
/// flag or [`crate::init`] not called) or if its factory fails.
///
/// # Example
///
/// ```no_run
/// use docreattach::{Config, BackendType, factory};
///
/// docreattach::init();
/// let backend = factory::new_backend(Config::new(BackendType::OnePassword))?;
/// # Ok::<(), docreattach::ReattachError>(())
/// ```
pub fn new_backend(config: Config) -> Result<Box<dyn Backend>> {
    let backend_name = config.backend.to_string();

    let factory = {
        let reg = registry().read().unwrap_or_else(|e| e.into_inner());
        *reg.get(&backend_name).ok_or_else(|| {
            ReattachError::Other(anyhow::anyhow!(
                "unknown backend: {} (did you enable the '{}' feature flag?)",
                backend_name,
                backend_name
            ))
        })?
    };

    factory(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BackendType;

    fn failing_factory(_cfg: Config) -> Result<Box<dyn Backend>> {
        Err(ReattachError::Other(anyhow::anyhow!("failing factory")))
    }

    #[test]
    fn test_backend_registration() {
        register_backend("test-backend", failing_factory);

        let reg = registry().read().unwrap();
        assert!(reg.contains_key("test-backend"));
    }

    #[test]
    fn test_registered_backends() {
        crate::init();

        let backend = new_backend(Config::new(BackendType::OnePassword)).unwrap();
        assert_eq!(backend.name(), "onepassword");

        #[cfg(feature = "mock")]
        {
            let backend = new_backend(Config::new(BackendType::Mock)).unwrap();
            assert_eq!(backend.name(), "mock");
        }
    }

    #[test]
    fn test_registered_names_match_backend_types() {
        crate::init();

        let reg = registry().read().unwrap();
        assert!(reg.contains_key(&BackendType::OnePassword.to_string()));
        assert!(!reg.contains_key("op"));
    }
}
