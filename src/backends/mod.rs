//! Backend implementations.

#[cfg(feature = "mock")]
pub mod mock;

pub mod onepassword;

/// Registers all compiled backends with the factory.
///
/// This is called by [`crate::init`], but can also be called explicitly.
pub fn register_all() {
    #[cfg(feature = "mock")]
    mock::register();

    onepassword::register();
}
