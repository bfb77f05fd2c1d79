// Timer module (shared between the daemon and the CLI)
pub mod timer;

// Async test helpers, also used by the integration tests
#[doc(hidden)]
pub mod test_utils;
