//! Nullable infrastructure for deterministic testing.
//!
//! Everything the engine touches outside itself (clock, relay, signer,
//! notifier) sits behind a trait. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod notifier;
pub mod relay;
pub mod signer;

pub use clock::NullClock;
pub use notifier::NullNotifier;
pub use relay::NullRelay;
pub use signer::{NullSigner, SignerMode};

use std::sync::{Mutex, MutexGuard};

/// A panicking test must not poison the double for the assertions after it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
