/// Mutex helpers that never panic on poisoning.
///
/// A panic while holding controller or cache state poisons the lock. Calling
/// `.unwrap()` on it afterwards would take the whole host process down with
/// it, so state locks go through these helpers instead:
///
/// - `safe_lock()` - surfaces poisoning as a `LockError`
/// - `safe_lock_or_recover()` - logs and keeps going with the inner value
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{context}: mutex poisoned")]
pub struct LockError {
    pub context: String,
}

/// Lock `mutex`, reporting poisoning with `context` attached.
pub fn safe_lock<'a, T>(mutex: &'a Mutex<T>, context: &str) -> Result<MutexGuard<'a, T>, LockError> {
    mutex.lock().map_err(|_| LockError {
        context: context.to_string(),
    })
}

/// Lock `mutex`, recovering the guard if a previous holder panicked.
///
/// Only use this for state that stays valid after a partial update, such as
/// caches.
pub fn safe_lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("mutex was poisoned, recovering inner value");
            poisoned.into_inner()
        }
    }
}
