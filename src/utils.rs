use std::sync::{Mutex, MutexGuard};

/// Fatal model errors (construction misuse, capacity violation) end the
/// process: they indicate a broken model, not a transient condition.
#[macro_export]
macro_rules! unrecoverable {
    ($($arg:tt)+) => {{
        log::error!($($arg)+);
        std::process::abort();
    }};
}

/// Poison-tolerant lock. A panic in a user hook must not wedge every
/// other worker on a poisoned mutex.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
