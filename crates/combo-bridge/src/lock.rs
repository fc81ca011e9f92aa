//! Guard serializing access to script-owned objects.
//!
//! Option lists, callables, and user-data values originate in the script
//! runtime. Any conversion between those objects and Rust-side state holds
//! the [`ScriptLock`] for the duration of that one conversion, and never for a
//! whole frame. The lock is reentrant: script code already running under the
//! lock may call back into the bridge, which acquires it again.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tracing::trace;

/// Reentrant lock standing in for the script runtime's interpreter lock.
#[derive(Debug, Default)]
pub struct ScriptLock {
    /// Underlying reentrant mutex; the payload is the lock itself.
    inner: ReentrantMutex<()>,
}

/// Scoped ownership of the [`ScriptLock`]; released on drop.
#[must_use = "the script lock is released as soon as the guard is dropped"]
pub struct ScriptGuard<'a> {
    /// Held guard.
    _guard: ReentrantMutexGuard<'a, ()>,
}

impl ScriptLock {
    /// Create an unlocked instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the lock is held by the current thread.
    pub fn acquire(&self) -> ScriptGuard<'_> {
        let guard = self.inner.lock();
        trace!("script_lock_acquired");
        ScriptGuard { _guard: guard }
    }

    /// Whether any thread currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}
