//! Deferred callback dispatch.
//!
//! Rendering never runs script code. A committed selection produces a
//! [`CallbackRecord`] that is handed to a [`CallbackDispatcher`]; the default
//! dispatcher, [`CallbackQueue`], appends it to a FIFO channel the host drains
//! on its own schedule (see `ScriptRuntime::run_callbacks`).

use std::fmt;

use crossbeam_channel::{Receiver, Sender, unbounded};
use rhai::{Dynamic, FnPtr};
use tracing::{trace, warn};

/// Opaque wrapper around a script callable.
#[derive(Clone)]
pub struct CallbackRef {
    /// Rhai function pointer invoked with `(sender, user_data)`.
    pub(crate) func: FnPtr,
}

impl CallbackRef {
    /// Wrap a script function pointer.
    pub fn new(func: FnPtr) -> Self {
        Self { func }
    }

    /// Name of the underlying script function (anonymous closures get a
    /// generated name).
    pub fn fn_name(&self) -> &str {
        self.func.fn_name()
    }

    /// The wrapped function pointer.
    pub fn fn_ptr(&self) -> &FnPtr {
        &self.func
    }
}

impl fmt::Debug for CallbackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRef")
            .field("fn_name", &self.func.fn_name())
            .finish_non_exhaustive()
    }
}

/// A recorded intent to invoke a script callable outside the render pass.
#[derive(Debug, Clone)]
pub struct CallbackRecord {
    /// Callable to invoke.
    pub callback: CallbackRef,
    /// Name of the item that produced the record.
    pub sender: String,
    /// User data configured on the item at the time of the click.
    pub user_data: Dynamic,
}

/// Sink for deferred callback invocations.
pub trait CallbackDispatcher {
    /// Record one invocation. Must not run the callable and must not block.
    fn fire(&self, callback: Option<&CallbackRef>, sender: &str, user_data: &Dynamic);
}

/// Unbounded FIFO queue of deferred invocations.
///
/// Clones share the same queue. Records without a callable are dropped when
/// fired.
#[derive(Debug, Clone)]
pub struct CallbackQueue {
    /// Producer side used by [`CallbackDispatcher::fire`].
    tx: Sender<CallbackRecord>,
    /// Consumer side drained by the host.
    rx: Receiver<CallbackRecord>,
}

impl Default for CallbackQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Number of records waiting to be drained.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Remove and return every pending record in enqueue order.
    pub fn drain(&self) -> Vec<CallbackRecord> {
        self.rx.try_iter().collect()
    }
}

impl CallbackDispatcher for CallbackQueue {
    fn fire(&self, callback: Option<&CallbackRef>, sender: &str, user_data: &Dynamic) {
        let Some(callback) = callback else {
            return;
        };
        trace!(sender, callback = callback.fn_name(), "callback_enqueued");
        let record = CallbackRecord {
            callback: callback.clone(),
            sender: sender.to_string(),
            user_data: user_data.clone(),
        };
        if self.tx.send(record).is_err() {
            warn!(sender, "callback queue disconnected; dropping record");
        }
    }
}
