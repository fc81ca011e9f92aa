//! Named value slots shared between widgets.

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use tracing::trace;

/// A process-wide store of named string values.
///
/// Widgets configured with a `source` read and write their current value
/// through the slot of that name, so several widgets (and script code) can
/// share one value. Concurrent writers follow last-writer-wins.
#[derive(Debug, Clone, Default)]
pub struct ValueStore {
    /// Slot values by name.
    slots: Arc<RwLock<HashMap<String, String>>>,
}

impl ValueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a slot.
    pub fn get(&self, key: &str) -> Option<String> {
        self.slots.read().get(key).cloned()
    }

    /// Overwrite a slot, creating it if needed. Returns the previous value.
    pub fn set(&self, key: &str, value: &str) -> Option<String> {
        trace!(key, value, "value_store_set");
        self.slots.write().insert(key.to_string(), value.to_string())
    }

    /// Return the slot's value, seeding it with `default` when absent.
    pub fn get_or_insert(&self, key: &str, default: &str) -> String {
        self.slots
            .write()
            .entry(key.to_string())
            .or_insert_with(|| default.to_string())
            .clone()
    }
}
