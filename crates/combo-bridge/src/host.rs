//! Application facade owning the registry, value store, and callback queue.

use std::sync::Arc;

use parking_lot::Mutex;
use rhai::Map;
use tracing::{debug, warn};

use crate::{
    Error, Result,
    callback::CallbackQueue,
    config::{ConfigTranslator, validate_name},
    lock::ScriptLock,
    registry::{ComboRegistry, ComboWidget, ItemHandle},
    render::{ComboUi, EguiComboUi, FrameOutcome},
    store::ValueStore,
};

/// Shared handle to every collaborator a combo needs.
///
/// Clones share state. The script lock may be taken while the registry mutex
/// is acquired, never the other way around: conversions to and from
/// `rhai::Map` happen before the registry is locked or after it is released.
#[derive(Debug, Clone)]
pub struct Host {
    /// Registered widgets.
    registry: Arc<Mutex<ComboRegistry>>,
    /// Named value slots.
    store: ValueStore,
    /// Script-object guard.
    lock: Arc<ScriptLock>,
    /// Deferred callbacks produced by rendering.
    callbacks: CallbackQueue,
    /// Map <-> state conversion.
    translator: ConfigTranslator,
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    /// Create a host with an empty registry and store.
    pub fn new() -> Self {
        let lock = Arc::new(ScriptLock::new());
        Self {
            registry: Arc::new(Mutex::new(ComboRegistry::new())),
            store: ValueStore::new(),
            translator: ConfigTranslator::new(lock.clone()),
            lock,
            callbacks: CallbackQueue::new(),
        }
    }

    /// Shared value store.
    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    /// Script-object guard shared with the runtime.
    pub fn lock(&self) -> &Arc<ScriptLock> {
        &self.lock
    }

    /// Queue of pending callback invocations.
    pub fn callbacks(&self) -> &CallbackQueue {
        &self.callbacks
    }

    /// Register a container that combos can name as `parent`.
    pub fn add_container(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.registry.lock().add_container(name)?;
        Ok(())
    }

    /// Build a combo from `config` and register it.
    ///
    /// The whole configuration is validated before any state exists; a
    /// registry refusal drops the constructed widget.
    pub fn add_combo(&self, name: &str, config: &Map) -> Result<ItemHandle> {
        let state = self.translator.build(name, config, self.store.clone())?;
        let widget = ComboWidget::new(state);
        self.registry.lock().register(widget).map_err(|rejected| {
            warn!(item = name, reason = %rejected.reason, "combo registration refused");
            Error::Registration(rejected.reason)
        })
    }

    /// Apply a configuration update to an existing combo.
    ///
    /// A `parent` or `before` key moves the combo: the new placement is
    /// checked like a registration, and an omitted `before` appends it under
    /// its parent. A refused move fails the whole update.
    pub fn configure_item(&self, name: &str, config: &Map) -> Result<()> {
        let mut patch = self.translator.parse(config)?;
        let parent = patch.parent.take();
        let before = patch.before.take();

        let mut registry = self.registry.lock();
        let current_parent = registry
            .get(name)
            .map(|w| w.state.parent.clone())
            .ok_or_else(|| Error::UnknownItem(name.to_string()))?;
        if parent.is_some() || before.is_some() {
            let parent = parent.unwrap_or(current_parent);
            let before = before.unwrap_or_default();
            registry.relocate(name, &parent, &before).map_err(|reason| {
                warn!(item = name, %reason, "combo placement refused");
                Error::Registration(reason)
            })?;
        }

        let widget = registry
            .get_mut(name)
            .ok_or_else(|| Error::UnknownItem(name.to_string()))?;
        ConfigTranslator::apply(&mut widget.state, patch);
        debug!(item = name, "combo configured");
        Ok(())
    }

    /// Report the configuration of an existing combo.
    pub fn get_item_configuration(&self, name: &str) -> Result<Map> {
        let snapshot = {
            let registry = self.registry.lock();
            let widget = registry
                .get(name)
                .ok_or_else(|| Error::UnknownItem(name.to_string()))?;
            ConfigTranslator::snapshot(&widget.state)
        };
        Ok(self.translator.to_map(&snapshot))
    }

    /// Current value of a combo, read through its binding.
    pub fn get_value(&self, name: &str) -> Result<String> {
        let registry = self.registry.lock();
        registry
            .get(name)
            .map(|w| w.state.current_value())
            .ok_or_else(|| Error::UnknownItem(name.to_string()))
    }

    /// Overwrite the current value of a combo. Does not fire its callback.
    pub fn set_value(&self, name: &str, value: &str) -> Result<()> {
        let mut registry = self.registry.lock();
        let widget = registry
            .get_mut(name)
            .ok_or_else(|| Error::UnknownItem(name.to_string()))?;
        widget.state.commit(value);
        Ok(())
    }

    /// Whether an item or container named `name` exists.
    pub fn does_item_exist(&self, name: &str) -> bool {
        self.registry.lock().contains(name)
    }

    /// Remove an item or container. Returns whether anything was removed.
    pub fn delete_item(&self, name: &str) -> bool {
        self.registry.lock().remove(name)
    }

    /// Registered item names in draw order.
    pub fn item_names(&self) -> Vec<String> {
        self.registry.lock().names().map(str::to_string).collect()
    }

    /// Draw every registered combo for this frame.
    pub fn draw_all(&self, ui: &mut dyn ComboUi) -> Vec<FrameOutcome> {
        self.registry.lock().draw_all(ui, &self.callbacks)
    }

    /// Draw every registered combo into an egui `Ui`.
    pub fn show(&self, ui: &mut egui::Ui) -> Vec<FrameOutcome> {
        self.draw_all(&mut EguiComboUi::new(ui))
    }
}
