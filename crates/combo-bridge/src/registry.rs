//! Flat, ordered registry of combo widgets and their containers.
//!
//! Items are kept in draw order. A container is only a name that items can
//! name as their `parent`; nesting beyond one level is not modeled.

use thiserror::Error;
use tracing::debug;

use crate::{
    callback::CallbackDispatcher,
    error::RegistrationError,
    render::{ComboUi, FrameOutcome, RenderBridge},
    state::ComboState,
};

/// A registered combo: its state plus the per-widget render phase.
#[derive(Debug, Clone)]
pub struct ComboWidget {
    /// Configuration and value.
    pub state: ComboState,
    /// Frame-to-frame render tracking.
    pub bridge: RenderBridge,
}

impl ComboWidget {
    /// Wrap freshly built state.
    pub fn new(state: ComboState) -> Self {
        Self {
            state,
            bridge: RenderBridge::new(),
        }
    }

    /// Item name.
    pub fn name(&self) -> &str {
        self.state.name()
    }

    /// Draw this widget for one frame.
    pub fn draw(
        &mut self,
        ui: &mut dyn ComboUi,
        dispatcher: &dyn CallbackDispatcher,
    ) -> Option<FrameOutcome> {
        self.bridge.draw(&mut self.state, ui, dispatcher)
    }
}

/// Handle returned for an accepted widget.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemHandle {
    /// Registered name.
    name: String,
}

impl ItemHandle {
    /// Registered name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A widget the registry refused, returned to the caller intact.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct Rejected {
    /// Why registration failed.
    pub reason: RegistrationError,
    /// The fully constructed widget.
    pub widget: Box<ComboWidget>,
}

/// Ordered item registry.
#[derive(Debug, Default)]
pub struct ComboRegistry {
    /// Widgets in draw order.
    items: Vec<ComboWidget>,
    /// Container names in creation order.
    containers: Vec<String>,
}

impl ComboRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any item or container uses `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some() || self.is_container(name)
    }

    /// Whether `name` is a registered container.
    pub fn is_container(&self, name: &str) -> bool {
        self.containers.iter().any(|c| c == name)
    }

    /// Register a container name.
    pub fn add_container(&mut self, name: &str) -> Result<(), RegistrationError> {
        if self.contains(name) {
            return Err(RegistrationError::DuplicateName(name.to_string()));
        }
        debug!(container = name, "container registered");
        self.containers.push(name.to_string());
        Ok(())
    }

    /// Register `widget`, honoring its `parent` and `before` placement hints.
    ///
    /// `before` must name an item with the same parent; the widget is inserted
    /// directly ahead of it. Without `before` the widget is appended.
    pub fn register(&mut self, widget: ComboWidget) -> Result<ItemHandle, Rejected> {
        let reject = |reason, widget| Rejected {
            reason,
            widget: Box::new(widget),
        };
        let name = widget.name().to_string();
        if self.contains(&name) {
            return Err(reject(RegistrationError::DuplicateName(name), widget));
        }

        let index = match self.placement_index(&widget.state.parent, &widget.state.before) {
            Ok(index) => index,
            Err(reason) => return Err(reject(reason, widget)),
        };

        debug!(item = %name, parent = %widget.state.parent, index, "combo registered");
        self.items.insert(index, widget);
        Ok(ItemHandle { name })
    }

    /// Move a registered widget under `parent`, directly ahead of `before`,
    /// or to the end of the list when `before` is empty.
    ///
    /// Placement is checked as in [`register`](Self::register) and an item
    /// cannot be placed before itself. A refused move leaves the registry
    /// untouched; unknown names are ignored.
    pub fn relocate(
        &mut self,
        name: &str,
        parent: &str,
        before: &str,
    ) -> Result<(), RegistrationError> {
        let Some(from) = self.position(name) else {
            return Ok(());
        };
        if before == name {
            return Err(RegistrationError::UnknownBefore(before.to_string()));
        }
        let mut index = self.placement_index(parent, before)?;
        if from < index {
            index -= 1;
        }

        let mut widget = self.items.remove(from);
        widget.state.parent = parent.to_string();
        widget.state.before = before.to_string();
        debug!(item = name, parent, index, "combo relocated");
        self.items.insert(index, widget);
        Ok(())
    }

    /// Look up a widget.
    pub fn get(&self, name: &str) -> Option<&ComboWidget> {
        self.items.iter().find(|w| w.name() == name)
    }

    /// Look up a widget mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ComboWidget> {
        self.items.iter_mut().find(|w| w.name() == name)
    }

    /// Remove an item, or a container together with its children. Returns
    /// whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        if let Some(idx) = self.position(name) {
            self.items.remove(idx);
            debug!(item = name, "combo removed");
            return true;
        }
        if self.is_container(name) {
            self.containers.retain(|c| c != name);
            self.items.retain(|w| w.state.parent != name);
            debug!(container = name, "container removed");
            return true;
        }
        false
    }

    /// Item names in draw order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(ComboWidget::name)
    }

    /// Number of registered widgets.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no widgets are registered.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Draw every widget in order.
    pub fn draw_all(
        &mut self,
        ui: &mut dyn ComboUi,
        dispatcher: &dyn CallbackDispatcher,
    ) -> Vec<FrameOutcome> {
        self.items
            .iter_mut()
            .filter_map(|w| w.draw(ui, dispatcher))
            .collect()
    }

    /// Insertion index for an item placed under `parent` ahead of `before`.
    fn placement_index(&self, parent: &str, before: &str) -> Result<usize, RegistrationError> {
        if !parent.is_empty() && !self.is_container(parent) {
            return Err(RegistrationError::UnknownParent(parent.to_string()));
        }
        if before.is_empty() {
            return Ok(self.items.len());
        }
        match self.position(before) {
            Some(idx) if self.items[idx].state.parent == parent => Ok(idx),
            _ => Err(RegistrationError::UnknownBefore(before.to_string())),
        }
    }

    /// Index of the widget named `name`.
    fn position(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|w| w.name() == name)
    }
}
