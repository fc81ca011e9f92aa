//! Per-widget combo state.

use rhai::{Dynamic, Map};
use tracing::debug;

use crate::{
    callback::CallbackRef,
    flags::{ComboFlags, ComboOptions},
    store::ValueStore,
};

/// Where a widget's current value lives.
#[derive(Debug, Clone)]
enum ValueSlot {
    /// Value owned by the widget.
    Local(String),
    /// Value read and written through a named store slot.
    Bound {
        /// Store slot name.
        key: String,
    },
}

/// State for one combo widget.
///
/// Fields are populated by the config translator and read by the render
/// bridge. The current value is never cached when bound: each read goes to
/// the store, which other widgets and script code may have changed since the
/// last frame.
#[derive(Debug, Clone)]
pub struct ComboState {
    /// Unique item name.
    pub(crate) name: String,
    /// Display label; empty means "use the name".
    pub(crate) label: String,
    /// Options in render order.
    pub(crate) items: Vec<String>,
    /// Local or bound current value.
    value: ValueSlot,
    /// Shared store used by bound values.
    store: ValueStore,
    /// Whether rows are interactive.
    pub(crate) enabled: bool,
    /// Whether the widget is drawn at all.
    pub(crate) show: bool,
    /// Resolved flag groups.
    pub(crate) options: ComboOptions,
    /// Requested width in points; 0 lets the toolkit decide.
    pub(crate) width: i64,
    /// Hover tooltip; empty disables it.
    pub(crate) tip: String,
    /// Name of a popup attached to the item.
    pub(crate) popup: String,
    /// Parent container recorded at registration.
    pub(crate) parent: String,
    /// Sibling this item was placed before at registration.
    pub(crate) before: String,
    /// Script callable fired on selection.
    pub(crate) callback: Option<CallbackRef>,
    /// Opaque user data passed to the callable.
    pub(crate) user_data: Dynamic,
    /// Unrecognized configuration keys, retained but never rendered.
    pub(crate) extensions: Map,
}

impl ComboState {
    /// Create state for `name` with an initial value.
    ///
    /// When `source` is non-empty the value is bound to that store slot; the
    /// slot is seeded with `default_value` only if it does not exist yet.
    pub fn new(name: &str, default_value: &str, source: &str, store: ValueStore) -> Self {
        let value = if source.is_empty() {
            ValueSlot::Local(default_value.to_string())
        } else {
            store.get_or_insert(source, default_value);
            ValueSlot::Bound {
                key: source.to_string(),
            }
        };
        Self {
            name: name.to_string(),
            label: String::new(),
            items: Vec::new(),
            value,
            store,
            enabled: true,
            show: true,
            options: ComboOptions::default(),
            width: 0,
            tip: String::new(),
            popup: String::new(),
            parent: String::new(),
            before: String::new(),
            callback: None,
            user_data: Dynamic::UNIT,
            extensions: Map::new(),
        }
    }

    /// Unique item name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text shown next to the combo.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }

    /// Stored options, independent of enablement.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Whether rows are interactive.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the widget is drawn.
    pub fn visible(&self) -> bool {
        self.show
    }

    /// Resolved options.
    pub fn options(&self) -> ComboOptions {
        self.options
    }

    /// Raw flag mask for the toolkit.
    pub fn flags(&self) -> ComboFlags {
        self.options.bits()
    }

    /// Store slot the value is bound to; empty when local.
    pub fn source(&self) -> &str {
        match &self.value {
            ValueSlot::Local(_) => "",
            ValueSlot::Bound { key } => key,
        }
    }

    /// Configured callable, if any.
    pub fn callback(&self) -> Option<&CallbackRef> {
        self.callback.as_ref()
    }

    /// Configured user data.
    pub fn user_data(&self) -> &Dynamic {
        &self.user_data
    }

    /// Value stored under an unrecognized configuration key.
    pub fn extension(&self, key: &str) -> Option<&Dynamic> {
        self.extensions.get(key)
    }

    /// The current selection, read through the binding when bound.
    pub fn current_value(&self) -> String {
        match &self.value {
            ValueSlot::Local(v) => v.clone(),
            ValueSlot::Bound { key } => self.store.get(key).unwrap_or_default(),
        }
    }

    /// Write a new selection. Returns whether the value changed.
    pub fn commit(&mut self, value: &str) -> bool {
        match &mut self.value {
            ValueSlot::Local(v) => {
                if v == value {
                    return false;
                }
                *v = value.to_string();
                true
            }
            ValueSlot::Bound { key } => {
                let previous = self.store.set(key, value);
                previous.as_deref() != Some(value)
            }
        }
    }

    /// Rebind the value to `source`, or make it local when `source` is empty.
    ///
    /// The current value carries over: an absent slot is seeded with it, and
    /// unbinding keeps a local copy. An existing slot keeps its own value.
    pub fn bind(&mut self, source: &str) {
        if self.source() == source {
            return;
        }
        let current = self.current_value();
        debug!(item = %self.name, from = self.source(), to = source, "rebinding value source");
        self.value = if source.is_empty() {
            ValueSlot::Local(current)
        } else {
            self.store.get_or_insert(source, &current);
            ValueSlot::Bound {
                key: source.to_string(),
            }
        };
    }
}
