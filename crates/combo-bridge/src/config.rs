//! Translation between script configuration maps and typed combo state.
//!
//! Incoming maps are converted into a [`ComboPatch`] in one pass while the
//! [`ScriptLock`] is held; the patch is then applied to [`ComboState`] without
//! the lock. Outgoing configuration goes the other way: a [`ComboSnapshot`]
//! is taken from the state, and only the conversion into a `rhai::Map` runs
//! under the lock.
//!
//! Unrecognized keys are not an error. Callers may pass a superset map; extra
//! keys are retained in the state's extension map and otherwise ignored.

use std::sync::Arc;

use rhai::{Array, Dynamic, FnPtr, Map, serde::from_dynamic};
use serde::Deserialize;
use tracing::trace;

use crate::{
    Error, Result,
    callback::CallbackRef,
    flags::{ComboOptions, HEIGHT_GROUP, INDEPENDENT_FLAGS},
    lock::ScriptLock,
    state::ComboState,
    store::ValueStore,
};

/// Configuration keys understood by the combo widget.
pub mod keys {
    /// Option list.
    pub const ITEMS: &str = "items";
    /// Current (initial) value.
    pub const DEFAULT_VALUE: &str = "default_value";
    /// Row interactivity.
    pub const ENABLED: &str = "enabled";
    /// Visibility.
    pub const SHOW: &str = "show";
    /// Popup left alignment.
    pub const POPUP_ALIGN_LEFT: &str = "popup_align_left";
    /// Arrow button suppression.
    pub const NO_ARROW_BUTTON: &str = "no_arrow_button";
    /// Preview suppression.
    pub const NO_PREVIEW: &str = "no_preview";
    /// Height tier: ~4 rows.
    pub const HEIGHT_SMALL: &str = "height_small";
    /// Height tier: ~8 rows.
    pub const HEIGHT_REGULAR: &str = "height_regular";
    /// Height tier: ~20 rows.
    pub const HEIGHT_LARGE: &str = "height_large";
    /// Height tier: unbounded.
    pub const HEIGHT_LARGEST: &str = "height_largest";
    /// Callable fired on selection.
    pub const CALLBACK: &str = "callback";
    /// User data passed to the callable.
    pub const CALLBACK_DATA: &str = "callback_data";
    /// Width in points.
    pub const WIDTH: &str = "width";
    /// Display label.
    pub const LABEL: &str = "label";
    /// Attached popup name.
    pub const POPUP: &str = "popup";
    /// Hover tooltip.
    pub const TIP: &str = "tip";
    /// Sibling placement.
    pub const BEFORE: &str = "before";
    /// Parent container.
    pub const PARENT: &str = "parent";
    /// Value-store binding.
    pub const SOURCE: &str = "source";
}

/// Keys deserialized into [`ComboPatch`] fields.
const TYPED_KEYS: [&str; 18] = [
    keys::ITEMS,
    keys::DEFAULT_VALUE,
    keys::ENABLED,
    keys::SHOW,
    keys::POPUP_ALIGN_LEFT,
    keys::NO_ARROW_BUTTON,
    keys::NO_PREVIEW,
    keys::HEIGHT_SMALL,
    keys::HEIGHT_REGULAR,
    keys::HEIGHT_LARGE,
    keys::HEIGHT_LARGEST,
    keys::WIDTH,
    keys::LABEL,
    keys::POPUP,
    keys::TIP,
    keys::BEFORE,
    keys::PARENT,
    keys::SOURCE,
];

/// A validated configuration update. `None` fields were absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComboPatch {
    /// New option list.
    pub items: Option<Vec<String>>,
    /// New current value.
    pub default_value: Option<String>,
    /// New enablement.
    pub enabled: Option<bool>,
    /// New visibility.
    pub show: Option<bool>,
    /// Independent toggle.
    pub popup_align_left: Option<bool>,
    /// Independent toggle.
    pub no_arrow_button: Option<bool>,
    /// Independent toggle.
    pub no_preview: Option<bool>,
    /// Height group member.
    pub height_small: Option<bool>,
    /// Height group member.
    pub height_regular: Option<bool>,
    /// Height group member.
    pub height_large: Option<bool>,
    /// Height group member.
    pub height_largest: Option<bool>,
    /// New width.
    pub width: Option<i64>,
    /// New display label.
    pub label: Option<String>,
    /// New popup name.
    pub popup: Option<String>,
    /// New tooltip.
    pub tip: Option<String>,
    /// New `before` placement hint.
    pub before: Option<String>,
    /// New parent hint.
    pub parent: Option<String>,
    /// New value binding.
    pub source: Option<String>,
    /// New callable; `Some(None)` clears it.
    #[serde(skip)]
    pub callback: Option<Option<CallbackRef>>,
    /// New user data.
    #[serde(skip)]
    pub user_data: Option<Dynamic>,
    /// Unrecognized keys carried along.
    #[serde(skip)]
    pub extensions: Map,
}

impl ComboPatch {
    /// Boolean value of a flag key, if present in this update.
    pub fn toggle(&self, key: &str) -> Option<bool> {
        match key {
            keys::POPUP_ALIGN_LEFT => self.popup_align_left,
            keys::NO_ARROW_BUTTON => self.no_arrow_button,
            keys::NO_PREVIEW => self.no_preview,
            keys::HEIGHT_SMALL => self.height_small,
            keys::HEIGHT_REGULAR => self.height_regular,
            keys::HEIGHT_LARGE => self.height_large,
            keys::HEIGHT_LARGEST => self.height_largest,
            _ => None,
        }
    }
}

/// Everything `get()` reports about a widget, detached from the state.
#[derive(Debug, Clone)]
pub struct ComboSnapshot {
    /// Option list.
    pub items: Vec<String>,
    /// Current value (read through the binding).
    pub value: String,
    /// Enablement.
    pub enabled: bool,
    /// Visibility.
    pub show: bool,
    /// Resolved options.
    pub options: ComboOptions,
    /// Width.
    pub width: i64,
    /// Raw label.
    pub label: String,
    /// Popup name.
    pub popup: String,
    /// Tooltip.
    pub tip: String,
    /// Placement hint.
    pub before: String,
    /// Parent hint.
    pub parent: String,
    /// Value binding.
    pub source: String,
    /// Callable.
    pub callback: Option<CallbackRef>,
    /// User data.
    pub user_data: Dynamic,
}

/// Converts between `rhai::Map` configuration objects and [`ComboState`].
#[derive(Debug, Clone)]
pub struct ConfigTranslator {
    /// Guard held while touching script-owned objects.
    lock: Arc<ScriptLock>,
}

impl ConfigTranslator {
    /// Create a translator sharing `lock` with the script runtime.
    pub fn new(lock: Arc<ScriptLock>) -> Self {
        Self { lock }
    }

    /// Validate `config` into a patch. Fails without side effects when a
    /// recognized key carries a value of the wrong type.
    pub fn parse(&self, config: &Map) -> Result<ComboPatch> {
        let _guard = self.lock.acquire();
        parse_patch(config)
    }

    /// Apply a validated patch.
    ///
    /// `source` is applied before `default_value` so a value supplied in the
    /// same update lands in the new binding.
    pub fn apply(state: &mut ComboState, patch: ComboPatch) {
        state.options.apply(|key| patch.toggle(key));

        let ComboPatch {
            items,
            default_value,
            enabled,
            show,
            width,
            label,
            popup,
            tip,
            before,
            parent,
            source,
            callback,
            user_data,
            extensions,
            ..
        } = patch;

        if let Some(items) = items {
            state.items = items;
        }
        if let Some(source) = source {
            state.bind(&source);
        }
        if let Some(value) = default_value {
            state.commit(&value);
        }
        if let Some(enabled) = enabled {
            state.enabled = enabled;
        }
        if let Some(show) = show {
            state.show = show;
        }
        if let Some(width) = width {
            state.width = width;
        }
        if let Some(label) = label {
            state.label = label;
        }
        if let Some(popup) = popup {
            state.popup = popup;
        }
        if let Some(tip) = tip {
            state.tip = tip;
        }
        if let Some(before) = before {
            state.before = before;
        }
        if let Some(parent) = parent {
            state.parent = parent;
        }
        if let Some(callback) = callback {
            state.callback = callback;
        }
        if let Some(user_data) = user_data {
            state.user_data = user_data;
        }
        state.extensions.extend(extensions);
    }

    /// Parse and apply `config`.
    pub fn set(&self, state: &mut ComboState, config: &Map) -> Result<()> {
        let patch = self.parse(config)?;
        Self::apply(state, patch);
        Ok(())
    }

    /// Capture the reportable configuration of `state`.
    pub fn snapshot(state: &ComboState) -> ComboSnapshot {
        ComboSnapshot {
            items: state.items.clone(),
            value: state.current_value(),
            enabled: state.enabled,
            show: state.show,
            options: state.options,
            width: state.width,
            label: state.label.clone(),
            popup: state.popup.clone(),
            tip: state.tip.clone(),
            before: state.before.clone(),
            parent: state.parent.clone(),
            source: state.source().to_string(),
            callback: state.callback.clone(),
            user_data: state.user_data.clone(),
        }
    }

    /// Render a snapshot as a configuration map containing every recognized key.
    pub fn to_map(&self, snapshot: &ComboSnapshot) -> Map {
        let _guard = self.lock.acquire();
        snapshot_to_map(snapshot)
    }

    /// Report the configuration of `state`.
    pub fn get(&self, state: &ComboState) -> Map {
        self.to_map(&Self::snapshot(state))
    }

    /// Build a new widget state for `name` from an initial configuration.
    ///
    /// `default_value` and `source` seed the value slot: a bound slot that
    /// already exists keeps its value. Everything else is applied as a
    /// regular update.
    pub fn build(&self, name: &str, config: &Map, store: ValueStore) -> Result<ComboState> {
        validate_name(name)?;
        let mut patch = self.parse(config)?;
        let default_value = patch.default_value.take().unwrap_or_default();
        let source = patch.source.take().unwrap_or_default();
        let mut state = ComboState::new(name, &default_value, &source, store);
        Self::apply(&mut state, patch);
        Ok(state)
    }
}

/// Reject empty or whitespace-only item names.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Split `config` into typed fields, callback fields, and extensions.
fn parse_patch(config: &Map) -> Result<ComboPatch> {
    let mut typed = Map::new();
    let mut callback = None;
    let mut user_data = None;
    let mut extensions = Map::new();

    for (key, value) in config {
        match key.as_str() {
            keys::CALLBACK => callback = Some(parse_callback(value)?),
            keys::CALLBACK_DATA => user_data = Some(value.clone()),
            // An explicit unit counts as "not provided".
            k if TYPED_KEYS.contains(&k) => {
                if !value.is_unit() {
                    typed.insert(key.clone(), value.clone());
                }
            }
            _ => {
                trace!(key = %key, "retaining unrecognized config key");
                extensions.insert(key.clone(), value.clone());
            }
        }
    }

    let mut patch = match from_dynamic::<ComboPatch>(&Dynamic::from_map(typed.clone())) {
        Ok(patch) => patch,
        Err(err) => return Err(locate_invalid_key(&typed, &err.to_string())),
    };
    patch.callback = callback;
    patch.user_data = user_data;
    patch.extensions = extensions;
    Ok(patch)
}

/// Find which typed key made deserialization fail.
fn locate_invalid_key(typed: &Map, fallback: &str) -> Error {
    for (key, value) in typed {
        let mut single = Map::new();
        single.insert(key.clone(), value.clone());
        if let Err(err) = from_dynamic::<ComboPatch>(&Dynamic::from_map(single)) {
            return Error::InvalidValue {
                key: key.to_string(),
                message: format!("expected {}, found {} ({})", expected_type(key), value.type_name(), err),
            };
        }
    }
    Error::InvalidValue {
        key: String::new(),
        message: fallback.to_string(),
    }
}

/// Human-readable type expected for a typed key.
fn expected_type(key: &str) -> &'static str {
    match key {
        keys::ITEMS => "an array of strings",
        keys::WIDTH => "an integer",
        keys::DEFAULT_VALUE
        | keys::LABEL
        | keys::POPUP
        | keys::TIP
        | keys::BEFORE
        | keys::PARENT
        | keys::SOURCE => "a string",
        _ => "a bool",
    }
}

/// Interpret the `callback` value: a function pointer, or unit to clear.
fn parse_callback(value: &Dynamic) -> Result<Option<CallbackRef>> {
    if value.is_unit() {
        return Ok(None);
    }
    if let Some(func) = value.clone().try_cast::<FnPtr>() {
        return Ok(Some(CallbackRef::new(func)));
    }
    Err(Error::InvalidValue {
        key: keys::CALLBACK.to_string(),
        message: format!("expected a function pointer, found {}", value.type_name()),
    })
}

/// Convert a snapshot into a map with canonical value types.
fn snapshot_to_map(snapshot: &ComboSnapshot) -> Map {
    let mut m = Map::new();

    let items: Array = snapshot
        .items
        .iter()
        .map(|item| Dynamic::from(item.clone()))
        .collect();
    m.insert(keys::ITEMS.into(), Dynamic::from_array(items));
    m.insert(
        keys::DEFAULT_VALUE.into(),
        Dynamic::from(snapshot.value.clone()),
    );
    m.insert(keys::ENABLED.into(), Dynamic::from(snapshot.enabled));
    m.insert(keys::SHOW.into(), Dynamic::from(snapshot.show));

    let bits = snapshot.options.bits();
    for flag in &INDEPENDENT_FLAGS {
        m.insert(flag.key.into(), Dynamic::from(bits.contains(flag.flag)));
    }
    for (key, tier) in HEIGHT_GROUP.members {
        m.insert(
            (*key).into(),
            Dynamic::from(bits.contains(tier.flag())),
        );
    }

    m.insert(keys::WIDTH.into(), Dynamic::from(snapshot.width));
    m.insert(keys::LABEL.into(), Dynamic::from(snapshot.label.clone()));
    m.insert(keys::POPUP.into(), Dynamic::from(snapshot.popup.clone()));
    m.insert(keys::TIP.into(), Dynamic::from(snapshot.tip.clone()));
    m.insert(keys::BEFORE.into(), Dynamic::from(snapshot.before.clone()));
    m.insert(keys::PARENT.into(), Dynamic::from(snapshot.parent.clone()));
    m.insert(keys::SOURCE.into(), Dynamic::from(snapshot.source.clone()));

    let callback = match &snapshot.callback {
        Some(cb) => Dynamic::from(cb.fn_ptr().clone()),
        None => Dynamic::UNIT,
    };
    m.insert(keys::CALLBACK.into(), callback);
    m.insert(keys::CALLBACK_DATA.into(), snapshot.user_data.clone());

    m
}

#[cfg(test)]
mod tests {
    use rhai::Engine;

    use super::*;
    use crate::flags::{ComboFlags, HeightTier};

    fn translator() -> ConfigTranslator {
        ConfigTranslator::new(Arc::new(ScriptLock::new()))
    }

    fn map(script: &str) -> Map {
        Engine::new()
            .eval::<Map>(script)
            .expect("valid map literal")
    }

    fn fresh(name: &str) -> ComboState {
        ComboState::new(name, "", "", ValueStore::new())
    }

    fn bool_at(m: &Map, key: &str) -> bool {
        m.get(key).and_then(|v| v.as_bool().ok()).expect("bool key")
    }

    #[test]
    fn height_update_replaces_previous_tier() {
        let t = translator();
        let mut state = fresh("c");
        t.set(&mut state, &map(r#"#{items: ["a", "b", "c"], height_small: true}"#))
            .unwrap();
        t.set(&mut state, &map("#{height_large: true}")).unwrap();

        let flags = state.flags();
        assert!(flags.contains(ComboFlags::HEIGHT_LARGE));
        assert!(!flags.contains(ComboFlags::HEIGHT_SMALL));
        assert_eq!(state.items(), ["a", "b", "c"]);
    }

    #[test]
    fn conflicting_height_keys_resolve_by_priority() {
        let t = translator();
        let mut state = fresh("c");
        t.set(
            &mut state,
            &map("#{height_largest: true, height_large: true, height_regular: true}"),
        )
        .unwrap();
        assert_eq!(state.options().height(), Some(HeightTier::Regular));
        let out = t.get(&state);
        let on: Vec<&str> = HeightTier::PRIORITY
            .iter()
            .map(|t| t.key())
            .filter(|k| bool_at(&out, k))
            .collect();
        assert_eq!(on, ["height_regular"]);
    }

    #[test]
    fn unknown_keys_are_ignored_and_retained() {
        let t = translator();
        let mut state = fresh("c");
        t.set(&mut state, &map(r#"#{items: ["x"], future_knob: 3, enabled: false}"#))
            .unwrap();
        assert_eq!(state.items(), ["x"]);
        assert!(!state.enabled());
        assert_eq!(
            state.extension("future_knob").and_then(|v| v.as_int().ok()),
            Some(3)
        );
        assert!(!t.get(&state).contains_key("future_knob"));
    }

    #[test]
    fn get_after_set_reproduces_recognized_subset() {
        let t = translator();
        let mut state = fresh("c");
        let cfg = map(
            r#"#{
                items: ["one", "two"],
                default_value: "two",
                enabled: false,
                popup_align_left: true,
                no_arrow_button: false,
                no_preview: true,
                height_large: true,
                width: 120,
                label: "Pick one",
                tip: "choose",
                source: "slot",
            }"#,
        );
        t.set(&mut state, &cfg).unwrap();
        let out = t.get(&state);
        for (key, value) in &cfg {
            let got = out.get(key.as_str()).expect("recognized key emitted");
            assert_eq!(got.to_string(), value.to_string(), "key {key}");
            assert_eq!(got.type_name(), value.type_name(), "key {key}");
        }
    }

    #[test]
    fn get_emits_every_recognized_key_with_defaults() {
        let t = translator();
        let out = t.get(&fresh("c"));
        for key in TYPED_KEYS {
            assert!(out.contains_key(key), "missing {key}");
        }
        assert!(out.contains_key(keys::CALLBACK));
        assert!(out.contains_key(keys::CALLBACK_DATA));
        assert!(bool_at(&out, keys::ENABLED));
        assert!(!bool_at(&out, keys::HEIGHT_REGULAR));
        assert_eq!(
            out.get(keys::ITEMS)
                .and_then(|v| v.clone().into_array().ok())
                .map(|a| a.len()),
            Some(0)
        );
    }

    #[test]
    fn set_of_get_is_a_noop() {
        let t = translator();
        let mut state = fresh("c");
        t.set(
            &mut state,
            &map(r#"#{items: ["a", "b"], default_value: "b", height_small: true, no_preview: true}"#),
        )
        .unwrap();
        let before = t.get(&state);
        t.set(&mut state, &before).unwrap();
        let after = t.get(&state);
        assert_eq!(format!("{before:?}"), format!("{after:?}"));
    }

    #[test]
    fn get_feeds_a_fresh_instance() {
        let t = translator();
        let mut original = fresh("a");
        t.set(
            &mut original,
            &map(r#"#{items: ["p", "q"], default_value: "q", height_largest: true, enabled: false}"#),
        )
        .unwrap();

        let mut copy = fresh("b");
        t.set(&mut copy, &t.get(&original)).unwrap();
        assert_eq!(copy.items(), original.items());
        assert_eq!(copy.current_value(), "q");
        assert_eq!(copy.flags(), original.flags());
        assert!(!copy.enabled());
    }

    #[test]
    fn malformed_value_rejects_whole_update_and_releases_lock() {
        let lock = Arc::new(ScriptLock::new());
        let t = ConfigTranslator::new(lock.clone());
        let mut state = fresh("c");
        t.set(&mut state, &map(r#"#{items: ["keep"]}"#)).unwrap();

        let err = t
            .set(&mut state, &map(r#"#{items: ["new"], enabled: "yes"}"#))
            .unwrap_err();
        match err {
            Error::InvalidValue { key, .. } => assert_eq!(key, "enabled"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(state.items(), ["keep"]);
        assert!(state.enabled());
        assert!(!lock.is_locked());
    }

    #[test]
    fn non_string_items_are_rejected() {
        let t = translator();
        let mut state = fresh("c");
        let err = t.set(&mut state, &map(r#"#{items: ["a", 2]}"#)).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { ref key, .. } if key == "items"));
    }

    #[test]
    fn unit_values_count_as_absent() {
        let t = translator();
        let mut state = fresh("c");
        t.set(&mut state, &map(r#"#{tip: "hello"}"#)).unwrap();
        t.set(&mut state, &map("#{tip: ()}")).unwrap();
        assert_eq!(state.tip, "hello");
    }

    #[test]
    fn callback_accepts_fn_ptr_and_unit() {
        let t = translator();
        let mut state = fresh("c");
        t.set(&mut state, &map(r#"#{callback: Fn("on_pick"), callback_data: 42}"#))
            .unwrap();
        assert_eq!(state.callback().map(|c| c.fn_name()), Some("on_pick"));
        assert_eq!(state.user_data().as_int(), Ok(42));

        t.set(&mut state, &map("#{callback: ()}")).unwrap();
        assert!(state.callback().is_none());

        let err = t.set(&mut state, &map("#{callback: 5}")).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { ref key, .. } if key == "callback"));
    }

    #[test]
    fn build_seeds_bound_slot_only_when_absent() {
        let t = translator();
        let store = ValueStore::new();
        store.set("shared_key", "z");
        let state = t
            .build(
                "c",
                &map(r#"#{source: "shared_key", default_value: "ignored"}"#),
                store.clone(),
            )
            .unwrap();
        assert_eq!(state.current_value(), "z");

        let other = t
            .build("d", &map(r#"#{source: "new_key", default_value: "seed"}"#), store.clone())
            .unwrap();
        assert_eq!(other.current_value(), "seed");
        assert_eq!(store.get("new_key").as_deref(), Some("seed"));
    }

    #[test]
    fn build_rejects_blank_names() {
        let t = translator();
        let err = t.build("  ", &Map::new(), ValueStore::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidName(_)));
    }

    #[test]
    fn disabling_keeps_value() {
        let t = translator();
        let mut state = fresh("c");
        t.set(&mut state, &map(r#"#{items: ["a", "b"], default_value: "b"}"#))
            .unwrap();
        t.set(&mut state, &map("#{enabled: false}")).unwrap();
        assert_eq!(state.current_value(), "b");
        assert_eq!(state.items(), ["a", "b"]);
    }
}
