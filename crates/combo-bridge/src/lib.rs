//! A drop-down selection widget (a "combo") exposed to Rhai scripts.
//!
//! Scripts describe a combo with a plain map:
//!
//! ```
//! use combo_bridge::{Host, ScriptRuntime};
//!
//! let mut runtime = ScriptRuntime::new(Host::new());
//! runtime
//!     .run(r#"
//!         fn picked(sender, data) { print(`${sender} -> ${get_value(sender)}`); }
//!         add_combo("fruit", #{
//!             items: ["apple", "pear", "plum"],
//!             default_value: "pear",
//!             height_small: true,
//!             callback: Fn("picked"),
//!         });
//!     "#)
//!     .unwrap();
//! assert_eq!(runtime.host().get_value("fruit").unwrap(), "pear");
//! ```
//!
//! The pieces, leaf first:
//! - [`flags`] resolves independent and mutually exclusive boolean options
//!   into the toolkit's raw bitmask.
//! - [`config`] converts configuration maps to typed [`ComboState`] updates
//!   and back.
//! - [`render`] draws a combo each frame through the [`ComboUi`] seam (egui
//!   backend included), commits clicks, and hands callbacks to a
//!   [`CallbackDispatcher`].
//! - [`host`] and [`script`] wire the registry, value store, callback queue,
//!   and Rhai engine together.

pub mod callback;
pub mod config;
mod error;
pub mod flags;
pub mod host;
pub mod lock;
pub mod registry;
pub mod render;
pub mod script;
pub mod state;
pub mod store;

pub use callback::{CallbackDispatcher, CallbackQueue, CallbackRecord, CallbackRef};
pub use config::{ComboPatch, ComboSnapshot, ConfigTranslator};
pub use error::{Error, RegistrationError, Result, excerpt_at};
pub use flags::{ComboFlags, ComboOptions, ExclusiveGroup, HeightTier, IndependentFlag};
pub use host::Host;
pub use lock::{ScriptGuard, ScriptLock};
pub use registry::{ComboRegistry, ComboWidget, ItemHandle, Rejected};
pub use render::{
    ColorOverride, ColorSlot, ComboFrame, ComboPhase, ComboRows, ComboUi, EguiComboUi,
    FrameOutcome, RenderBridge,
};
pub use script::{DrainReport, ScriptRuntime};
pub use state::ComboState;
pub use store::ValueStore;
