//! Per-frame drawing of a combo against a narrow toolkit seam.
//!
//! [`RenderBridge::draw`] is the only place widget state changes in response
//! to user input. It never runs script code: a committed selection is handed
//! to a [`CallbackDispatcher`] and runs later, outside the frame.
//!
//! The toolkit is reached through [`ComboUi`] and [`ComboRows`]; the egui
//! backend lives in [`egui_ui`].

pub mod egui_ui;

use egui::Color32;
use tracing::{debug, trace};

use crate::{callback::CallbackDispatcher, flags::ComboFlags, state::ComboState};

pub use egui_ui::EguiComboUi;

/// Alpha applied to the disabled text color for frame and button fills.
pub const DISABLED_ALPHA: u8 = 100;

/// Style slots overridden while a combo is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSlot {
    /// Preview box background.
    FrameBg,
    /// Preview box background under the pointer.
    FrameBgHovered,
    /// Preview box background while pressed.
    FrameBgActive,
    /// Arrow button background.
    Button,
    /// Arrow button background under the pointer.
    ButtonHovered,
    /// Arrow button background while pressed.
    ButtonActive,
    /// Popup window background.
    PopupBg,
    /// Popup and frame border.
    Border,
    /// Label, preview, and row text.
    Text,
}

/// One scoped color override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorOverride {
    /// Slot being overridden.
    pub slot: ColorSlot,
    /// Replacement color.
    pub color: Color32,
}

/// Palette used while a combo is disabled, derived from the theme's
/// disabled-text color.
pub fn disabled_overrides(text_disabled: Color32) -> [ColorOverride; 9] {
    let [r, g, b, _] = text_disabled.to_srgba_unmultiplied();
    let dimmed = Color32::from_rgba_unmultiplied(r, g, b, DISABLED_ALPHA);
    let over = |slot, color| ColorOverride { slot, color };
    [
        over(ColorSlot::FrameBg, dimmed),
        over(ColorSlot::FrameBgHovered, dimmed),
        over(ColorSlot::FrameBgActive, dimmed),
        over(ColorSlot::Button, dimmed),
        over(ColorSlot::ButtonHovered, dimmed),
        over(ColorSlot::ButtonActive, dimmed),
        over(ColorSlot::PopupBg, Color32::TRANSPARENT),
        over(ColorSlot::Border, Color32::TRANSPARENT),
        over(ColorSlot::Text, text_disabled),
    ]
}

/// Everything the toolkit needs to draw one combo header.
#[derive(Debug, Clone, Copy)]
pub struct ComboFrame<'a> {
    /// Stable identity (the item name).
    pub id: &'a str,
    /// Text shown next to the combo.
    pub label: &'a str,
    /// Preview text (the current value).
    pub preview: &'a str,
    /// Raw option bits.
    pub flags: ComboFlags,
    /// Explicit width in points.
    pub width: Option<f32>,
    /// Scoped style overrides; empty when enabled.
    pub overrides: &'a [ColorOverride],
    /// Hover tooltip.
    pub tip: Option<&'a str>,
}

/// Toolkit operations needed to draw a combo.
pub trait ComboUi {
    /// Theme color used for disabled text.
    fn text_disabled_color(&self) -> Color32;

    /// Draw the combo header. When the popup is open, `rows` is called once
    /// to draw its contents. Returns whether the popup is open this frame.
    fn combo(&mut self, frame: &ComboFrame<'_>, rows: &mut dyn FnMut(&mut dyn ComboRows)) -> bool;
}

/// Toolkit operations available inside an open combo popup.
pub trait ComboRows {
    /// Draw one selectable row; returns whether it was clicked this frame.
    fn selectable(&mut self, text: &str, selected: bool) -> bool;

    /// Give keyboard focus to the row drawn last.
    fn set_item_default_focus(&mut self);
}

/// Interaction phase of a combo, tracked across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComboPhase {
    /// Interactive, popup closed.
    #[default]
    EnabledClosed,
    /// Interactive, popup open.
    EnabledOpen,
    /// Disabled, popup closed.
    DisabledClosed,
    /// Disabled, popup open with no rows.
    DisabledOpen,
}

impl ComboPhase {
    /// Phase for an enablement and popup state.
    pub fn from_parts(enabled: bool, open: bool) -> Self {
        match (enabled, open) {
            (true, false) => Self::EnabledClosed,
            (true, true) => Self::EnabledOpen,
            (false, false) => Self::DisabledClosed,
            (false, true) => Self::DisabledOpen,
        }
    }

    /// Whether the popup is open.
    pub fn is_open(self) -> bool {
        matches!(self, Self::EnabledOpen | Self::DisabledOpen)
    }
}

/// What happened during one drawn frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOutcome {
    /// Phase after the frame.
    pub phase: ComboPhase,
    /// Number of interactive rows drawn.
    pub rows_drawn: usize,
    /// Row clicked this frame.
    pub selected: Option<String>,
    /// Whether the click changed the current value.
    pub changed: bool,
}

/// Draws one combo per frame and commits selections.
#[derive(Debug, Clone, Default)]
pub struct RenderBridge {
    /// Phase at the end of the previous frame.
    phase: ComboPhase,
}

impl RenderBridge {
    /// Create a bridge in the closed phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase at the end of the last frame.
    pub fn phase(&self) -> ComboPhase {
        self.phase
    }

    /// Draw `state` for one frame. Returns `None` when the widget is hidden.
    ///
    /// A click is committed after the popup contents are drawn and fires
    /// exactly one callback record, whether or not the value changed.
    pub fn draw(
        &mut self,
        state: &mut ComboState,
        ui: &mut dyn ComboUi,
        dispatcher: &dyn CallbackDispatcher,
    ) -> Option<FrameOutcome> {
        if !state.visible() {
            self.phase = ComboPhase::from_parts(state.enabled(), false);
            return None;
        }

        let enabled = state.enabled();
        let overrides: Vec<ColorOverride> = if enabled {
            Vec::new()
        } else {
            disabled_overrides(ui.text_disabled_color()).to_vec()
        };
        let current = state.current_value();
        let first_open_frame = !self.phase.is_open();
        let rows_src: &[String] = if enabled { state.items() } else { &[] };

        let mut clicked: Option<String> = None;
        let mut rows_drawn = 0;
        let frame = ComboFrame {
            id: state.name(),
            label: state.display_label(),
            preview: &current,
            flags: state.flags(),
            width: (state.width > 0).then_some(state.width as f32),
            overrides: &overrides,
            tip: (!state.tip.is_empty()).then_some(state.tip.as_str()),
        };
        let open = ui.combo(&frame, &mut |rows: &mut dyn ComboRows| {
            for item in rows_src {
                let selected = *item == current;
                if rows.selectable(item, selected) {
                    clicked = Some(item.clone());
                }
                if selected && first_open_frame {
                    rows.set_item_default_focus();
                }
                rows_drawn += 1;
            }
        });

        self.phase = ComboPhase::from_parts(enabled, open);
        trace!(item = %state.name(), phase = ?self.phase, "combo_frame");

        let mut changed = false;
        if let Some(value) = &clicked {
            changed = state.commit(value);
            debug!(item = %state.name(), value = %value, changed, "combo selection committed");
            dispatcher.fire(state.callback(), state.name(), state.user_data());
        }

        Some(FrameOutcome {
            phase: self.phase,
            rows_drawn,
            selected: clicked,
            changed,
        })
    }
}
