//! egui backend for the combo seam.

use egui::{Align, Color32, ComboBox, Response, Ui, Visuals};
use tracing::trace;

use super::{ColorOverride, ColorSlot, ComboFrame, ComboRows, ComboUi};
use crate::flags::{ComboFlags, HeightTier};

/// Width of the header when only the arrow is requested.
const NO_PREVIEW_WIDTH: f32 = 24.0;

/// Draws combos into an egui [`Ui`].
pub struct EguiComboUi<'u> {
    /// Target ui.
    ui: &'u mut Ui,
}

impl<'u> EguiComboUi<'u> {
    /// Wrap `ui` for one or more combo draws.
    pub fn new(ui: &'u mut Ui) -> Self {
        Self { ui }
    }
}

impl ComboUi for EguiComboUi<'_> {
    fn text_disabled_color(&self) -> Color32 {
        self.ui.visuals().weak_text_color()
    }

    fn combo(&mut self, frame: &ComboFrame<'_>, rows: &mut dyn FnMut(&mut dyn ComboRows)) -> bool {
        let flags = frame.flags;
        if flags.intersects(ComboFlags::POPUP_ALIGN_LEFT | ComboFlags::NO_ARROW_BUTTON) {
            trace!(item = frame.id, ?flags, "egui combo ignores popup alignment and arrow flags");
        }

        self.ui
            .scope(|ui| {
                apply_overrides(ui.visuals_mut(), frame.overrides);

                let no_preview = flags.contains(ComboFlags::NO_PREVIEW);
                let preview = if no_preview { "" } else { frame.preview };
                let mut combo = ComboBox::new(frame.id, frame.label)
                    .selected_text(preview)
                    .height(popup_height(ui, tier_of(flags)));
                if let Some(width) = frame.width {
                    combo = combo.width(width);
                } else if no_preview {
                    combo = combo.width(NO_PREVIEW_WIDTH);
                }

                let inner = combo.show_ui(ui, |ui| {
                    let mut egui_rows = EguiRows { ui, last: None };
                    rows(&mut egui_rows);
                });
                if let Some(tip) = frame.tip {
                    let _ignored = inner.response.on_hover_text(tip);
                }
                inner.inner.is_some()
            })
            .inner
    }
}

/// Rows drawn inside an open egui combo popup.
struct EguiRows<'a> {
    /// Popup ui.
    ui: &'a mut Ui,
    /// Response of the row drawn last.
    last: Option<Response>,
}

impl ComboRows for EguiRows<'_> {
    fn selectable(&mut self, text: &str, selected: bool) -> bool {
        let response = self.ui.selectable_label(selected, text);
        let clicked = response.clicked();
        self.last = Some(response);
        clicked
    }

    fn set_item_default_focus(&mut self) {
        if let Some(response) = &self.last {
            response.request_focus();
            response.scroll_to_me(Some(Align::Center));
        }
    }
}

/// Height tier encoded in `flags`; toolkit default when none is set.
fn tier_of(flags: ComboFlags) -> HeightTier {
    HeightTier::PRIORITY
        .into_iter()
        .find(|tier| flags.contains(tier.flag()))
        .unwrap_or(HeightTier::Regular)
}

/// Popup height for a tier in the current style.
fn popup_height(ui: &Ui, tier: HeightTier) -> f32 {
    let spacing = ui.spacing();
    let row = spacing.interact_size.y + spacing.item_spacing.y;
    match tier.max_rows() {
        Some(rows) => rows as f32 * row,
        None => f32::INFINITY,
    }
}

/// Write scoped overrides into `visuals`.
fn apply_overrides(visuals: &mut Visuals, overrides: &[ColorOverride]) {
    for over in overrides {
        let color = over.color;
        match over.slot {
            ColorSlot::FrameBg => visuals.widgets.inactive.weak_bg_fill = color,
            ColorSlot::FrameBgHovered => visuals.widgets.hovered.weak_bg_fill = color,
            ColorSlot::FrameBgActive => {
                visuals.widgets.active.weak_bg_fill = color;
                visuals.widgets.open.weak_bg_fill = color;
            }
            ColorSlot::Button => visuals.widgets.inactive.bg_fill = color,
            ColorSlot::ButtonHovered => visuals.widgets.hovered.bg_fill = color,
            ColorSlot::ButtonActive => {
                visuals.widgets.active.bg_fill = color;
                visuals.widgets.open.bg_fill = color;
            }
            ColorSlot::PopupBg => visuals.window_fill = color,
            ColorSlot::Border => {
                visuals.window_stroke.color = color;
                visuals.widgets.inactive.bg_stroke.color = color;
                visuals.widgets.hovered.bg_stroke.color = color;
                visuals.widgets.active.bg_stroke.color = color;
            }
            ColorSlot::Text => visuals.override_text_color = Some(color),
        }
    }
}
