//! Combo option flags and the grouped-toggle resolver.
//!
//! Options arrive as loose boolean keys. Independent keys map onto a single
//! bit each; the height keys form an exclusive group where the first key
//! present in priority order wins. Internally the exclusive group is a
//! [`HeightTier`] so no code path can hold two height bits at once; the raw
//! [`ComboFlags`] mask only exists at the toolkit boundary.

use bitflags::bitflags;

bitflags! {
    /// Raw combo flag bits, laid out like Dear ImGui's `ImGuiComboFlags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ComboFlags: u32 {
        /// Align the popup toward the left edge of the preview box.
        const POPUP_ALIGN_LEFT = 1 << 0;
        /// Max ~4 rows visible.
        const HEIGHT_SMALL = 1 << 1;
        /// Max ~8 rows visible (toolkit default).
        const HEIGHT_REGULAR = 1 << 2;
        /// Max ~20 rows visible.
        const HEIGHT_LARGE = 1 << 3;
        /// As many rows as fit.
        const HEIGHT_LARGEST = 1 << 4;
        /// Draw the preview box without the square arrow button.
        const NO_ARROW_BUTTON = 1 << 5;
        /// Draw only the square arrow button.
        const NO_PREVIEW = 1 << 6;
    }
}

impl ComboFlags {
    /// All bits owned by the exclusive height group.
    pub const HEIGHT_MASK: Self = Self::HEIGHT_SMALL
        .union(Self::HEIGHT_REGULAR)
        .union(Self::HEIGHT_LARGE)
        .union(Self::HEIGHT_LARGEST);
}

/// One member of the exclusive popup-height group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeightTier {
    /// `height_small`
    Small,
    /// `height_regular`
    Regular,
    /// `height_large`
    Large,
    /// `height_largest`
    Largest,
}

impl HeightTier {
    /// Members in resolution priority order.
    pub const PRIORITY: [Self; 4] = [Self::Small, Self::Regular, Self::Large, Self::Largest];

    /// Configuration key for this tier.
    pub fn key(self) -> &'static str {
        match self {
            Self::Small => "height_small",
            Self::Regular => "height_regular",
            Self::Large => "height_large",
            Self::Largest => "height_largest",
        }
    }

    /// Raw bit for this tier.
    pub fn flag(self) -> ComboFlags {
        match self {
            Self::Small => ComboFlags::HEIGHT_SMALL,
            Self::Regular => ComboFlags::HEIGHT_REGULAR,
            Self::Large => ComboFlags::HEIGHT_LARGE,
            Self::Largest => ComboFlags::HEIGHT_LARGEST,
        }
    }

    /// Maximum number of visible popup rows, `None` meaning unbounded.
    pub fn max_rows(self) -> Option<usize> {
        match self {
            Self::Small => Some(4),
            Self::Regular => Some(8),
            Self::Large => Some(20),
            Self::Largest => None,
        }
    }
}

/// A boolean key that toggles exactly one bit.
#[derive(Debug, Clone, Copy)]
pub struct IndependentFlag {
    /// Configuration key.
    pub key: &'static str,
    /// Bit controlled by the key.
    pub flag: ComboFlags,
}

impl IndependentFlag {
    /// Set or clear this flag's bit when its key is present in `lookup`.
    pub fn apply(&self, bits: &mut ComboFlags, lookup: impl Fn(&str) -> Option<bool>) {
        if let Some(on) = lookup(self.key) {
            bits.set(self.flag, on);
        }
    }
}

/// A set of boolean keys of which at most one may be on.
///
/// Members are listed in priority order. Within a single update the first
/// member whose key is present decides the outcome, even when later members
/// are also present and set to `true`.
#[derive(Debug, Clone, Copy)]
pub struct ExclusiveGroup<T: 'static> {
    /// `(key, member)` pairs in priority order.
    pub members: &'static [(&'static str, T)],
}

impl<T: Copy> ExclusiveGroup<T> {
    /// Resolve the group against one update.
    ///
    /// Returns `current` untouched when no member key is present. Otherwise
    /// the group is cleared and the first present member is selected when its
    /// value is `true` (or left cleared when `false`).
    pub fn resolve(&self, current: Option<T>, lookup: impl Fn(&str) -> Option<bool>) -> Option<T> {
        for (key, member) in self.members {
            if let Some(on) = lookup(*key) {
                return on.then_some(*member);
            }
        }
        current
    }
}

/// Independent combo toggles.
pub const INDEPENDENT_FLAGS: [IndependentFlag; 3] = [
    IndependentFlag {
        key: "popup_align_left",
        flag: ComboFlags::POPUP_ALIGN_LEFT,
    },
    IndependentFlag {
        key: "no_arrow_button",
        flag: ComboFlags::NO_ARROW_BUTTON,
    },
    IndependentFlag {
        key: "no_preview",
        flag: ComboFlags::NO_PREVIEW,
    },
];

/// The popup-height group, smallest first.
pub const HEIGHT_GROUP: ExclusiveGroup<HeightTier> = ExclusiveGroup {
    members: &[
        ("height_small", HeightTier::Small),
        ("height_regular", HeightTier::Regular),
        ("height_large", HeightTier::Large),
        ("height_largest", HeightTier::Largest),
    ],
};

/// Resolved combo options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComboOptions {
    /// Independent toggles; never contains height bits.
    toggles: ComboFlags,
    /// Selected height tier, if any.
    height: Option<HeightTier>,
}

impl ComboOptions {
    /// Apply one configuration update. Keys absent from `lookup` leave their
    /// bits alone.
    pub fn apply(&mut self, lookup: impl Fn(&str) -> Option<bool>) {
        for flag in &INDEPENDENT_FLAGS {
            flag.apply(&mut self.toggles, &lookup);
        }
        self.height = HEIGHT_GROUP.resolve(self.height, &lookup);
    }

    /// Whether an independent toggle is on.
    pub fn contains(&self, flag: ComboFlags) -> bool {
        self.bits().contains(flag)
    }

    /// Selected height tier.
    pub fn height(&self) -> Option<HeightTier> {
        self.height
    }

    /// Raw mask handed to the toolkit.
    pub fn bits(&self) -> ComboFlags {
        match self.height {
            Some(tier) => self.toggles | tier.flag(),
            None => self.toggles,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn update(pairs: &[(&'static str, bool)]) -> BTreeMap<&'static str, bool> {
        pairs.iter().copied().collect()
    }

    fn apply(opts: &mut ComboOptions, pairs: &[(&'static str, bool)]) {
        let map = update(pairs);
        opts.apply(|k| map.get(k).copied());
    }

    #[test]
    fn independent_bits_do_not_disturb_each_other() {
        let mut opts = ComboOptions::default();
        apply(&mut opts, &[("no_preview", true), ("popup_align_left", true)]);
        apply(&mut opts, &[("no_preview", false)]);
        assert_eq!(opts.bits(), ComboFlags::POPUP_ALIGN_LEFT);
    }

    #[test]
    fn first_present_height_key_wins() {
        let mut opts = ComboOptions::default();
        apply(
            &mut opts,
            &[
                ("height_largest", true),
                ("height_regular", true),
                ("height_large", true),
            ],
        );
        assert_eq!(opts.height(), Some(HeightTier::Regular));
        assert_eq!(
            (opts.bits() & ComboFlags::HEIGHT_MASK).bits().count_ones(),
            1
        );
    }

    #[test]
    fn first_present_false_clears_group_even_if_later_true() {
        let mut opts = ComboOptions::default();
        apply(&mut opts, &[("height_large", true)]);
        apply(&mut opts, &[("height_small", false), ("height_largest", true)]);
        assert_eq!(opts.height(), None);
        assert!((opts.bits() & ComboFlags::HEIGHT_MASK).is_empty());
    }

    #[test]
    fn absent_group_keeps_current_member() {
        let mut opts = ComboOptions::default();
        apply(&mut opts, &[("height_small", true)]);
        apply(&mut opts, &[("no_arrow_button", true)]);
        assert_eq!(opts.height(), Some(HeightTier::Small));
        assert!(opts.contains(ComboFlags::NO_ARROW_BUTTON));
    }

    #[test]
    fn later_update_switches_tier() {
        let mut opts = ComboOptions::default();
        apply(&mut opts, &[("height_small", true)]);
        apply(&mut opts, &[("height_large", true)]);
        assert!(opts.contains(ComboFlags::HEIGHT_LARGE));
        assert!(!opts.contains(ComboFlags::HEIGHT_SMALL));
    }

    #[test]
    fn group_table_matches_priority_order() {
        let keys: Vec<&str> = HEIGHT_GROUP.members.iter().map(|(k, _)| *k).collect();
        let expected: Vec<&str> = HeightTier::PRIORITY.iter().map(|t| t.key()).collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn exclusive_group_is_reusable_for_other_enums() {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        enum Align {
            Start,
            End,
        }
        let group = ExclusiveGroup {
            members: &[("align_start", Align::Start), ("align_end", Align::End)],
        };
        let map = update(&[("align_end", true)]);
        assert_eq!(
            group.resolve(Some(Align::Start), |k| map.get(k).copied()),
            Some(Align::End)
        );
        assert_eq!(
            group.resolve(Some(Align::Start), |_| None),
            Some(Align::Start)
        );
    }
}
