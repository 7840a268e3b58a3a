//! Types related to the keyboard.

use std::fmt;

use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A decoded, layout-aware key value.
///
/// This is the raw XKB keysym as produced by the keymap, e.g. `0x61` for the
/// latin `a`. No attempt is made to map it to a richer key representation; the
/// subsystem only decodes and routes.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keysym(u32);

impl Keysym {
    /// The keysym produced for codes without a mapping.
    pub const NO_SYMBOL: Keysym = Keysym(0);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Keysym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Keysym").field(&format_args!("0x{:04X}", self.0)).finish()
    }
}

impl From<u32> for Keysym {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

bitflags! {
    /// Represents the current state of the keyboard modifiers
    ///
    /// The bit layout is the one used by GDK and X11 core modifier masks, so the value can be
    /// handed to such toolkits as-is.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct ModifiersState: u32 {
        /// The "shift" key.
        const SHIFT = 1 << 0;
        /// The "Caps lock" key.
        const CAPS_LOCK = 1 << 1;
        /// The "control" key.
        const CONTROL = 1 << 2;
        /// The "alt" key.
        const ALT = 1 << 3;
        /// The "logo" key, also known as the "windows" key on most keyboards.
        const SUPER = 1 << 26;
    }
}

impl ModifiersState {
    /// Returns whether the shift modifier is active.
    pub fn shift_key(&self) -> bool {
        self.intersects(Self::SHIFT)
    }

    /// Returns whether the control modifier is active.
    pub fn control_key(&self) -> bool {
        self.intersects(Self::CONTROL)
    }

    /// Returns whether the alt modifier is active.
    pub fn alt_key(&self) -> bool {
        self.intersects(Self::ALT)
    }

    /// Returns whether the super modifier is active.
    pub fn super_key(&self) -> bool {
        self.intersects(Self::SUPER)
    }
}

/// Describes the direction of a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KeyState {
    Pressed,
    Released,
}

/// Format of a keymap announced by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeymapFormat {
    /// The compositor has no keymap; key codes can't be decoded.
    NoKeymap,
    /// A libxkbcommon compatible text keymap.
    XkbV1,
    /// A format unknown to this library.
    Unknown(u32),
}

/// Identity of a surface.
///
/// Only used to filter focus events for the target surface, hence it carries
/// no reference to the surface itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceId(usize);

impl SurfaceId {
    #[inline]
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn into_raw(self) -> usize {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_match_gdk_mask() {
        let mods = ModifiersState::SHIFT | ModifiersState::CONTROL;
        assert_eq!(mods.bits(), 0b101);
        assert!(mods.shift_key());
        assert!(mods.control_key());
        assert!(!mods.alt_key());
        assert_eq!(ModifiersState::SUPER.bits(), 0x0400_0000);
    }

    #[test]
    fn keysym_debug_is_hex() {
        assert_eq!(format!("{:?}", Keysym::from_raw(0x61)), "Keysym(0x0061)");
        assert_eq!(Keysym::default(), Keysym::NO_SYMBOL);
    }
}
